use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::{CollectionKind, PostData, PostId};

/// How the unpinned part of a collection is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    NewestFirst,
    OldestFirst,
    Alphabetical,
}

impl SortOption {
    /// Alphabetical ordering is not offered on single-occupant collections
    pub fn effective_for(self, kind: CollectionKind) -> SortOption {
        match (self, kind) {
            (Self::Alphabetical, CollectionKind::Individual) => Self::NewestFirst,
            (option, _) => option,
        }
    }
}

/// Orders posts for display: pinned posts first, most recently pinned on
/// top, then the rest by the requested option.
pub fn sorted_posts(
    posts: Vec<PostData>,
    kind: CollectionKind,
    option: SortOption,
) -> Vec<PostData> {
    let (mut pinned, mut unpinned): (Vec<_>, Vec<_>) =
        posts.into_iter().partition(|p| p.is_pinned());

    pinned.sort_by_key(|p| Reverse(p.pinned_at));

    match option.effective_for(kind) {
        SortOption::NewestFirst => unpinned.sort_by_key(|p| Reverse(p.created_at)),
        SortOption::OldestFirst => unpinned.sort_by_key(|p| p.created_at),
        SortOption::Alphabetical => unpinned.sort_by_key(|p| p.sort_title()),
    }

    pinned.extend(unpinned);
    pinned
}

/// The pin to evict when admitting another one at the cap.
/// Returns the post holding the oldest pin once the cap is reached.
pub fn pin_eviction(posts: &[PostData], cap: usize) -> Option<PostId> {
    let pinned: Vec<_> = posts.iter().filter(|p| p.is_pinned()).collect();

    if pinned.len() < cap {
        return None;
    }

    pinned.into_iter().min_by_key(|p| p.pinned_at).map(|p| p.id)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;

    fn post(id: i32, minutes_ago: i64, caption: Option<&str>) -> PostData {
        PostData {
            id,
            collection_id: 1,
            author_id: 1,
            title: None,
            caption: caption.map(str::to_string),
            media: vec![],
            pinned_at: None,
            allow_download: true,
            allow_replies: true,
            tagged_users: vec![],
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn pinned(id: i32, pinned_at: DateTime<Utc>) -> PostData {
        PostData {
            pinned_at: Some(pinned_at),
            ..post(id, 0, None)
        }
    }

    fn ids(posts: &[PostData]) -> Vec<i32> {
        posts.iter().map(|p| p.id).collect()
    }

    #[test]
    fn pinned_posts_lead_most_recently_pinned_first() {
        let base = Utc::now();

        let posts = vec![
            post(1, 30, None),
            pinned(2, base),
            post(3, 10, None),
            pinned(4, base + Duration::minutes(1)),
        ];

        let sorted = sorted_posts(posts, CollectionKind::Open, SortOption::NewestFirst);

        assert_eq!(ids(&sorted), vec![4, 2, 3, 1]);
    }

    #[test]
    fn oldest_first_reverses_the_unpinned_tail() {
        let posts = vec![post(1, 30, None), post(2, 10, None), post(3, 20, None)];

        let sorted = sorted_posts(posts, CollectionKind::Open, SortOption::OldestFirst);

        assert_eq!(ids(&sorted), vec![1, 3, 2]);
    }

    #[test]
    fn alphabetical_ignores_case_and_falls_back_to_title() {
        let mut untitled = post(3, 5, None);
        untitled.title = Some("Beach".to_string());

        let posts = vec![post(1, 0, Some("zebra crossing")), post(2, 0, Some("Apples")), untitled];

        let sorted = sorted_posts(posts, CollectionKind::Open, SortOption::Alphabetical);

        assert_eq!(ids(&sorted), vec![2, 3, 1]);
    }

    #[test]
    fn individual_collections_refuse_alphabetical() {
        let posts = vec![post(1, 30, Some("a")), post(2, 10, Some("b"))];

        let sorted = sorted_posts(posts, CollectionKind::Individual, SortOption::Alphabetical);

        // Falls back to newest first
        assert_eq!(ids(&sorted), vec![2, 1]);
    }

    #[test]
    fn eviction_targets_the_oldest_pin_at_the_cap() {
        let base = Utc::now();

        let posts = vec![
            pinned(1, base),
            pinned(2, base + Duration::minutes(1)),
            pinned(3, base + Duration::minutes(2)),
            pinned(4, base + Duration::minutes(3)),
            post(5, 0, None),
        ];

        assert_eq!(pin_eviction(&posts, 4), Some(1));
    }

    #[test]
    fn no_eviction_below_the_cap() {
        let base = Utc::now();
        let posts = vec![pinned(1, base), post(2, 0, None)];

        assert_eq!(pin_eviction(&posts, 4), None);
    }
}

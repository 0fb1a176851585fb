use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PrimaryKey, Role, UserId};

pub type CollectionId = PrimaryKey;

/// How users become members of a collection. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Single-occupant: the owner is the only member
    Individual,
    /// Members are added via single-use invite tokens
    Invite,
    /// Outsiders request membership and wait for owner or admin approval
    Request,
    /// Anyone can join directly
    Open,
}

impl CollectionKind {
    /// Kinds that let strangers in cannot be private
    pub fn requires_public(&self) -> bool {
        matches!(self, Self::Request | Self::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Invite => "invite",
            Self::Request => "request",
            Self::Open => "open",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(Self::Individual),
            "invite" => Some(Self::Invite),
            "request" => Some(Self::Request),
            "open" => Some(Self::Open),
            _ => None,
        }
    }
}

/// Which of the explicit viewer lists an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Allowed,
    Denied,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "allowed" => Some(Self::Allowed),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

/// A record-level rule was broken. Raised before anything is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Request and Open collections are joinable by strangers
    #[error("{kind:?} collections must be public")]
    MustBePublic { kind: CollectionKind },
    /// The operation is only defined for collections of the given kind
    #[error("Only valid for {expected:?} collections")]
    WrongKind { expected: CollectionKind },
    /// A post can only carry so many media items
    #[error("A post can carry at most {cap} media items")]
    MediaCapExceeded { cap: usize },
}

/// A photo/video collection record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionData {
    pub id: CollectionId,
    /// The original creator. Immutable, and never removable from the role
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub kind: CollectionKind,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    /// Members promoted by the owner. Never contains the owner
    pub admins: HashSet<UserId>,
    /// Plain members, including the owner's own membership
    pub members: HashSet<UserId>,
    pub followers: HashSet<UserId>,
    /// Users awaiting approval on a Request collection
    pub pending_requests: HashSet<UserId>,
    /// Viewer allow-list, meaningful while the collection is private
    pub allowed_users: HashSet<UserId>,
    /// Viewer deny-list, meaningful while the collection is public
    pub denied_users: HashSet<UserId>,
    /// Join timestamps for every membership row
    pub member_joined_at: HashMap<UserId, DateTime<Utc>>,
}

impl CollectionData {
    /// Checks the visibility rule for a kind
    pub fn validate_visibility(
        kind: CollectionKind,
        is_public: bool,
    ) -> Result<(), InvariantViolation> {
        if kind.requires_public() && !is_public {
            return Err(InvariantViolation::MustBePublic { kind });
        }

        Ok(())
    }

    /// Whether the user may see the collection and its posts
    pub fn can_view(&self, user_id: UserId) -> bool {
        if self.role_of(user_id) >= Role::Member {
            return true;
        }

        if self.is_public {
            !self.denied_users.contains(&user_id)
        } else {
            self.allowed_users.contains(&user_id)
        }
    }

    /// Occupants of the collection: the owner, admins, and members
    pub fn member_count(&self) -> usize {
        // The owner's membership row is part of `members`
        self.admins.len() + self.members.len()
    }

    /// Membership ids ordered by join date, most recent first
    pub fn members_by_recency(&self) -> Vec<UserId> {
        let mut ids: Vec<_> = self.member_joined_at.keys().copied().collect();
        ids.sort_by_key(|id| std::cmp::Reverse(self.member_joined_at[id]));

        ids
    }

    /// Members the owner can promote to admin. The owner is never eligible
    pub fn promotable_members(&self) -> Vec<UserId> {
        self.members
            .iter()
            .copied()
            .filter(|id| *id != self.owner_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(kind: CollectionKind, is_public: bool) -> CollectionData {
        CollectionData {
            id: 1,
            owner_id: 10,
            title: "trip to the coast".to_string(),
            description: String::new(),
            kind,
            is_public,
            created_at: Utc::now(),
            admins: HashSet::new(),
            members: HashSet::from([10]),
            followers: HashSet::new(),
            pending_requests: HashSet::new(),
            allowed_users: HashSet::new(),
            denied_users: HashSet::new(),
            member_joined_at: HashMap::new(),
        }
    }

    #[test]
    fn joinable_kinds_must_be_public() {
        for kind in [CollectionKind::Request, CollectionKind::Open] {
            assert_eq!(
                CollectionData::validate_visibility(kind, false),
                Err(InvariantViolation::MustBePublic { kind })
            );
            assert_eq!(CollectionData::validate_visibility(kind, true), Ok(()));
        }

        for kind in [CollectionKind::Individual, CollectionKind::Invite] {
            assert_eq!(CollectionData::validate_visibility(kind, false), Ok(()));
            assert_eq!(CollectionData::validate_visibility(kind, true), Ok(()));
        }
    }

    #[test]
    fn deny_list_blocks_public_viewers() {
        let mut public = collection(CollectionKind::Open, true);
        public.denied_users.insert(20);

        assert!(!public.can_view(20));
        assert!(public.can_view(21));
    }

    #[test]
    fn allow_list_admits_private_viewers() {
        let mut private = collection(CollectionKind::Invite, false);
        private.allowed_users.insert(20);
        private.members.insert(30);

        assert!(private.can_view(20));
        assert!(!private.can_view(21));
        // Members see their collection regardless of lists
        assert!(private.can_view(30));
        assert!(private.can_view(10));
    }

    #[test]
    fn members_are_ordered_most_recent_first() {
        use chrono::Duration;

        let mut c = collection(CollectionKind::Open, true);
        let base = Utc::now();

        c.member_joined_at.insert(10, base);
        c.member_joined_at.insert(20, base + Duration::minutes(5));
        c.member_joined_at.insert(30, base + Duration::minutes(2));

        assert_eq!(c.members_by_recency(), vec![20, 30, 10]);
    }

    #[test]
    fn owner_is_not_promotable() {
        let mut c = collection(CollectionKind::Invite, true);
        c.members.insert(20);

        assert_eq!(c.promotable_members(), vec![20]);
    }
}

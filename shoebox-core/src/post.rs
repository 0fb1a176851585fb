use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CollectionId, PrimaryKey, UserId};

pub type PostId = PrimaryKey;

/// What an uploaded media item contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// A single photo or video within a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Where the uploaded bytes can be retrieved from
    pub url: String,
    pub kind: MediaKind,
}

/// A post inside a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostData {
    pub id: PostId,
    pub collection_id: CollectionId,
    pub author_id: UserId,
    pub title: Option<String>,
    pub caption: Option<String>,
    /// Ordered as the author arranged them
    pub media: Vec<MediaItem>,
    /// Set while the post occupies a pin slot
    pub pinned_at: Option<DateTime<Utc>>,
    pub allow_download: bool,
    pub allow_replies: bool,
    pub tagged_users: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl PostData {
    pub fn is_pinned(&self) -> bool {
        self.pinned_at.is_some()
    }

    /// The string Alphabetical ordering compares, lowercased
    pub(crate) fn sort_title(&self) -> String {
        self.caption
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
            .to_lowercase()
    }
}

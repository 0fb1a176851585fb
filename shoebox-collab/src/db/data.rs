use chrono::{DateTime, Utc};
use shoebox_core::{CollectionId, CollectionKind, MediaItem, PostId, PrimaryKey, UserId};

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug)]
pub struct NewCollection {
    pub title: String,
    pub description: Option<String>,
    pub kind: CollectionKind,
    pub is_public: bool,
    /// The owner of the new collection
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct UpdatedCollection {
    pub id: CollectionId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug)]
pub struct NewCollectionInvite {
    pub token: String,
    pub collection_id: CollectionId,
    /// The inviter of the new collection invite
    pub user_id: UserId,
}

/// An invitation into an Invite collection, consumed on use
#[derive(Debug, Clone)]
pub struct CollectionInviteData {
    pub id: PrimaryKey,
    /// The unique token identifier of the invite
    pub token: String,
    pub collection_id: CollectionId,
    pub inviter_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewPost {
    pub collection_id: CollectionId,
    pub author_id: UserId,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub media: Vec<MediaItem>,
    pub allow_download: bool,
    pub allow_replies: bool,
    pub tagged_users: Vec<UserId>,
}

#[derive(Debug, Clone)]
pub struct UpdatedPost {
    pub id: PostId,
    pub caption: Option<String>,
    pub allow_download: Option<bool>,
    pub allow_replies: Option<bool>,
    pub tagged_users: Option<Vec<UserId>>,
}

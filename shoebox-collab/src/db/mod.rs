use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shoebox_core::{AccessKind, CollectionData, CollectionId, PostData, PostId, PrimaryKey, UserData, UserId};

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type BoxedDatabase = Box<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and persist shoebox data
#[async_trait]
pub trait Database {
    async fn user_by_id(&self, user_id: UserId) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn list_users(&self) -> Result<Vec<UserData>>;

    async fn collection_by_id(&self, collection_id: CollectionId) -> Result<CollectionData>;
    async fn list_collections(&self) -> Result<Vec<CollectionData>>;
    /// Creates a collection along with the owner's membership row
    async fn create_collection(&self, new_collection: NewCollection) -> Result<CollectionData>;
    /// Applies the set fields, leaving everything else untouched
    async fn update_collection(
        &self,
        updated_collection: UpdatedCollection,
    ) -> Result<CollectionData>;
    /// Removes the collection with its membership records and invites.
    /// Posts are soft deleted
    async fn delete_collection(&self, collection_id: CollectionId) -> Result<()>;

    async fn add_member(&self, collection_id: CollectionId, user_id: UserId) -> Result<()>;
    async fn remove_member(&self, collection_id: CollectionId, user_id: UserId) -> Result<()>;
    async fn set_member_admin(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        admin: bool,
    ) -> Result<()>;
    async fn add_follower(&self, collection_id: CollectionId, user_id: UserId) -> Result<()>;
    async fn remove_follower(&self, collection_id: CollectionId, user_id: UserId) -> Result<()>;
    async fn add_request(&self, collection_id: CollectionId, user_id: UserId) -> Result<()>;
    async fn remove_request(&self, collection_id: CollectionId, user_id: UserId) -> Result<()>;
    async fn add_access_entry(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> Result<()>;
    async fn remove_access_entry(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> Result<()>;

    async fn invite_by_token(&self, token: &str) -> Result<CollectionInviteData>;
    async fn create_invite(&self, new_invite: NewCollectionInvite)
        -> Result<CollectionInviteData>;
    async fn delete_invite(&self, invite_id: PrimaryKey) -> Result<()>;

    async fn post_by_id(&self, post_id: PostId) -> Result<PostData>;
    /// Live posts of a collection, soft-deleted ones excluded
    async fn posts_by_collection(&self, collection_id: CollectionId) -> Result<Vec<PostData>>;
    async fn create_post(&self, new_post: NewPost) -> Result<PostData>;
    /// Applies the set fields, leaving everything else untouched
    async fn update_post(&self, updated_post: UpdatedPost) -> Result<PostData>;
    async fn set_post_pinned(
        &self,
        post_id: PostId,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<PostData>;
    /// Removes the post from every index. Its media stays in storage
    async fn delete_post(&self, post_id: PostId) -> Result<()>;
}

use chrono::Utc;
use log::info;
use shoebox_core::{
    can_delete_post, can_pin_post, pin_eviction, sorted_posts, Action, CollectionId,
    InvariantViolation, MediaItem, MediaKind, PostData, PostId, SortOption, UserId,
};

use crate::{
    ActionError, ActionResult, CollabContext, CollabEvent, Database, MediaStore, MediaStoreError,
    NewPost, UpdatedPost,
};

/// Creates, pins, and removes the posts of collections.
pub struct PostManager<S, Db> {
    context: CollabContext<S, Db>,
}

impl<S, Db> PostManager<S, Db>
where
    S: MediaStore,
    Db: Database,
{
    pub fn new(context: &CollabContext<S, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Uploads media bytes to storage, returning the retrievable item
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        kind: MediaKind,
    ) -> Result<MediaItem, MediaStoreError> {
        let url = self.context.media.upload(bytes, kind).await?;

        Ok(MediaItem { url, kind })
    }

    /// Creates a post in a collection
    pub async fn create(&self, new_post: NewPost) -> ActionResult<PostData> {
        let fresh = self.context.authoritative(new_post.collection_id).await?;

        if !fresh.role_of(new_post.author_id).allows(Action::CreatePost) {
            return Err(ActionError::denied("post into this collection"));
        }

        if !self.context.config.fits_media_cap(new_post.media.len()) {
            return Err(InvariantViolation::MediaCapExceeded {
                cap: self.context.config.media_per_post_cap,
            }
            .into());
        }

        let post = self.context.database.create_post(new_post).await?;

        info!(
            "Post {} created in collection {}",
            post.id, post.collection_id
        );
        self.context.emit(CollabEvent::PostCreated {
            collection_id: post.collection_id,
            post_id: post.id,
        });

        Ok(post)
    }

    /// Updates a post's caption and flags. Only the author may edit
    pub async fn update(&self, invoker: UserId, update: UpdatedPost) -> ActionResult<PostData> {
        let post = self.context.database.post_by_id(update.id).await?;

        if post.author_id != invoker {
            return Err(ActionError::denied("edit this post"));
        }

        let updated = self.context.database.update_post(update).await?;

        self.context.emit(CollabEvent::PostUpdated {
            collection_id: updated.collection_id,
            post_id: updated.id,
        });

        Ok(updated)
    }

    /// Pins a post, or unpins it when it is already pinned. Pinning with
    /// all slots taken evicts the oldest pin first
    pub async fn toggle_pin(&self, invoker: UserId, post_id: PostId) -> ActionResult<PostData> {
        let post = self.context.database.post_by_id(post_id).await?;
        let fresh = self.context.authoritative(post.collection_id).await?;

        if !can_pin_post(&fresh, invoker, &post) {
            return Err(ActionError::denied("pin posts in this collection"));
        }

        if post.is_pinned() {
            let updated = self.context.database.set_post_pinned(post_id, None).await?;

            self.context.emit(CollabEvent::PostUnpinned {
                collection_id: post.collection_id,
                post_id,
            });

            return Ok(updated);
        }

        let posts = self
            .context
            .database
            .posts_by_collection(post.collection_id)
            .await?;

        let evicted = pin_eviction(&posts, self.context.config.pinned_post_cap);

        if let Some(evicted) = evicted {
            self.context.database.set_post_pinned(evicted, None).await?;
        }

        let updated = self
            .context
            .database
            .set_post_pinned(post_id, Some(Utc::now()))
            .await?;

        self.context.emit(CollabEvent::PostPinned {
            collection_id: post.collection_id,
            post_id,
            evicted,
        });

        Ok(updated)
    }

    /// Deletes a post from its collection's indexes. Its media stays in
    /// storage
    pub async fn delete(&self, invoker: UserId, post_id: PostId) -> ActionResult<()> {
        let post = self.context.database.post_by_id(post_id).await?;
        let fresh = self.context.authoritative(post.collection_id).await?;

        if !can_delete_post(&fresh, invoker, &post) {
            return Err(ActionError::denied("delete this post"));
        }

        self.context.database.delete_post(post_id).await?;

        info!(
            "Post {} deleted from collection {}",
            post_id, post.collection_id
        );
        self.context.emit(CollabEvent::PostDeleted {
            collection_id: post.collection_id,
            post_id,
        });

        Ok(())
    }

    /// The posts of a collection as a viewer sees them: pinned posts
    /// first, then the rest by the requested option
    pub async fn list(
        &self,
        viewer: UserId,
        collection_id: CollectionId,
        option: SortOption,
    ) -> ActionResult<Vec<PostData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if !fresh.can_view(viewer) {
            return Err(ActionError::denied("view this collection"));
        }

        let posts = self
            .context
            .database
            .posts_by_collection(collection_id)
            .await?;

        Ok(sorted_posts(posts, fresh.kind, option))
    }
}

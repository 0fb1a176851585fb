use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, query, query_as, Error as SqlxError, FromRow, PgPool};

use shoebox_core::{
    AccessKind, CollectionData, CollectionId, CollectionKind, MediaItem, MediaKind, PostData,
    PostId, PrimaryKey, UserData, UserId,
};

use super::{
    CollectionInviteData, Database, DatabaseError, DatabaseResult, IntoDatabaseError,
    NewCollection, NewCollectionInvite, NewPost, NewUser, Result, UpdatedCollection, UpdatedPost,
};

/// A postgres database implementation for shoebox
pub struct PgDatabase {
    pool: PgPool,
}

impl IntoDatabaseError for SqlxError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => DatabaseError::Internal(Box::new(e)),
        }
    }

    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

#[derive(FromRow)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    display_name: String,
}

#[derive(FromRow)]
struct CollectionRow {
    id: CollectionId,
    owner_id: UserId,
    title: String,
    description: String,
    kind: String,
    is_public: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MembershipRow {
    user_id: UserId,
    admin: bool,
    joined_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MarkRow {
    user_id: UserId,
}

#[derive(FromRow)]
struct AccessRow {
    user_id: UserId,
    kind: String,
}

#[derive(FromRow)]
struct InviteRow {
    id: PrimaryKey,
    token: String,
    collection_id: CollectionId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PostRow {
    id: PostId,
    collection_id: CollectionId,
    author_id: UserId,
    title: Option<String>,
    caption: Option<String>,
    pinned_at: Option<DateTime<Utc>>,
    allow_download: bool,
    allow_replies: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MediaRow {
    url: String,
    kind: String,
}

fn collection_kind(value: &str) -> Result<CollectionKind> {
    CollectionKind::from_str(value)
        .ok_or_else(|| DatabaseError::Internal(format!("unrecognized collection kind {value}").into()))
}

fn access_kind(value: &str) -> Result<AccessKind> {
    AccessKind::from_str(value)
        .ok_or_else(|| DatabaseError::Internal(format!("unrecognized access kind {value}").into()))
}

fn media_kind(value: &str) -> Result<MediaKind> {
    MediaKind::from_str(value)
        .ok_or_else(|| DatabaseError::Internal(format!("unrecognized media kind {value}").into()))
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
        }
    }
}

impl From<InviteRow> for CollectionInviteData {
    fn from(row: InviteRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            collection_id: row.collection_id,
            inviter_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn collection_row(&self, collection_id: CollectionId) -> Result<CollectionRow> {
        query_as::<_, CollectionRow>("SELECT * FROM collections WHERE id = $1")
            .bind(collection_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("collection", "id"))
    }

    async fn assemble(&self, row: CollectionRow) -> Result<CollectionData> {
        let memberships = query_as::<_, MembershipRow>(
            "SELECT user_id, admin, joined_at FROM collection_members WHERE collection_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let followers = query_as::<_, MarkRow>(
            "SELECT user_id FROM collection_followers WHERE collection_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let requests = query_as::<_, MarkRow>(
            "SELECT user_id FROM collection_requests WHERE collection_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let access = query_as::<_, AccessRow>(
            "SELECT user_id, kind FROM collection_access WHERE collection_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut admins = HashSet::new();
        let mut members = HashSet::new();
        let mut member_joined_at = HashMap::new();

        for membership in memberships {
            if membership.admin {
                admins.insert(membership.user_id);
            } else {
                members.insert(membership.user_id);
            }

            member_joined_at.insert(membership.user_id, membership.joined_at);
        }

        let mut allowed_users = HashSet::new();
        let mut denied_users = HashSet::new();

        for entry in access {
            match access_kind(&entry.kind)? {
                AccessKind::Allowed => allowed_users.insert(entry.user_id),
                AccessKind::Denied => denied_users.insert(entry.user_id),
            };
        }

        Ok(CollectionData {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            kind: collection_kind(&row.kind)?,
            is_public: row.is_public,
            created_at: row.created_at,
            admins,
            members,
            followers: followers.into_iter().map(|f| f.user_id).collect(),
            pending_requests: requests.into_iter().map(|r| r.user_id).collect(),
            allowed_users,
            denied_users,
            member_joined_at,
        })
    }

    async fn post_from_row(&self, row: PostRow) -> Result<PostData> {
        let media_rows = query_as::<_, MediaRow>(
            "SELECT url, kind FROM post_media WHERE post_id = $1 ORDER BY position",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let tags =
            query_as::<_, MarkRow>("SELECT user_id FROM post_tags WHERE post_id = $1 ORDER BY user_id")
                .bind(row.id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| e.any())?;

        let mut media = Vec::with_capacity(media_rows.len());

        for item in media_rows {
            media.push(MediaItem {
                url: item.url,
                kind: media_kind(&item.kind)?,
            });
        }

        Ok(PostData {
            id: row.id,
            collection_id: row.collection_id,
            author_id: row.author_id,
            title: row.title,
            caption: row.caption,
            media,
            pinned_at: row.pinned_at,
            allow_download: row.allow_download,
            allow_replies: row.allow_replies,
            tagged_users: tags.into_iter().map(|t| t.user_id).collect(),
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: UserId) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(&new_user.username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "username"))
            .conflict_or_ok("user", "username", &new_user.username)?;

        query_as::<_, UserRow>(
            "INSERT INTO users (username, display_name) VALUES ($1, $2) RETURNING *",
        )
        .bind(&new_user.username)
        .bind(&new_user.display_name)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn list_users(&self) -> Result<Vec<UserData>> {
        query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(|e| e.any())
    }

    async fn collection_by_id(&self, collection_id: CollectionId) -> Result<CollectionData> {
        let row = self.collection_row(collection_id).await?;

        self.assemble(row).await
    }

    async fn list_collections(&self) -> Result<Vec<CollectionData>> {
        let rows = query_as::<_, CollectionRow>("SELECT * FROM collections ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let mut collections = Vec::with_capacity(rows.len());

        for row in rows {
            collections.push(self.assemble(row).await?);
        }

        Ok(collections)
    }

    async fn create_collection(&self, new_collection: NewCollection) -> Result<CollectionData> {
        let row = query_as::<_, CollectionRow>(
            "INSERT INTO collections (owner_id, title, description, kind, is_public)
            VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new_collection.user_id)
        .bind(&new_collection.title)
        .bind(new_collection.description.as_deref().unwrap_or_default())
        .bind(new_collection.kind.as_str())
        .bind(new_collection.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        query("INSERT INTO collection_members (collection_id, user_id) VALUES ($1, $2)")
            .bind(row.id)
            .bind(row.owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.assemble(row).await
    }

    async fn update_collection(
        &self,
        updated_collection: UpdatedCollection,
    ) -> Result<CollectionData> {
        let current = self.collection_row(updated_collection.id).await?;

        query("UPDATE collections SET title = $1, description = $2, is_public = $3 WHERE id = $4")
            .bind(updated_collection.title.unwrap_or(current.title))
            .bind(updated_collection.description.unwrap_or(current.description))
            .bind(updated_collection.is_public.unwrap_or(current.is_public))
            .bind(updated_collection.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.collection_by_id(updated_collection.id).await
    }

    async fn delete_collection(&self, collection_id: CollectionId) -> Result<()> {
        query("UPDATE posts SET deleted_at = now() WHERE collection_id = $1 AND deleted_at IS NULL")
            .bind(collection_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let result = query("DELETE FROM collections WHERE id = $1")
            .bind(collection_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "collection",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn add_member(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        query(
            "INSERT INTO collection_members (collection_id, user_id)
            VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(collection_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(())
    }

    async fn remove_member(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        query("DELETE FROM collection_members WHERE collection_id = $1 AND user_id = $2")
            .bind(collection_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }

    async fn set_member_admin(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        admin: bool,
    ) -> Result<()> {
        let result =
            query("UPDATE collection_members SET admin = $1 WHERE collection_id = $2 AND user_id = $3")
                .bind(admin)
                .bind(collection_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "member",
                identifier: "user_id",
            });
        }

        Ok(())
    }

    async fn add_follower(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        query(
            "INSERT INTO collection_followers (collection_id, user_id)
            VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(collection_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(())
    }

    async fn remove_follower(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        query("DELETE FROM collection_followers WHERE collection_id = $1 AND user_id = $2")
            .bind(collection_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }

    async fn add_request(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        query(
            "INSERT INTO collection_requests (collection_id, user_id)
            VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(collection_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(())
    }

    async fn remove_request(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        query("DELETE FROM collection_requests WHERE collection_id = $1 AND user_id = $2")
            .bind(collection_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }

    async fn add_access_entry(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> Result<()> {
        query(
            "INSERT INTO collection_access (collection_id, user_id, kind)
            VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(collection_id)
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(())
    }

    async fn remove_access_entry(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> Result<()> {
        query("DELETE FROM collection_access WHERE collection_id = $1 AND user_id = $2 AND kind = $3")
            .bind(collection_id)
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(())
    }

    async fn invite_by_token(&self, token: &str) -> Result<CollectionInviteData> {
        query_as::<_, InviteRow>("SELECT * FROM collection_invites WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("invite", "token"))
    }

    async fn create_invite(
        &self,
        new_invite: NewCollectionInvite,
    ) -> Result<CollectionInviteData> {
        query_as::<_, InviteRow>(
            "INSERT INTO collection_invites (token, collection_id, user_id)
            VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new_invite.token)
        .bind(new_invite.collection_id)
        .bind(new_invite.user_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn delete_invite(&self, invite_id: PrimaryKey) -> Result<()> {
        let result = query("DELETE FROM collection_invites WHERE id = $1")
            .bind(invite_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "invite",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn post_by_id(&self, post_id: PostId) -> Result<PostData> {
        let row = query_as::<_, PostRow>("SELECT * FROM posts WHERE id = $1 AND deleted_at IS NULL")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("post", "id"))?;

        self.post_from_row(row).await
    }

    async fn posts_by_collection(&self, collection_id: CollectionId) -> Result<Vec<PostData>> {
        let rows = query_as::<_, PostRow>(
            "SELECT * FROM posts WHERE collection_id = $1 AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut posts = Vec::with_capacity(rows.len());

        for row in rows {
            posts.push(self.post_from_row(row).await?);
        }

        Ok(posts)
    }

    async fn create_post(&self, new_post: NewPost) -> Result<PostData> {
        let row = query_as::<_, PostRow>(
            "INSERT INTO posts (collection_id, author_id, title, caption, allow_download, allow_replies)
            VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(new_post.collection_id)
        .bind(new_post.author_id)
        .bind(&new_post.title)
        .bind(&new_post.caption)
        .bind(new_post.allow_download)
        .bind(new_post.allow_replies)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        for (position, item) in new_post.media.iter().enumerate() {
            query("INSERT INTO post_media (post_id, position, url, kind) VALUES ($1, $2, $3, $4)")
                .bind(row.id)
                .bind(position as i32)
                .bind(&item.url)
                .bind(item.kind.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;
        }

        for user_id in &new_post.tagged_users {
            query("INSERT INTO post_tags (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(row.id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;
        }

        self.post_from_row(row).await
    }

    async fn update_post(&self, updated_post: UpdatedPost) -> Result<PostData> {
        let current = self.post_by_id(updated_post.id).await?;

        query("UPDATE posts SET caption = $1, allow_download = $2, allow_replies = $3 WHERE id = $4")
            .bind(updated_post.caption.or(current.caption))
            .bind(updated_post.allow_download.unwrap_or(current.allow_download))
            .bind(updated_post.allow_replies.unwrap_or(current.allow_replies))
            .bind(updated_post.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if let Some(tagged_users) = updated_post.tagged_users {
            query("DELETE FROM post_tags WHERE post_id = $1")
                .bind(updated_post.id)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;

            for user_id in tagged_users {
                query("INSERT INTO post_tags (post_id, user_id) VALUES ($1, $2)")
                    .bind(updated_post.id)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| e.any())?;
            }
        }

        self.post_by_id(updated_post.id).await
    }

    async fn set_post_pinned(
        &self,
        post_id: PostId,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<PostData> {
        let result = query("UPDATE posts SET pinned_at = $1 WHERE id = $2 AND deleted_at IS NULL")
            .bind(pinned_at)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "post",
                identifier: "id",
            });
        }

        self.post_by_id(post_id).await
    }

    async fn delete_post(&self, post_id: PostId) -> Result<()> {
        let result = query("UPDATE posts SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "post",
                identifier: "id",
            });
        }

        Ok(())
    }
}

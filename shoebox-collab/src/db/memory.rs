use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;

use shoebox_core::{
    AccessKind, CollectionData, CollectionId, CollectionKind, PostData, PostId, PrimaryKey,
    UserData, UserId,
};

use super::{
    CollectionInviteData, Database, DatabaseError, NewCollection, NewCollectionInvite, NewPost,
    NewUser, Result, UpdatedCollection, UpdatedPost,
};

#[derive(Debug, Clone)]
struct CollectionRow {
    id: CollectionId,
    owner_id: UserId,
    title: String,
    description: String,
    kind: CollectionKind,
    is_public: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct MembershipRow {
    collection_id: CollectionId,
    user_id: UserId,
    admin: bool,
    joined_at: DateTime<Utc>,
}

/// A plain (collection, user) association, used for followers and
/// pending requests
#[derive(Debug, Clone)]
struct MarkRow {
    collection_id: CollectionId,
    user_id: UserId,
}

#[derive(Debug, Clone)]
struct AccessRow {
    collection_id: CollectionId,
    user_id: UserId,
    kind: AccessKind,
}

#[derive(Debug, Clone)]
struct StoredPost {
    data: PostData,
    deleted_at: Option<DateTime<Utc>>,
}

/// Keeps every record in memory. Useful for tests and for embedding
/// without a database server
#[derive(Default)]
pub struct MemoryDatabase {
    next_id: AtomicCell<PrimaryKey>,
    fail_writes: AtomicCell<bool>,

    users: Mutex<Vec<UserData>>,
    collections: Mutex<Vec<CollectionRow>>,
    memberships: Mutex<Vec<MembershipRow>>,
    followers: Mutex<Vec<MarkRow>>,
    requests: Mutex<Vec<MarkRow>>,
    access: Mutex<Vec<AccessRow>>,
    invites: Mutex<Vec<CollectionInviteData>>,
    posts: Mutex<Vec<StoredPost>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes every subsequent write fail with an internal error until
    /// disabled again. Useful for exercising failure handling
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail);
    }

    fn next_id(&self) -> PrimaryKey {
        self.next_id.fetch_add(1) + 1
    }

    fn writable(&self) -> Result<()> {
        if self.fail_writes.load() {
            return Err(DatabaseError::Internal("writes are failing".into()));
        }

        Ok(())
    }

    fn collection_row(&self, collection_id: CollectionId) -> Result<CollectionRow> {
        self.collections
            .lock()
            .iter()
            .find(|c| c.id == collection_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "collection",
                identifier: "id",
            })
    }

    fn assemble(&self, row: CollectionRow) -> CollectionData {
        let mut admins = HashSet::new();
        let mut members = HashSet::new();
        let mut member_joined_at = HashMap::new();

        for membership in self
            .memberships
            .lock()
            .iter()
            .filter(|m| m.collection_id == row.id)
        {
            if membership.admin {
                admins.insert(membership.user_id);
            } else {
                members.insert(membership.user_id);
            }

            member_joined_at.insert(membership.user_id, membership.joined_at);
        }

        let followers = self
            .followers
            .lock()
            .iter()
            .filter(|f| f.collection_id == row.id)
            .map(|f| f.user_id)
            .collect();

        let pending_requests = self
            .requests
            .lock()
            .iter()
            .filter(|r| r.collection_id == row.id)
            .map(|r| r.user_id)
            .collect();

        let mut allowed_users = HashSet::new();
        let mut denied_users = HashSet::new();

        for entry in self.access.lock().iter().filter(|a| a.collection_id == row.id) {
            match entry.kind {
                AccessKind::Allowed => allowed_users.insert(entry.user_id),
                AccessKind::Denied => denied_users.insert(entry.user_id),
            };
        }

        CollectionData {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            kind: row.kind,
            is_public: row.is_public,
            created_at: row.created_at,
            admins,
            members,
            followers,
            pending_requests,
            allowed_users,
            denied_users,
            member_joined_at,
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: UserId) -> Result<UserData> {
        self.users
            .lock()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.writable()?;

        let mut users = self.users.lock();

        if users.iter().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        let user = UserData {
            id: self.next_id(),
            username: new_user.username,
            display_name: new_user.display_name,
        };

        users.push(user.clone());

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<UserData>> {
        Ok(self.users.lock().clone())
    }

    async fn collection_by_id(&self, collection_id: CollectionId) -> Result<CollectionData> {
        let row = self.collection_row(collection_id)?;

        Ok(self.assemble(row))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionData>> {
        let rows = self.collections.lock().clone();

        Ok(rows.into_iter().map(|row| self.assemble(row)).collect())
    }

    async fn create_collection(&self, new_collection: NewCollection) -> Result<CollectionData> {
        self.writable()?;

        let now = Utc::now();
        let row = CollectionRow {
            id: self.next_id(),
            owner_id: new_collection.user_id,
            title: new_collection.title,
            description: new_collection.description.unwrap_or_default(),
            kind: new_collection.kind,
            is_public: new_collection.is_public,
            created_at: now,
        };

        self.collections.lock().push(row.clone());
        self.memberships.lock().push(MembershipRow {
            collection_id: row.id,
            user_id: row.owner_id,
            admin: false,
            joined_at: now,
        });

        Ok(self.assemble(row))
    }

    async fn update_collection(
        &self,
        updated_collection: UpdatedCollection,
    ) -> Result<CollectionData> {
        self.writable()?;

        let row = {
            let mut collections = self.collections.lock();

            let row = collections
                .iter_mut()
                .find(|c| c.id == updated_collection.id)
                .ok_or(DatabaseError::NotFound {
                    resource: "collection",
                    identifier: "id",
                })?;

            if let Some(title) = updated_collection.title {
                row.title = title;
            }
            if let Some(description) = updated_collection.description {
                row.description = description;
            }
            if let Some(is_public) = updated_collection.is_public {
                row.is_public = is_public;
            }

            row.clone()
        };

        Ok(self.assemble(row))
    }

    async fn delete_collection(&self, collection_id: CollectionId) -> Result<()> {
        self.writable()?;
        self.collection_row(collection_id)?;

        self.collections.lock().retain(|c| c.id != collection_id);
        self.memberships
            .lock()
            .retain(|m| m.collection_id != collection_id);
        self.followers
            .lock()
            .retain(|f| f.collection_id != collection_id);
        self.requests
            .lock()
            .retain(|r| r.collection_id != collection_id);
        self.access.lock().retain(|a| a.collection_id != collection_id);
        self.invites
            .lock()
            .retain(|i| i.collection_id != collection_id);

        let now = Utc::now();

        for post in self
            .posts
            .lock()
            .iter_mut()
            .filter(|p| p.data.collection_id == collection_id && p.deleted_at.is_none())
        {
            post.deleted_at = Some(now);
        }

        Ok(())
    }

    async fn add_member(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        self.writable()?;
        self.collection_row(collection_id)?;

        let mut memberships = self.memberships.lock();

        if memberships
            .iter()
            .any(|m| m.collection_id == collection_id && m.user_id == user_id)
        {
            return Ok(());
        }

        memberships.push(MembershipRow {
            collection_id,
            user_id,
            admin: false,
            joined_at: Utc::now(),
        });

        Ok(())
    }

    async fn remove_member(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        self.writable()?;

        self.memberships
            .lock()
            .retain(|m| !(m.collection_id == collection_id && m.user_id == user_id));

        Ok(())
    }

    async fn set_member_admin(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        admin: bool,
    ) -> Result<()> {
        self.writable()?;

        let mut memberships = self.memberships.lock();

        let membership = memberships
            .iter_mut()
            .find(|m| m.collection_id == collection_id && m.user_id == user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "member",
                identifier: "user_id",
            })?;

        membership.admin = admin;

        Ok(())
    }

    async fn add_follower(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        self.writable()?;
        self.collection_row(collection_id)?;

        let mut followers = self.followers.lock();

        if !followers
            .iter()
            .any(|f| f.collection_id == collection_id && f.user_id == user_id)
        {
            followers.push(MarkRow {
                collection_id,
                user_id,
            });
        }

        Ok(())
    }

    async fn remove_follower(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        self.writable()?;

        self.followers
            .lock()
            .retain(|f| !(f.collection_id == collection_id && f.user_id == user_id));

        Ok(())
    }

    async fn add_request(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        self.writable()?;
        self.collection_row(collection_id)?;

        let mut requests = self.requests.lock();

        if !requests
            .iter()
            .any(|r| r.collection_id == collection_id && r.user_id == user_id)
        {
            requests.push(MarkRow {
                collection_id,
                user_id,
            });
        }

        Ok(())
    }

    async fn remove_request(&self, collection_id: CollectionId, user_id: UserId) -> Result<()> {
        self.writable()?;

        self.requests
            .lock()
            .retain(|r| !(r.collection_id == collection_id && r.user_id == user_id));

        Ok(())
    }

    async fn add_access_entry(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> Result<()> {
        self.writable()?;
        self.collection_row(collection_id)?;

        let mut access = self.access.lock();

        if !access
            .iter()
            .any(|a| a.collection_id == collection_id && a.user_id == user_id && a.kind == kind)
        {
            access.push(AccessRow {
                collection_id,
                user_id,
                kind,
            });
        }

        Ok(())
    }

    async fn remove_access_entry(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> Result<()> {
        self.writable()?;

        self.access.lock().retain(|a| {
            !(a.collection_id == collection_id && a.user_id == user_id && a.kind == kind)
        });

        Ok(())
    }

    async fn invite_by_token(&self, token: &str) -> Result<CollectionInviteData> {
        self.invites
            .lock()
            .iter()
            .find(|i| i.token == token)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "invite",
                identifier: "token",
            })
    }

    async fn create_invite(
        &self,
        new_invite: NewCollectionInvite,
    ) -> Result<CollectionInviteData> {
        self.writable()?;
        self.collection_row(new_invite.collection_id)?;

        let invite = CollectionInviteData {
            id: self.next_id(),
            token: new_invite.token,
            collection_id: new_invite.collection_id,
            inviter_id: new_invite.user_id,
            created_at: Utc::now(),
        };

        self.invites.lock().push(invite.clone());

        Ok(invite)
    }

    async fn delete_invite(&self, invite_id: PrimaryKey) -> Result<()> {
        self.writable()?;

        let mut invites = self.invites.lock();

        if !invites.iter().any(|i| i.id == invite_id) {
            return Err(DatabaseError::NotFound {
                resource: "invite",
                identifier: "id",
            });
        }

        invites.retain(|i| i.id != invite_id);

        Ok(())
    }

    async fn post_by_id(&self, post_id: PostId) -> Result<PostData> {
        self.posts
            .lock()
            .iter()
            .find(|p| p.data.id == post_id && p.deleted_at.is_none())
            .map(|p| p.data.clone())
            .ok_or(DatabaseError::NotFound {
                resource: "post",
                identifier: "id",
            })
    }

    async fn posts_by_collection(&self, collection_id: CollectionId) -> Result<Vec<PostData>> {
        Ok(self
            .posts
            .lock()
            .iter()
            .filter(|p| p.data.collection_id == collection_id && p.deleted_at.is_none())
            .map(|p| p.data.clone())
            .collect())
    }

    async fn create_post(&self, new_post: NewPost) -> Result<PostData> {
        self.writable()?;
        self.collection_row(new_post.collection_id)?;

        let post = PostData {
            id: self.next_id(),
            collection_id: new_post.collection_id,
            author_id: new_post.author_id,
            title: new_post.title,
            caption: new_post.caption,
            media: new_post.media,
            pinned_at: None,
            allow_download: new_post.allow_download,
            allow_replies: new_post.allow_replies,
            tagged_users: new_post.tagged_users,
            created_at: Utc::now(),
        };

        self.posts.lock().push(StoredPost {
            data: post.clone(),
            deleted_at: None,
        });

        Ok(post)
    }

    async fn update_post(&self, updated_post: UpdatedPost) -> Result<PostData> {
        self.writable()?;

        let mut posts = self.posts.lock();

        let post = posts
            .iter_mut()
            .find(|p| p.data.id == updated_post.id && p.deleted_at.is_none())
            .ok_or(DatabaseError::NotFound {
                resource: "post",
                identifier: "id",
            })?;

        if let Some(caption) = updated_post.caption {
            post.data.caption = Some(caption);
        }
        if let Some(allow_download) = updated_post.allow_download {
            post.data.allow_download = allow_download;
        }
        if let Some(allow_replies) = updated_post.allow_replies {
            post.data.allow_replies = allow_replies;
        }
        if let Some(tagged_users) = updated_post.tagged_users {
            post.data.tagged_users = tagged_users;
        }

        Ok(post.data.clone())
    }

    async fn set_post_pinned(
        &self,
        post_id: PostId,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<PostData> {
        self.writable()?;

        let mut posts = self.posts.lock();

        let post = posts
            .iter_mut()
            .find(|p| p.data.id == post_id && p.deleted_at.is_none())
            .ok_or(DatabaseError::NotFound {
                resource: "post",
                identifier: "id",
            })?;

        post.data.pinned_at = pinned_at;

        Ok(post.data.clone())
    }

    async fn delete_post(&self, post_id: PostId) -> Result<()> {
        self.writable()?;

        let mut posts = self.posts.lock();

        let post = posts
            .iter_mut()
            .find(|p| p.data.id == post_id && p.deleted_at.is_none())
            .ok_or(DatabaseError::NotFound {
                resource: "post",
                identifier: "id",
            })?;

        post.deleted_at = Some(Utc::now());

        Ok(())
    }
}

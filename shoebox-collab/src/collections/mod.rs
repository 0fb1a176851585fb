mod collection;

use std::sync::Arc;

use log::info;
use shoebox_core::{AccessKind, Action, CollectionData, CollectionId, UserId};

pub use collection::*;

use crate::{
    ActionError, ActionResult, CollabContext, CollabEvent, Database, DatabaseError, MediaStore,
    NewCollection, Reconciled, UpdatedCollection,
};

pub struct CollectionManager<S, Db> {
    context: CollabContext<S, Db>,
}

impl<S, Db> CollectionManager<S, Db>
where
    S: MediaStore,
    Db: Database,
{
    pub fn new(context: &CollabContext<S, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Restores the collections from the database on init
    pub async fn restore(&self) -> Result<(), DatabaseError> {
        let collections: Vec<_> = self
            .context
            .database
            .list_collections()
            .await?
            .into_iter()
            .map(|c| (c.id, Collection::new(c)))
            .collect();

        for (id, collection) in collections {
            self.context.collections.insert(id, collection.into());
        }

        info!("Restored {} collections", self.context.collections.len());

        Ok(())
    }

    /// Creates a new collection, with the creator as owner and first
    /// member
    pub async fn create(&self, new_collection: NewCollection) -> ActionResult<Arc<Collection>> {
        CollectionData::validate_visibility(new_collection.kind, new_collection.is_public)?;

        let data = self.context.database.create_collection(new_collection).await?;
        let collection = Arc::new(Collection::new(data.clone()));

        self.context.collections.insert(data.id, collection.clone());

        info!("Collection {} created", data.title);
        self.context.emit(CollabEvent::CollectionCreated {
            collection_id: data.id,
        });

        Ok(collection)
    }

    /// Get all collections in memory
    pub fn list_all(&self) -> Vec<Arc<Collection>> {
        self.context.collections.all()
    }

    /// Returns the cached handle of a collection, if any
    pub fn collection_by_id(&self, id: CollectionId) -> Option<Arc<Collection>> {
        self.context.collection_by_id(id)
    }

    /// Updates a collection's editable fields. Absent fields are left
    /// untouched, and the kind is fixed at creation
    pub async fn update(
        &self,
        invoker: UserId,
        update: UpdatedCollection,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let id = update.id;
        let fresh = self.context.authoritative(id).await?;

        if !fresh.role_of(invoker).allows(Action::EditCollection) {
            return Err(ActionError::denied("edit this collection"));
        }

        let is_public = update.is_public.unwrap_or(fresh.is_public);
        CollectionData::validate_visibility(fresh.kind, is_public)?;

        let mut attempted = fresh.clone();
        attempted.title = update.title.clone().unwrap_or(fresh.title.clone());
        attempted.description = update
            .description
            .clone()
            .unwrap_or(fresh.description.clone());
        attempted.is_public = is_public;

        let title = update.title.clone();
        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                id,
                "edit this collection",
                attempted,
                async { database.update_collection(update).await.map(|_| ()) },
                move |c| {
                    c.is_public == is_public
                        && title.as_ref().map(|t| &c.title == t).unwrap_or(true)
                },
            )
            .await?;

        self.context
            .emit(CollabEvent::CollectionUpdated { collection_id: id });

        Ok(result)
    }

    /// Adds a user to one of the explicit viewer lists
    pub async fn add_access_entry(
        &self,
        invoker: UserId,
        id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(id).await?;

        if !fresh.role_of(invoker).allows(Action::ManageAccess) {
            return Err(ActionError::denied("manage access to this collection"));
        }

        let mut attempted = fresh.clone();
        match kind {
            AccessKind::Allowed => attempted.allowed_users.insert(user_id),
            AccessKind::Denied => attempted.denied_users.insert(user_id),
        };

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                id,
                "manage access to this collection",
                attempted,
                async { database.add_access_entry(id, user_id, kind).await },
                move |c| match kind {
                    AccessKind::Allowed => c.allowed_users.contains(&user_id),
                    AccessKind::Denied => c.denied_users.contains(&user_id),
                },
            )
            .await?;

        self.context
            .emit(CollabEvent::CollectionUpdated { collection_id: id });

        Ok(result)
    }

    /// Removes a user from one of the explicit viewer lists
    pub async fn remove_access_entry(
        &self,
        invoker: UserId,
        id: CollectionId,
        user_id: UserId,
        kind: AccessKind,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(id).await?;

        if !fresh.role_of(invoker).allows(Action::ManageAccess) {
            return Err(ActionError::denied("manage access to this collection"));
        }

        let mut attempted = fresh.clone();
        match kind {
            AccessKind::Allowed => attempted.allowed_users.remove(&user_id),
            AccessKind::Denied => attempted.denied_users.remove(&user_id),
        };

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                id,
                "manage access to this collection",
                attempted,
                async { database.remove_access_entry(id, user_id, kind).await },
                move |c| match kind {
                    AccessKind::Allowed => !c.allowed_users.contains(&user_id),
                    AccessKind::Denied => !c.denied_users.contains(&user_id),
                },
            )
            .await?;

        self.context
            .emit(CollabEvent::CollectionUpdated { collection_id: id });

        Ok(result)
    }

    /// The followers of a collection. Only the owner and admins may see
    /// them
    pub async fn followers(&self, invoker: UserId, id: CollectionId) -> ActionResult<Vec<UserId>> {
        let fresh = self.context.authoritative(id).await?;

        if !fresh.role_of(invoker).allows(Action::ViewFollowers) {
            return Err(ActionError::denied("view the followers of this collection"));
        }

        Ok(fresh.followers.iter().copied().collect())
    }

    /// Deletes a collection irreversibly, along with its membership
    /// records. Its posts are soft deleted
    pub async fn delete(&self, invoker: UserId, id: CollectionId) -> ActionResult<()> {
        let fresh = self.context.authoritative(id).await?;

        if !fresh.role_of(invoker).allows(Action::DeleteCollection) {
            return Err(ActionError::denied("delete this collection"));
        }

        self.context.database.delete_collection(id).await?;
        self.context.collections.remove(&id);

        info!("Collection {} deleted", fresh.title);
        self.context
            .emit(CollabEvent::CollectionDeleted { collection_id: id });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shoebox_core::{CollectionKind, InvariantViolation, Role};

    use crate::testing;
    use crate::{ActionError, DatabaseError, NewCollection, UpdatedCollection};

    use super::*;

    #[tokio::test]
    async fn creating_a_private_open_collection_is_rejected() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;

        let result = collab
            .collections
            .create(NewCollection {
                title: "street scenes".to_string(),
                description: None,
                kind: CollectionKind::Open,
                is_public: false,
                user_id: owner,
            })
            .await;

        assert!(matches!(
            result,
            Err(ActionError::Invariant(InvariantViolation::MustBePublic { .. }))
        ));
    }

    #[tokio::test]
    async fn the_creator_becomes_owner_and_first_member() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let id = testing::collection(&collab, CollectionKind::Invite, false, owner).await;

        let data = collab.database.collection_by_id(id).await.unwrap();

        assert_eq!(data.role_of(owner), Role::Owner);
        assert_eq!(data.member_count(), 1);
        assert!(data.member_joined_at.contains_key(&owner));
    }

    #[tokio::test]
    async fn members_cannot_edit() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let member = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.membership.join(id, member).await.unwrap();

        let result = collab
            .collections
            .update(
                member,
                UpdatedCollection {
                    id,
                    title: Some("renamed".to_string()),
                    description: None,
                    is_public: None,
                },
            )
            .await;

        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn updates_merge_partially() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let id = testing::collection(&collab, CollectionKind::Invite, false, owner).await;

        collab
            .collections
            .update(
                owner,
                UpdatedCollection {
                    id,
                    title: None,
                    description: Some("scans from the attic".to_string()),
                    is_public: None,
                },
            )
            .await
            .unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();

        // Untouched fields keep their values
        assert_eq!(data.title, "holiday");
        assert_eq!(data.description, "scans from the attic");
        assert!(!data.is_public);
    }

    #[tokio::test]
    async fn joinable_collections_cannot_go_private() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        let result = collab
            .collections
            .update(
                owner,
                UpdatedCollection {
                    id,
                    title: None,
                    description: None,
                    is_public: Some(false),
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(ActionError::Invariant(InvariantViolation::MustBePublic { .. }))
        ));

        // The stored record is unchanged
        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(data.is_public);
    }

    #[tokio::test]
    async fn only_the_owner_manages_access_lists() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let admin = testing::user(&collab, "grace").await;
        let viewer = testing::user(&collab, "joan").await;
        let id = testing::collection(&collab, CollectionKind::Invite, false, owner).await;

        testing::admin(&collab, id, owner, admin).await;

        let result = collab
            .collections
            .add_access_entry(admin, id, viewer, AccessKind::Allowed)
            .await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));

        collab
            .collections
            .add_access_entry(owner, id, viewer, AccessKind::Allowed)
            .await
            .unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(data.can_view(viewer));

        collab
            .collections
            .remove_access_entry(owner, id, viewer, AccessKind::Allowed)
            .await
            .unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(!data.can_view(viewer));
    }

    #[tokio::test]
    async fn followers_are_visible_to_moderators_only() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let fan = testing::user(&collab, "joan").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.membership.follow(id, fan).await.unwrap();

        assert_eq!(collab.collections.followers(owner, id).await.unwrap(), vec![fan]);

        let result = collab.collections.followers(fan, id).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn deletion_is_owner_only_and_cascades() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let admin = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Invite, false, owner).await;

        testing::admin(&collab, id, owner, admin).await;
        let post = testing::post(&collab, id, owner).await;

        let result = collab.collections.delete(admin, id).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));

        collab.collections.delete(owner, id).await.unwrap();

        assert!(collab.collections.collection_by_id(id).is_none());
        assert!(matches!(
            collab.database.collection_by_id(id).await,
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            collab.database.post_by_id(post).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}

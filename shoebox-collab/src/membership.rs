use log::info;
use shoebox_core::{
    Action, CollectionData, CollectionId, CollectionKind, InvariantViolation, Role, UserId,
};

use crate::{
    util::random_string, ActionError, ActionResult, CollabContext, CollabEvent,
    CollectionInviteData, Database, DatabaseError, MediaStore, NewCollectionInvite, Reconciled,
};

/// Walks users through the membership states of a collection: following,
/// requesting, joining, promotion, and removal.
pub struct MembershipManager<S, Db> {
    context: CollabContext<S, Db>,
}

impl<S, Db> MembershipManager<S, Db>
where
    S: MediaStore,
    Db: Database,
{
    const INVITE_TOKEN_LENGTH: usize = 32;

    pub fn new(context: &CollabContext<S, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Follows a collection. Following twice is a no-op
    pub async fn follow(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;
        let role = fresh.role_of(user_id);

        if role >= Role::Member {
            return Err(ActionError::denied("follow a collection you are in"));
        }

        if role == Role::Follower {
            return Ok(Reconciled::settled(fresh));
        }

        let mut attempted = fresh.clone();
        attempted.followers.insert(user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "follow this collection",
                attempted,
                async { database.add_follower(collection_id, user_id).await },
                move |c| c.followers.contains(&user_id),
            )
            .await?;

        self.context.emit(CollabEvent::CollectionFollowed {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Unfollows a collection. Unfollowing without following is a no-op
    pub async fn unfollow(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if !fresh.followers.contains(&user_id) {
            return Ok(Reconciled::settled(fresh));
        }

        let mut attempted = fresh.clone();
        attempted.followers.remove(&user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "unfollow this collection",
                attempted,
                async { database.remove_follower(collection_id, user_id).await },
                move |c| !c.followers.contains(&user_id),
            )
            .await?;

        self.context.emit(CollabEvent::CollectionUnfollowed {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Requests membership on a Request collection. Invoking this again
    /// while the request is pending cancels it
    pub async fn request(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if fresh.kind != CollectionKind::Request {
            return Err(InvariantViolation::WrongKind {
                expected: CollectionKind::Request,
            }
            .into());
        }

        if fresh.role_of(user_id) >= Role::Member {
            return Err(ActionError::denied("request to join a collection you are in"));
        }

        if fresh.pending_requests.contains(&user_id) {
            return self.cancel_request(collection_id, user_id).await;
        }

        let mut attempted = fresh.clone();
        attempted.pending_requests.insert(user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "request to join this collection",
                attempted,
                async { database.add_request(collection_id, user_id).await },
                move |c| c.pending_requests.contains(&user_id),
            )
            .await?;

        self.context.emit(CollabEvent::CollectionRequestSent {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Cancels a pending membership request. Without one this is a no-op
    pub async fn cancel_request(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if !fresh.pending_requests.contains(&user_id) {
            return Ok(Reconciled::settled(fresh));
        }

        let mut attempted = fresh.clone();
        attempted.pending_requests.remove(&user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "cancel this request",
                attempted,
                async { database.remove_request(collection_id, user_id).await },
                move |c| !c.pending_requests.contains(&user_id),
            )
            .await?;

        self.context.emit(CollabEvent::CollectionRequestCancelled {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Approves a pending membership request, making the requester a
    /// member
    pub async fn approve_request(
        &self,
        invoker: UserId,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if !fresh.role_of(invoker).allows(Action::InviteMember) {
            return Err(ActionError::denied("approve requests on this collection"));
        }

        if !fresh.pending_requests.contains(&user_id) {
            return Err(DatabaseError::NotFound {
                resource: "request",
                identifier: "user_id",
            }
            .into());
        }

        let mut attempted = fresh.clone();
        attempted.pending_requests.remove(&user_id);
        attempted.members.insert(user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "approve this request",
                attempted,
                async {
                    database.add_member(collection_id, user_id).await?;
                    database.remove_request(collection_id, user_id).await
                },
                move |c| {
                    c.members.contains(&user_id) && !c.pending_requests.contains(&user_id)
                },
            )
            .await?;

        info!("User {} joined collection {}", user_id, collection_id);
        self.context.emit(CollabEvent::CollectionJoined {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Declines a pending membership request
    pub async fn decline_request(
        &self,
        invoker: UserId,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if !fresh.role_of(invoker).allows(Action::InviteMember) {
            return Err(ActionError::denied("decline requests on this collection"));
        }

        if !fresh.pending_requests.contains(&user_id) {
            return Err(DatabaseError::NotFound {
                resource: "request",
                identifier: "user_id",
            }
            .into());
        }

        let mut attempted = fresh.clone();
        attempted.pending_requests.remove(&user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "decline this request",
                attempted,
                async { database.remove_request(collection_id, user_id).await },
                move |c| !c.pending_requests.contains(&user_id),
            )
            .await?;

        self.context.emit(CollabEvent::CollectionRequestCancelled {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Joins an Open collection directly, without an approval step.
    /// Joining twice is a no-op
    pub async fn join(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if fresh.kind != CollectionKind::Open {
            return Err(InvariantViolation::WrongKind {
                expected: CollectionKind::Open,
            }
            .into());
        }

        if fresh.role_of(user_id) >= Role::Member {
            return Ok(Reconciled::settled(fresh));
        }

        let mut attempted = fresh.clone();
        attempted.members.insert(user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "join this collection",
                attempted,
                async { database.add_member(collection_id, user_id).await },
                move |c| c.members.contains(&user_id),
            )
            .await?;

        info!("User {} joined collection {}", user_id, collection_id);
        self.context.emit(CollabEvent::CollectionJoined {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Mints a single-use invite into an Invite collection
    pub async fn create_invite(
        &self,
        invoker: UserId,
        collection_id: CollectionId,
    ) -> ActionResult<CollectionInviteData> {
        let fresh = self.context.authoritative(collection_id).await?;

        if fresh.kind != CollectionKind::Invite {
            return Err(InvariantViolation::WrongKind {
                expected: CollectionKind::Invite,
            }
            .into());
        }

        if !fresh.role_of(invoker).allows(Action::InviteMember) {
            return Err(ActionError::denied("invite users to this collection"));
        }

        let invite = self
            .context
            .database
            .create_invite(NewCollectionInvite {
                token: random_string(Self::INVITE_TOKEN_LENGTH),
                collection_id,
                user_id: invoker,
            })
            .await?;

        Ok(invite)
    }

    /// Revokes an invite that has not been used yet
    pub async fn revoke_invite(&self, invoker: UserId, token: &str) -> ActionResult<()> {
        let invite = self.context.database.invite_by_token(token).await?;
        let fresh = self.context.authoritative(invite.collection_id).await?;

        if !fresh.role_of(invoker).allows(Action::InviteMember) {
            return Err(ActionError::denied("revoke invites to this collection"));
        }

        self.context.database.delete_invite(invite.id).await?;

        Ok(())
    }

    /// Consumes an invite token, making the caller a member
    pub async fn join_with_invite(
        &self,
        user_id: UserId,
        token: &str,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let invite = self.context.database.invite_by_token(token).await?;
        let collection_id = invite.collection_id;
        let fresh = self.context.authoritative(collection_id).await?;

        if fresh.role_of(user_id) >= Role::Member {
            return Ok(Reconciled::settled(fresh));
        }

        let mut attempted = fresh.clone();
        attempted.members.insert(user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "join this collection",
                attempted,
                async {
                    database.add_member(collection_id, user_id).await?;
                    database.delete_invite(invite.id).await
                },
                move |c| c.members.contains(&user_id),
            )
            .await?;

        info!("User {} joined collection {}", user_id, collection_id);
        self.context.emit(CollabEvent::CollectionJoined {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Leaves a collection. The owner can never leave, only delete
    pub async fn leave(
        &self,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;
        let role = fresh.role_of(user_id);

        if role == Role::Owner {
            return Err(ActionError::denied("leave a collection you own"));
        }

        if role < Role::Member {
            return Err(DatabaseError::NotFound {
                resource: "member",
                identifier: "user_id",
            }
            .into());
        }

        let mut attempted = fresh.clone();
        attempted.members.remove(&user_id);
        attempted.admins.remove(&user_id);
        attempted.member_joined_at.remove(&user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "leave this collection",
                attempted,
                async { database.remove_member(collection_id, user_id).await },
                move |c| c.role_of(user_id) < Role::Member,
            )
            .await?;

        info!("User {} left collection {}", user_id, collection_id);
        self.context.emit(CollabEvent::CollectionLeft {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Promotes a member to admin. Only the owner may do this, and only
    /// to a plain member
    pub async fn promote(
        &self,
        invoker: UserId,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        if !fresh.role_of(invoker).allows(Action::PromoteMember) {
            return Err(ActionError::denied("promote members of this collection"));
        }

        if fresh.role_of(user_id) != Role::Member {
            return Err(ActionError::denied("promote this user"));
        }

        let mut attempted = fresh.clone();
        attempted.members.remove(&user_id);
        attempted.admins.insert(user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "promote this member",
                attempted,
                async {
                    database
                        .set_member_admin(collection_id, user_id, true)
                        .await
                },
                move |c| c.admins.contains(&user_id),
            )
            .await?;

        info!(
            "User {} is now an admin of collection {}",
            user_id, collection_id
        );
        self.context.emit(CollabEvent::MemberPromoted {
            collection_id,
            user_id,
        });

        Ok(result)
    }

    /// Removes a member or admin from a collection. Removing an admin
    /// takes the owner, removing a member takes an admin or the owner
    pub async fn remove(
        &self,
        invoker: UserId,
        collection_id: CollectionId,
        user_id: UserId,
    ) -> ActionResult<Reconciled<CollectionData>> {
        let fresh = self.context.authoritative(collection_id).await?;

        let required = match fresh.role_of(user_id) {
            Role::Owner => return Err(ActionError::denied("remove the owner")),
            Role::Admin => Action::RemoveAdmin,
            Role::Member => Action::RemoveMember,
            _ => {
                return Err(DatabaseError::NotFound {
                    resource: "member",
                    identifier: "user_id",
                }
                .into())
            }
        };

        if !fresh.role_of(invoker).allows(required) {
            return Err(ActionError::denied("remove this user"));
        }

        let mut attempted = fresh.clone();
        attempted.members.remove(&user_id);
        attempted.admins.remove(&user_id);
        attempted.member_joined_at.remove(&user_id);

        let database = &self.context.database;

        let result = self
            .context
            .reconcile(
                collection_id,
                "remove this user",
                attempted,
                async { database.remove_member(collection_id, user_id).await },
                move |c| c.role_of(user_id) < Role::Member,
            )
            .await?;

        info!(
            "User {} was removed from collection {}",
            user_id, collection_id
        );
        self.context.emit(CollabEvent::CollectionLeft {
            collection_id,
            user_id,
        });

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use shoebox_core::{CollectionKind, InvariantViolation, Role};

    use crate::testing;
    use crate::{ActionError, Database, DatabaseError};

    #[tokio::test]
    async fn joining_an_open_collection_makes_a_member() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let joiner = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.membership.join(id, joiner).await.unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.role_of(joiner), Role::Member);
        assert_eq!(data.member_count(), 2);

        // Joining again changes nothing
        collab.membership.join(id, joiner).await.unwrap();
        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.member_count(), 2);
    }

    #[tokio::test]
    async fn joining_is_only_for_open_collections() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let joiner = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Request, true, owner).await;

        let result = collab.membership.join(id, joiner).await;

        assert!(matches!(
            result,
            Err(ActionError::Invariant(InvariantViolation::WrongKind { .. }))
        ));
    }

    #[tokio::test]
    async fn following_twice_is_a_no_op() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let fan = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.membership.follow(id, fan).await.unwrap();
        collab.membership.follow(id, fan).await.unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.followers.len(), 1);
        assert_eq!(data.role_of(fan), Role::Follower);

        collab.membership.unfollow(id, fan).await.unwrap();
        collab.membership.unfollow(id, fan).await.unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(data.followers.is_empty());
    }

    #[tokio::test]
    async fn members_do_not_follow() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        let result = collab.membership.follow(id, owner).await;

        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn requesting_again_cancels_the_pending_request() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let requester = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Request, true, owner).await;

        collab.membership.request(id, requester).await.unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(data.pending_requests.contains(&requester));
        // A pending request does not grant a role
        assert_eq!(data.role_of(requester), Role::Outsider);

        collab.membership.request(id, requester).await.unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(data.pending_requests.is_empty());
        assert_eq!(data.role_of(requester), Role::Outsider);
    }

    #[tokio::test]
    async fn approving_a_request_makes_a_member_and_clears_it() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let requester = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Request, true, owner).await;

        collab.membership.request(id, requester).await.unwrap();
        collab
            .membership
            .approve_request(owner, id, requester)
            .await
            .unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.role_of(requester), Role::Member);
        assert!(data.pending_requests.is_empty());
    }

    #[tokio::test]
    async fn requests_are_moderated_by_owner_and_admins_only() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let member = testing::user(&collab, "grace").await;
        let requester = testing::user(&collab, "joan").await;
        let id = testing::collection(&collab, CollectionKind::Request, true, owner).await;

        collab.database.add_member(id, member).await.unwrap();
        collab.membership.request(id, requester).await.unwrap();

        let result = collab
            .membership
            .approve_request(member, id, requester)
            .await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));

        collab
            .membership
            .decline_request(owner, id, requester)
            .await
            .unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(data.pending_requests.is_empty());
        assert_eq!(data.role_of(requester), Role::Outsider);
    }

    #[tokio::test]
    async fn invites_admit_members_and_are_consumed() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let invitee = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Invite, false, owner).await;

        let invite = collab.membership.create_invite(owner, id).await.unwrap();

        collab
            .membership
            .join_with_invite(invitee, &invite.token)
            .await
            .unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.role_of(invitee), Role::Member);

        // The token is single-use
        let result = collab
            .membership
            .join_with_invite(invitee, &invite.token)
            .await;
        assert!(matches!(
            result,
            Err(ActionError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn invites_require_moderation_rights() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let member = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Invite, false, owner).await;

        collab.database.add_member(id, member).await.unwrap();

        let result = collab.membership.create_invite(member, id).await;

        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn individual_collections_stay_single_occupant() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let outsider = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Individual, true, owner).await;

        assert!(matches!(
            collab.membership.join(id, outsider).await,
            Err(ActionError::Invariant(InvariantViolation::WrongKind { .. }))
        ));
        assert!(matches!(
            collab.membership.request(id, outsider).await,
            Err(ActionError::Invariant(InvariantViolation::WrongKind { .. }))
        ));
        assert!(matches!(
            collab.membership.create_invite(owner, id).await,
            Err(ActionError::Invariant(InvariantViolation::WrongKind { .. }))
        ));

        // Following is still fine
        collab.membership.follow(id, outsider).await.unwrap();
    }

    #[tokio::test]
    async fn the_owner_never_leaves() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        let result = collab.membership.leave(id, owner).await;

        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn leaving_drops_the_admin_role_too() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let admin = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.membership.join(id, admin).await.unwrap();
        collab.membership.promote(owner, id, admin).await.unwrap();

        collab.membership.leave(id, admin).await.unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.role_of(admin), Role::Outsider);
        assert!(data.admins.is_empty());
    }

    #[tokio::test]
    async fn only_the_owner_promotes_and_only_members_qualify() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let admin = testing::user(&collab, "grace").await;
        let member = testing::user(&collab, "joan").await;
        let follower = testing::user(&collab, "mary").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.membership.join(id, admin).await.unwrap();
        collab.membership.join(id, member).await.unwrap();
        collab.membership.follow(id, follower).await.unwrap();
        collab.membership.promote(owner, id, admin).await.unwrap();

        // Admins cannot promote
        let result = collab.membership.promote(admin, id, member).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));

        // Followers are not eligible
        let result = collab.membership.promote(owner, id, follower).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));

        // Admins cannot be promoted again
        let result = collab.membership.promote(owner, id, admin).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn admins_remove_members_but_not_each_other() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let admin = testing::user(&collab, "grace").await;
        let other_admin = testing::user(&collab, "joan").await;
        let member = testing::user(&collab, "mary").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        for user in [admin, other_admin, member] {
            collab.membership.join(id, user).await.unwrap();
        }
        collab.membership.promote(owner, id, admin).await.unwrap();
        collab
            .membership
            .promote(owner, id, other_admin)
            .await
            .unwrap();

        // An admin removes a member
        collab.membership.remove(admin, id, member).await.unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.role_of(member), Role::Outsider);

        // But not a fellow admin
        let result = collab.membership.remove(admin, id, other_admin).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));

        // The owner can
        collab
            .membership
            .remove(owner, id, other_admin)
            .await
            .unwrap();

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert_eq!(data.role_of(other_admin), Role::Outsider);
    }

    #[tokio::test]
    async fn nobody_removes_the_owner() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let admin = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.membership.join(id, admin).await.unwrap();
        collab.membership.promote(owner, id, admin).await.unwrap();

        let result = collab.membership.remove(admin, id, owner).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));

        // Not even the owner themselves
        let result = collab.membership.remove(owner, id, owner).await;
        assert!(matches!(result, Err(ActionError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn a_failed_write_leaves_no_optimistic_state_behind() {
        let collab = testing::collab();
        let owner = testing::user(&collab, "ada").await;
        let fan = testing::user(&collab, "grace").await;
        let id = testing::collection(&collab, CollectionKind::Open, true, owner).await;

        collab.database.fail_writes(true);

        let result = collab.membership.follow(id, fan).await;
        assert!(matches!(result, Err(ActionError::Db(_))));

        let handle = collab.collections.collection_by_id(id).unwrap();
        assert!(handle.data().followers.is_empty());

        collab.database.fail_writes(false);

        let data = collab.database.collection_by_id(id).await.unwrap();
        assert!(data.followers.is_empty());
    }
}

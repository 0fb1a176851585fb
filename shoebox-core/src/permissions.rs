use crate::{CollectionData, CollectionKind, PostData, Role, UserId};

/// An operation gated by role tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Change the collection's name, photo, description, or visibility
    EditCollection,
    /// Maintain the explicit viewer allow/deny lists
    ManageAccess,
    ViewFollowers,
    InviteMember,
    PromoteMember,
    RemoveAdmin,
    RemoveMember,
    DeleteCollection,
    PinPost,
    /// Delete any post. Members deleting their own posts are handled by
    /// [can_delete_post]
    DeletePost,
    CreatePost,
}

impl Action {
    /// The lowest role tier the action is available to
    fn minimum_role(self) -> Role {
        match self {
            Self::ManageAccess
            | Self::PromoteMember
            | Self::RemoveAdmin
            | Self::DeleteCollection => Role::Owner,
            Self::EditCollection
            | Self::ViewFollowers
            | Self::InviteMember
            | Self::RemoveMember
            | Self::PinPost
            | Self::DeletePost => Role::Admin,
            Self::CreatePost => Role::Member,
        }
    }
}

impl Role {
    /// Whether this role tier grants the action
    pub fn allows(self, action: Action) -> bool {
        self >= action.minimum_role()
    }
}

/// Pin rights collapse to the post author in single-occupant collections
pub fn can_pin_post(collection: &CollectionData, user_id: UserId, post: &PostData) -> bool {
    if collection.kind == CollectionKind::Individual {
        return post.author_id == user_id;
    }

    collection.role_of(user_id).allows(Action::PinPost)
}

/// Owners and admins may delete any post, members their own
pub fn can_delete_post(collection: &CollectionData, user_id: UserId, post: &PostData) -> bool {
    if collection.kind == CollectionKind::Individual {
        return post.author_id == user_id;
    }

    let role = collection.role_of(user_id);

    role.allows(Action::DeletePost) || (role >= Role::Member && post.author_id == user_id)
}

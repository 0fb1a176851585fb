use serde::{Deserialize, Serialize};

use crate::{CollectionData, UserId};

/// A user's relationship to a collection.
///
/// Tiers are strictly ordered, and a user occupies exactly the highest
/// tier that applies to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Outsider,
    Follower,
    Member,
    Admin,
    Owner,
}

impl CollectionData {
    /// Resolves the role a user currently holds in this collection
    pub fn role_of(&self, user_id: UserId) -> Role {
        if user_id == self.owner_id {
            Role::Owner
        } else if self.admins.contains(&user_id) {
            Role::Admin
        } else if self.members.contains(&user_id) {
            Role::Member
        } else if self.followers.contains(&user_id) {
            Role::Follower
        } else {
            Role::Outsider
        }
    }
}

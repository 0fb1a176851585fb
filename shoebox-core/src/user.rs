use serde::{Deserialize, Serialize};

use crate::PrimaryKey;

pub type UserId = PrimaryKey;

/// A shoebox account, as the user directory exposes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
}

mod collection;
mod config;
mod ordering;
mod permissions;
mod post;
mod roles;
mod user;
mod util;

pub use collection::*;
pub use config::*;
pub use ordering::*;
pub use permissions::*;
pub use post::*;
pub use roles::*;
pub use user::*;
pub use util::*;

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

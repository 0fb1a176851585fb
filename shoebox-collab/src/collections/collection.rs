use std::mem;

use parking_lot::Mutex;
use shoebox_core::{CollectionData, CollectionId, Role, UserId};

/// A shoebox collection, holding the last record synced from the store.
pub struct Collection {
    data: Mutex<CollectionData>,
}

impl Collection {
    pub fn new(data: CollectionData) -> Self {
        Self { data: data.into() }
    }

    /// The last record synced from the store. For display only, it is
    /// never an input to a permission decision
    pub fn data(&self) -> CollectionData {
        self.data.lock().clone()
    }

    pub fn id(&self) -> CollectionId {
        self.data.lock().id
    }

    /// The role a user holds according to the last synced record
    pub fn role_of(&self, user_id: UserId) -> Role {
        self.data.lock().role_of(user_id)
    }

    /// Replaces the held record with an authoritative one
    pub(crate) fn sync(&self, data: CollectionData) {
        *self.data.lock() = data;
    }

    /// Applies an optimistic record, returning the one it replaced
    pub(crate) fn stage(&self, attempted: CollectionData) -> CollectionData {
        mem::replace(&mut *self.data.lock(), attempted)
    }
}

mod actions;
mod collections;
mod db;
mod events;
mod media;
mod membership;
mod posts;
mod util;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use actions::*;
pub use collections::*;
pub use db::*;
pub use events::*;
pub use media::*;
pub use membership::*;
pub use posts::*;

use crossbeam::channel::unbounded;
use shoebox_core::{ArcedStore, CollectionData, CollectionId, Config};

/// The shoebox collab system, facilitating collection membership,
/// posting, moderation, and more.
pub struct Collab<S, Db> {
    media: Arc<S>,
    database: Arc<Db>,

    event_receiver: EventReceiver,

    pub collections: CollectionManager<S, Db>,
    pub membership: MembershipManager<S, Db>,
    pub posts: PostManager<S, Db>,
}

/// A type passed to various components of the collab system, to access
/// state, emit events, and dispatch actions.
pub struct CollabContext<S, Db> {
    pub config: Config,
    pub media: Arc<S>,
    pub database: Arc<Db>,

    pub collections: ArcedStore<CollectionId, Collection>,

    event_sender: EventSender,
}

impl<S, Db> Collab<S, Db>
where
    S: MediaStore,
    Db: Database,
{
    pub fn new(config: Config, media: S, database: Db) -> Self {
        let media = Arc::new(media);
        let database = Arc::new(database);

        let (event_sender, event_receiver) = unbounded();

        let context = CollabContext {
            config,
            media: media.clone(),
            database: database.clone(),
            collections: Default::default(),
            event_sender,
        };

        Self {
            media,
            database,
            event_receiver,
            collections: CollectionManager::new(&context),
            membership: MembershipManager::new(&context),
            posts: PostManager::new(&context),
        }
    }

    /// Receive events from the collab system.
    pub fn wait_for_event(&self) -> CollabEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }
}

impl<S, Db> CollabContext<S, Db>
where
    S: MediaStore,
    Db: Database,
{
    pub fn emit(&self, event: CollabEvent) {
        self.event_sender.send(event).expect("event is sent");
    }

    /// Returns the cached handle of a collection, if it was restored or
    /// created in this process
    pub fn collection_by_id(&self, id: CollectionId) -> Option<Arc<Collection>> {
        self.collections.get(&id)
    }

    /// Fetches the authoritative record from the store, refreshing the
    /// cached handle along the way. Every permission decision starts here
    pub(crate) async fn authoritative(&self, id: CollectionId) -> Result<CollectionData> {
        let data = self.database.collection_by_id(id).await?;

        if let Some(handle) = self.collection_by_id(id) {
            handle.sync(data.clone());
        }

        Ok(data)
    }

    /// Applies an optimistic record to the cached handle, returning what
    /// it replaced
    pub(crate) fn stage(
        &self,
        id: CollectionId,
        attempted: CollectionData,
    ) -> Option<CollectionData> {
        self.collection_by_id(id).map(|h| h.stage(attempted))
    }

    /// Rolls a staged record back
    pub(crate) fn restore_staged(&self, id: CollectionId, previous: Option<CollectionData>) {
        if let (Some(handle), Some(previous)) = (self.collection_by_id(id), previous) {
            handle.sync(previous);
        }
    }
}

impl<S, Db> Clone for CollabContext<S, Db>
where
    S: MediaStore,
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            media: self.media.clone(),
            database: self.database.clone(),
            collections: self.collections.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}

// Realistically, the context should always be created by the collab
// system. However, in a test, this may not be possible.
#[cfg(test)]
impl CollabContext<MemoryMediaStore, MemoryDatabase> {
    pub(crate) fn for_tests() -> Self {
        let (event_sender, _) = unbounded();

        Self {
            config: Config::default(),
            media: Arc::new(MemoryMediaStore::default()),
            database: Arc::new(MemoryDatabase::new()),
            collections: Default::default(),
            event_sender,
        }
    }
}

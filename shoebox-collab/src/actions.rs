use std::future::Future;

use shoebox_core::{CollectionData, CollectionId, InvariantViolation};
use thiserror::Error;

use crate::{CollabContext, Database, DatabaseError, MediaStore};

pub type ActionResult<T> = Result<T, ActionError>;

/// An error raised by a membership, collection, or post action
#[derive(Debug, Error)]
pub enum ActionError {
    /// The invoker's current role does not grant the action. Checked
    /// against the freshly fetched record, never a cached one
    #[error("Not authorized to {action}")]
    PermissionDenied { action: &'static str },
    /// A record-level rule would be broken. Nothing was written
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    /// Something went wrong with the store
    #[error(transparent)]
    Db(DatabaseError),
    /// The record changed while the action was in flight and no longer
    /// satisfies what was checked up front. The optimistic local state
    /// has been rolled back
    #[error("State changed while trying to {action}")]
    StaleState { action: &'static str },
}

impl ActionError {
    pub(crate) fn denied(action: &'static str) -> Self {
        Self::PermissionDenied { action }
    }
}

impl From<DatabaseError> for ActionError {
    fn from(value: DatabaseError) -> Self {
        Self::Db(value)
    }
}

/// The two states a mutating action moves a record through: the
/// optimistic one applied locally, and the one the store confirmed
/// afterwards.
#[derive(Debug, Clone)]
pub struct Reconciled<T> {
    pub attempted: T,
    pub confirmed: T,
}

impl<T> Reconciled<T>
where
    T: Clone,
{
    /// An action that turned out to be a no-op
    pub(crate) fn settled(state: T) -> Self {
        Self {
            attempted: state.clone(),
            confirmed: state,
        }
    }
}

impl<S, Db> CollabContext<S, Db>
where
    S: MediaStore,
    Db: Database,
{
    /// Drives a staged record through the store: applies it
    /// optimistically, performs the write, re-fetches the authoritative
    /// record, and verifies the transition actually took effect.
    ///
    /// Any failure rolls the staged record back before surfacing, so a
    /// failed action never leaves a partial local mutation behind.
    pub(crate) async fn reconcile<F, V>(
        &self,
        id: CollectionId,
        action: &'static str,
        attempted: CollectionData,
        write: F,
        verify: V,
    ) -> ActionResult<Reconciled<CollectionData>>
    where
        F: Future<Output = Result<(), DatabaseError>>,
        V: FnOnce(&CollectionData) -> bool,
    {
        let previous = self.stage(id, attempted.clone());

        if let Err(e) = write.await {
            self.restore_staged(id, previous);
            return Err(e.into());
        }

        let confirmed = match self.database.collection_by_id(id).await {
            Ok(data) => data,
            Err(e) => {
                self.restore_staged(id, previous);
                return Err(e.into());
            }
        };

        if !verify(&confirmed) {
            self.restore_staged(id, previous);
            return Err(ActionError::StaleState { action });
        }

        if let Some(handle) = self.collection_by_id(id) {
            handle.sync(confirmed.clone());
        }

        Ok(Reconciled {
            attempted,
            confirmed,
        })
    }
}

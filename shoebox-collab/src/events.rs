use crossbeam::channel::{Receiver, Sender};
use serde::Serialize;
use shoebox_core::{CollectionId, PostId, UserId};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// Events broadcast by the collab system.
///
/// Fire and forget: consumers re-fetch whatever they display when one
/// arrives. No delivery or ordering guarantee is made.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum CollabEvent {
    CollectionCreated {
        collection_id: CollectionId,
    },
    /// A collection's fields or access lists changed
    CollectionUpdated {
        collection_id: CollectionId,
    },
    CollectionDeleted {
        collection_id: CollectionId,
    },
    /// A user became a member, by joining, approval, or invite
    CollectionJoined {
        collection_id: CollectionId,
        user_id: UserId,
    },
    /// A user stopped being a member, by leaving or removal
    CollectionLeft {
        collection_id: CollectionId,
        user_id: UserId,
    },
    CollectionFollowed {
        collection_id: CollectionId,
        user_id: UserId,
    },
    CollectionUnfollowed {
        collection_id: CollectionId,
        user_id: UserId,
    },
    CollectionRequestSent {
        collection_id: CollectionId,
        user_id: UserId,
    },
    /// A membership request was cancelled by its sender or declined
    CollectionRequestCancelled {
        collection_id: CollectionId,
        user_id: UserId,
    },
    MemberPromoted {
        collection_id: CollectionId,
        user_id: UserId,
    },
    PostCreated {
        collection_id: CollectionId,
        post_id: PostId,
    },
    PostUpdated {
        collection_id: CollectionId,
        post_id: PostId,
    },
    PostDeleted {
        collection_id: CollectionId,
        post_id: PostId,
    },
    /// A post took a pin slot, evicting the oldest pin if the slots
    /// were full
    PostPinned {
        collection_id: CollectionId,
        post_id: PostId,
        evicted: Option<PostId>,
    },
    PostUnpinned {
        collection_id: CollectionId,
        post_id: PostId,
    },
}

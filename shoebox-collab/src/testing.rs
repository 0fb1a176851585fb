use shoebox_core::{CollectionId, CollectionKind, Config, PostId, UserId};

use crate::{
    Collab, Database, MemoryDatabase, MemoryMediaStore, NewCollection, NewPost, NewUser,
};

pub(crate) type TestCollab = Collab<MemoryMediaStore, MemoryDatabase>;

pub(crate) fn collab() -> TestCollab {
    Collab::new(
        Config::default(),
        MemoryMediaStore::default(),
        MemoryDatabase::new(),
    )
}

pub(crate) async fn user(collab: &TestCollab, username: &str) -> UserId {
    collab
        .database
        .create_user(NewUser {
            username: username.to_string(),
            display_name: username.to_string(),
        })
        .await
        .expect("user is created")
        .id
}

pub(crate) async fn collection(
    collab: &TestCollab,
    kind: CollectionKind,
    is_public: bool,
    owner: UserId,
) -> CollectionId {
    collab
        .collections
        .create(NewCollection {
            title: "holiday".to_string(),
            description: None,
            kind,
            is_public,
            user_id: owner,
        })
        .await
        .expect("collection is created")
        .id()
}

/// Adds a user as member and promotes them, bypassing kind restrictions
pub(crate) async fn admin(collab: &TestCollab, id: CollectionId, owner: UserId, user_id: UserId) {
    collab
        .database
        .add_member(id, user_id)
        .await
        .expect("member is added");

    collab
        .membership
        .promote(owner, id, user_id)
        .await
        .expect("member is promoted");
}

pub(crate) async fn post(collab: &TestCollab, collection_id: CollectionId, author: UserId) -> PostId {
    collab
        .posts
        .create(NewPost {
            collection_id,
            author_id: author,
            title: None,
            caption: None,
            media: vec![],
            allow_download: true,
            allow_replies: true,
            tagged_users: vec![],
        })
        .await
        .expect("post is created")
        .id
}

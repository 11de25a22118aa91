//! Group Tests

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use chat_coordinator::application::dto::{GroupProfile, PhotoRef, Recipient};
use chat_coordinator::application::services::{GroupEdit, NewGroup};
use chat_coordinator::domain::{ChatType, ContentKind, Group, GroupRepository, GroupRole, User};
use chat_coordinator::infrastructure::memory::InMemoryStore;
use chat_coordinator::shared::error::AppError;

use crate::common::{MockBlobs, TestContext};

/// Which group write the store refuses.
#[derive(Clone, Copy, PartialEq)]
enum Refuse {
    Create,
    Update,
}

/// Group store that becomes unavailable for one kind of write.
struct FlakyGroups {
    inner: Arc<InMemoryStore>,
    refuse: Refuse,
    attempted: Mutex<Vec<String>>,
}

#[async_trait]
impl GroupRepository for FlakyGroups {
    async fn find_by_id(&self, id: &str) -> Result<Option<Group>, AppError> {
        GroupRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Group>, AppError> {
        GroupRepository::find_by_participant(self.inner.as_ref(), user_id).await
    }

    async fn create(&self, group: &Group) -> Result<Group, AppError> {
        self.attempted.lock().push(group.id.clone());
        if self.refuse == Refuse::Create {
            return Err(AppError::StoreUnavailable("groups offline".into()));
        }
        GroupRepository::create(self.inner.as_ref(), group).await
    }

    async fn update(&self, group: &Group) -> Result<Group, AppError> {
        if self.refuse == Refuse::Update {
            return Err(AppError::StoreUnavailable("groups offline".into()));
        }
        GroupRepository::update(self.inner.as_ref(), group).await
    }
}

fn flaky_context(refuse: Refuse) -> (TestContext, Arc<FlakyGroups>) {
    let mut flaky = None;
    let ctx = TestContext::with_repositories(|store, repos| {
        let groups = Arc::new(FlakyGroups {
            inner: store.clone(),
            refuse,
            attempted: Mutex::new(Vec::new()),
        });
        repos.groups = groups.clone();
        flaky = Some(groups);
    });
    (ctx, flaky.unwrap())
}

fn solo_group(name: &str) -> NewGroup {
    NewGroup {
        name: name.into(),
        description: None,
        photo: None,
        participants: BTreeMap::new(),
    }
}

fn roles(entries: &[(&User, GroupRole)]) -> BTreeMap<String, GroupRole> {
    entries.iter().map(|(u, r)| (u.id.clone(), *r)).collect()
}

fn edit_of(profile: &GroupProfile, participants: BTreeMap<String, GroupRole>) -> GroupEdit {
    GroupEdit {
        name: profile.name.clone(),
        description: profile.description.clone(),
        photo: None,
        participants,
    }
}

async fn create_group(ctx: &TestContext, creator: &User, members: &[&User]) -> GroupProfile {
    let participants = members.iter().map(|m| (m.id.clone(), GroupRole::Member)).collect();
    ctx.services
        .groups
        .create(
            &creator.id,
            NewGroup {
                name: "Hiking".into(),
                description: None,
                photo: None,
                participants,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_creator_becomes_admin_and_everyone_is_told() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let bob_conn = ctx.connect(&bob.id).await;
    let alice_conn = ctx.connect(&alice.id).await;
    ctx.transport.clear();

    let group = create_group(&ctx, &alice, &[&bob]).await;

    assert_eq!(group.admins(), vec![alice.id.as_str()]);
    assert_eq!(group.participant(&bob.id).unwrap().role, GroupRole::Member);
    assert!(group.participant(&bob.id).unwrap().online);
    assert!(group.chat_id.is_some());
    for conn in [&alice_conn, &bob_conn] {
        assert_eq!(ctx.transport.names_for(conn), vec!["group-profile-changed".to_string()]);
    }
}

#[tokio::test]
async fn test_unknown_participant_cannot_be_added() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let mut participants = BTreeMap::new();
    participants.insert("ghost".to_string(), GroupRole::Member);

    let err = ctx
        .services
        .groups
        .create(
            &alice.id,
            NewGroup {
                name: "Nobody here".into(),
                description: None,
                photo: None,
                participants,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(ctx.services.groups.list_groups(&alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_only_admins_edit() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let group = create_group(&ctx, &alice, &[&bob]).await;

    let edit = edit_of(&group, roles(&[(&alice, GroupRole::Admin), (&bob, GroupRole::Admin)]));
    let err = ctx.services.groups.edit(&bob.id, &group.id, edit).await.unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_edit_that_drops_a_participant_leaves_group_unchanged() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let carol = ctx.user().await;
    let group = create_group(&ctx, &alice, &[&bob, &carol]).await;

    let mut edit = edit_of(&group, roles(&[(&alice, GroupRole::Admin), (&bob, GroupRole::Member)]));
    edit.name = "Renamed".into();
    let err = ctx.services.groups.edit(&alice.id, &group.id, edit).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let current = ctx.services.groups.get_profile(&alice.id, &group.id).await.unwrap();
    assert_eq!(current, group);
}

#[tokio::test]
async fn test_creator_cannot_be_demoted_while_active() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let group = create_group(&ctx, &alice, &[&bob]).await;

    let edit = edit_of(&group, roles(&[(&alice, GroupRole::Member), (&bob, GroupRole::Admin)]));
    let err = ctx.services.groups.edit(&alice.id, &group.id, edit).await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_edit_adds_and_removes_participants() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let carol = ctx.user().await;
    let group = create_group(&ctx, &alice, &[&bob]).await;

    let edit = edit_of(
        &group,
        roles(&[
            (&alice, GroupRole::Admin),
            (&bob, GroupRole::Former),
            (&carol, GroupRole::Member),
        ]),
    );
    let edited = ctx.services.groups.edit(&alice.id, &group.id, edit).await.unwrap();

    assert_eq!(edited.participant(&bob.id).unwrap().role, GroupRole::Former);
    assert_eq!(edited.participant(&carol.id).unwrap().role, GroupRole::Member);
}

#[tokio::test]
async fn test_new_participant_cannot_join_as_former() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let carol = ctx.user().await;
    let group = create_group(&ctx, &alice, &[]).await;

    let edit = edit_of(&group, roles(&[(&alice, GroupRole::Admin), (&carol, GroupRole::Former)]));
    let err = ctx.services.groups.edit(&alice.id, &group.id, edit).await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_last_admin_leaving_promotes_exactly_one_participant() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let carol = ctx.user().await;
    let group = create_group(&ctx, &alice, &[&bob, &carol]).await;
    let carol_conn = ctx.connect(&carol.id).await;
    ctx.transport.clear();

    let after = ctx.services.groups.leave(&alice.id, &group.id).await.unwrap();

    assert_eq!(after.participant(&alice.id).unwrap().role, GroupRole::Former);
    let admins = after.admins();
    assert_eq!(admins.len(), 1);
    assert!(admins[0] == bob.id || admins[0] == carol.id);
    assert_eq!(ctx.transport.names_for(&carol_conn), vec!["group-profile-changed".to_string()]);
}

#[tokio::test]
async fn test_former_participant_keeps_history_but_cannot_post() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let group = create_group(&ctx, &alice, &[&bob]).await;
    let chat_id = group.chat_id.clone().unwrap();
    ctx.services
        .messages
        .send(&bob.id, &chat_id, "bye all", ContentKind::Text)
        .await
        .unwrap();

    ctx.services.groups.leave(&bob.id, &group.id).await.unwrap();

    let err = ctx
        .services
        .messages
        .send(&bob.id, &chat_id, "one more", ContentKind::Text)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(ctx.services.messages.list_messages(&bob.id, &chat_id).await.unwrap().len(), 1);

    let err = ctx.services.groups.leave(&bob.id, &group.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_group_messages_skip_former_participants() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let carol = ctx.user().await;
    let group = create_group(&ctx, &alice, &[&bob, &carol]).await;
    let chat_id = group.chat_id.clone().unwrap();
    ctx.services.groups.leave(&carol.id, &group.id).await.unwrap();
    let bob_conn = ctx.connect(&bob.id).await;
    let carol_conn = ctx.connect(&carol.id).await;
    ctx.transport.clear();

    let outcome = ctx
        .services
        .messages
        .send(&alice.id, &chat_id, "who's in?", ContentKind::Text)
        .await
        .unwrap();

    assert!(!outcome.recipients.contains(&carol.id));
    assert_eq!(ctx.transport.names_for(&bob_conn), vec!["message-created".to_string()]);
    assert!(ctx.transport.events_for(&carol_conn).is_empty());
}

#[tokio::test]
async fn test_uploaded_photo_goes_to_group_folder() {
    let mut blobs = MockBlobs::new();
    blobs
        .expect_upload()
        .withf(|_, folder, tag, bytes| {
            folder.to_string() == "groups" && tag.to_string() == "photo" && bytes.len() == 3
        })
        .times(1)
        .returning(|owner, _, _, _| Ok(format!("https://blobs.test/groups/{}/photo", owner)));
    let ctx = TestContext::with_blobs(blobs);
    let alice = ctx.user().await;

    let group = ctx
        .services
        .groups
        .create(
            &alice.id,
            NewGroup {
                name: "Photos".into(),
                description: None,
                photo: Some(PhotoRef::Upload(vec![1, 2, 3])),
                participants: BTreeMap::new(),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        group.photo_url,
        Some(format!("https://blobs.test/groups/{}/photo", group.id))
    );
}

#[tokio::test]
async fn test_outsider_cannot_view_group() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let mallory = ctx.user().await;
    let group = create_group(&ctx, &alice, &[]).await;

    let err = ctx
        .services
        .groups
        .get_profile(&mallory.id, &group.id)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_failed_group_write_leaves_no_chat_behind() {
    let (ctx, groups) = flaky_context(Refuse::Create);
    let alice = ctx.user().await;

    let err = ctx
        .services
        .groups
        .create(&alice.id, solo_group("Orphans"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StoreUnavailable(_)));
    let attempted = groups.attempted.lock().clone();
    assert_eq!(attempted.len(), 1);
    assert!(ctx.repos.chats.find_by_group(&attempted[0]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_group_missing_its_chat_link_still_reaches_its_chat() {
    let (ctx, groups) = flaky_context(Refuse::Update);
    let alice = ctx.user().await;

    let err = ctx
        .services
        .groups
        .create(&alice.id, solo_group("Half done"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(_)));

    let group_id = groups.attempted.lock()[0].clone();
    let chats = ctx.services.chats.list_chats(&alice.id).await.unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].recipient, Recipient::Group { group_id: group_id.clone() });

    let chat = ctx.repos.chats.find_by_group(&group_id).await.unwrap().unwrap();
    assert_eq!(chat.chat_type, ChatType::Group);
}

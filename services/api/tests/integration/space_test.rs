use linetime_api::domain::repository::SpaceRepository;
use linetime_api::error::ApiError;
use linetime_api::usecase::space::{
    CreateSpaceInput, CreateSpaceUseCase, GetSpaceUseCase, JoinSpaceUseCase, ListMembersUseCase,
    ListSpacesUseCase, RefreshInviteUseCase, RemoveMemberInput, RemoveMemberUseCase,
};
use linetime_domain::space::{MemberRole, SpaceType};
use uuid::Uuid;

use crate::helpers::{MockSpaceRepo, MockUserRepo, add_member, seed_space, test_user};

const INVITE_BASE: &str = "https://linetime.app/invite";

async fn fixture() -> (MockUserRepo, MockSpaceRepo, Uuid, Uuid) {
    let owner = test_user("owner@qq.com", "owner").await;
    let guest = test_user("guest@qq.com", "guest").await;
    let (owner_id, guest_id) = (owner.id, guest.id);
    let users = MockUserRepo::new(vec![owner, guest]);
    let spaces = MockSpaceRepo::new(users.clone());
    (users, spaces, owner_id, guest_id)
}

// ── CreateSpace ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_space_with_owner_membership() {
    let (_, spaces, owner_id, _) = fixture().await;
    let uc = CreateSpaceUseCase {
        spaces: spaces.clone(),
        invite_base_url: INVITE_BASE.to_owned(),
    };

    let space = uc
        .execute(CreateSpaceInput {
            owner_id,
            name: "  Us  ".to_owned(),
            description: Some(" ".to_owned()),
            space_type: Some("group".to_owned()),
        })
        .await
        .unwrap();

    assert_eq!(space.name, "Us");
    assert_eq!(space.description, None);
    assert_eq!(space.space_type, SpaceType::Group);
    assert_eq!(space.invite_code.len(), 8);
    assert_eq!(
        space.invite_link,
        format!("{INVITE_BASE}/{}", space.invite_code)
    );
    assert_eq!(spaces.member_count(space.id), 1);

    let members = ListMembersUseCase {
        spaces: spaces.clone(),
    }
    .execute(owner_id, space.id)
    .await
    .unwrap();
    assert_eq!(members[0].role, MemberRole::Owner);
}

#[tokio::test]
async fn should_default_to_personal_and_reject_unknown_type() {
    let (_, spaces, owner_id, _) = fixture().await;
    let uc = CreateSpaceUseCase {
        spaces,
        invite_base_url: INVITE_BASE.to_owned(),
    };

    let space = uc
        .execute(CreateSpaceInput {
            owner_id,
            name: "Us".to_owned(),
            description: None,
            space_type: None,
        })
        .await
        .unwrap();
    assert_eq!(space.space_type, SpaceType::Personal);

    let result = uc
        .execute(CreateSpaceInput {
            owner_id,
            name: "Us".to_owned(),
            description: None,
            space_type: Some("team".to_owned()),
        })
        .await;
    assert!(
        matches!(result, Err(ApiError::Validation(_))),
        "expected Validation, got {result:?}"
    );
}

// ── Join / list ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_join_by_invite_code_once() {
    let (_, spaces, owner_id, guest_id) = fixture().await;
    let space = seed_space(&spaces, owner_id, "AB12CD34");
    let uc = JoinSpaceUseCase {
        spaces: spaces.clone(),
    };

    let joined = uc.execute(guest_id, " ab12cd34 ").await.unwrap();
    assert_eq!(joined.id, space.id);
    assert_eq!(spaces.member_count(space.id), 2);

    let again = uc.execute(guest_id, "AB12CD34").await;
    assert!(
        matches!(&again, Err(ApiError::Conflict(msg)) if msg == "您已经在该空间中"),
        "expected Conflict, got {again:?}"
    );
}

#[tokio::test]
async fn should_reject_unknown_invite_code() {
    let (_, spaces, _, guest_id) = fixture().await;
    let result = JoinSpaceUseCase { spaces }.execute(guest_id, "ZZZZZZZZ").await;
    assert!(
        matches!(&result, Err(ApiError::NotFound(msg)) if msg == "邀请码无效"),
        "expected NotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_list_only_member_spaces() {
    let (_, spaces, owner_id, guest_id) = fixture().await;
    let mine = seed_space(&spaces, owner_id, "AAAA1111");
    seed_space(&spaces, guest_id, "BBBB2222");

    let listed = ListSpacesUseCase { spaces }.execute(owner_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, mine.id);
}

#[tokio::test]
async fn should_hide_space_from_non_members() {
    let (_, spaces, owner_id, guest_id) = fixture().await;
    let space = seed_space(&spaces, owner_id, "AAAA1111");

    let get = GetSpaceUseCase {
        spaces: spaces.clone(),
    };
    assert!(get.execute(owner_id, space.id).await.is_ok());
    let result = get.execute(guest_id, space.id).await;
    assert!(
        matches!(result, Err(ApiError::Forbidden(_))),
        "expected Forbidden, got {result:?}"
    );

    let missing = get.execute(owner_id, Uuid::now_v7()).await;
    assert!(
        matches!(missing, Err(ApiError::NotFound(_))),
        "expected NotFound, got {missing:?}"
    );

    let members = ListMembersUseCase { spaces }.execute(guest_id, space.id).await;
    assert!(
        matches!(members, Err(ApiError::Forbidden(_))),
        "expected Forbidden, got {members:?}"
    );
}

#[tokio::test]
async fn should_list_owner_first() {
    let (_, spaces, owner_id, guest_id) = fixture().await;
    let space = seed_space(&spaces, owner_id, "AAAA1111");
    add_member(&spaces, space.id, guest_id);

    let members = ListMembersUseCase { spaces }
        .execute(guest_id, space.id)
        .await
        .unwrap();
    let roles: Vec<_> = members.iter().map(|m| (m.username.as_str(), m.role)).collect();
    assert_eq!(
        roles,
        vec![("owner", MemberRole::Owner), ("guest", MemberRole::Member)]
    );
}

// ── RefreshInvite ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_rotate_invite_code_for_owner_only() {
    let (_, spaces, owner_id, guest_id) = fixture().await;
    let space = seed_space(&spaces, owner_id, "AAAA1111");
    add_member(&spaces, space.id, guest_id);
    let uc = RefreshInviteUseCase {
        spaces: spaces.clone(),
        invite_base_url: INVITE_BASE.to_owned(),
    };

    let denied = uc.execute(guest_id, space.id).await;
    assert!(
        matches!(&denied, Err(ApiError::Forbidden(msg)) if msg == "只有空间创建者可以刷新邀请码"),
        "expected Forbidden, got {denied:?}"
    );

    let rotated = uc.execute(owner_id, space.id).await.unwrap();
    assert_ne!(rotated.invite_code, "AAAA1111");
    assert!(rotated.invite_link.ends_with(&rotated.invite_code));

    let old = JoinSpaceUseCase { spaces }.execute(Uuid::now_v7(), "AAAA1111").await;
    assert!(
        matches!(old, Err(ApiError::NotFound(_))),
        "old code must stop working, got {old:?}"
    );
}

// ── RemoveMember ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_remove_member_and_clear_their_default_space() {
    let (users, spaces, owner_id, guest_id) = fixture().await;
    let space = seed_space(&spaces, owner_id, "AAAA1111");
    add_member(&spaces, space.id, guest_id);
    users.users.lock().unwrap().iter_mut().for_each(|u| {
        if u.id == guest_id {
            u.default_space_id = Some(space.id);
        }
    });

    RemoveMemberUseCase {
        spaces: spaces.clone(),
        users: users.clone(),
    }
    .execute(RemoveMemberInput {
        caller_id: owner_id,
        space_id: space.id,
        member_id: guest_id,
    })
    .await
    .unwrap();

    assert_eq!(spaces.member_count(space.id), 1);
    assert!(!spaces.is_member(space.id, guest_id).await.unwrap());
    assert_eq!(users.get(guest_id).unwrap().default_space_id, None);
}

#[tokio::test]
async fn should_guard_member_removal() {
    let (users, spaces, owner_id, guest_id) = fixture().await;
    let space = seed_space(&spaces, owner_id, "AAAA1111");
    add_member(&spaces, space.id, guest_id);
    let uc = RemoveMemberUseCase {
        spaces,
        users,
    };
    let input = |caller_id, member_id| RemoveMemberInput {
        caller_id,
        space_id: space.id,
        member_id,
    };

    let by_member = uc.execute(input(guest_id, owner_id)).await;
    assert!(
        matches!(by_member, Err(ApiError::Forbidden(_))),
        "expected Forbidden, got {by_member:?}"
    );

    let self_removal = uc.execute(input(owner_id, owner_id)).await;
    assert!(
        matches!(&self_removal, Err(ApiError::Validation(msg)) if msg == "不能移除自己"),
        "expected Validation, got {self_removal:?}"
    );

    let stranger = uc.execute(input(owner_id, Uuid::now_v7())).await;
    assert!(
        matches!(stranger, Err(ApiError::NotFound(_))),
        "expected NotFound, got {stranger:?}"
    );
}

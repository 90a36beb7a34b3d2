use chrono::{NaiveDate, NaiveTime};
use linetime_api::domain::repository::SpaceRepository;
use linetime_api::domain::types::{Event, NewImage};
use linetime_api::error::ApiError;
use linetime_api::usecase::event::{
    CreateEventInput, CreateEventUseCase, DeleteEventImageUseCase, DeleteEventUseCase,
    GetEventUseCase, ListEventsInput, ListEventsUseCase, UpdateEventInput, UpdateEventUseCase,
};
use linetime_domain::pagination::OffsetPage;
use uuid::Uuid;

use crate::helpers::{MockEventRepo, MockSpaceRepo, MockUserRepo, add_member, seed_space, test_user};

struct Fixture {
    spaces: MockSpaceRepo,
    events: MockEventRepo,
    space_id: Uuid,
    owner_id: Uuid,
    member_id: Uuid,
    outsider_id: Uuid,
}

async fn fixture() -> Fixture {
    let owner = test_user("owner@qq.com", "owner").await;
    let member = test_user("member@qq.com", "member").await;
    let outsider = test_user("out@qq.com", "outsider").await;
    let (owner_id, member_id, outsider_id) = (owner.id, member.id, outsider.id);
    let spaces = MockSpaceRepo::new(MockUserRepo::new(vec![owner, member, outsider]));
    let space = seed_space(&spaces, owner_id, "AAAA1111");
    add_member(&spaces, space.id, member_id);
    Fixture {
        spaces,
        events: MockEventRepo::empty(),
        space_id: space.id,
        owner_id,
        member_id,
        outsider_id,
    }
}

fn image(url: &str) -> NewImage {
    NewImage {
        image_url: url.to_owned(),
        thumbnail_url: Some(format!("{url}.thumb")),
    }
}

impl Fixture {
    async fn create(&self, user_id: Uuid, date: &str, time: Option<&str>, title: &str) -> Event {
        CreateEventUseCase {
            spaces: self.spaces.clone(),
            events: self.events.clone(),
        }
        .execute(CreateEventInput {
            user_id,
            space_id: self.space_id,
            event_date: date.to_owned(),
            event_time: time.map(str::to_owned),
            title: title.to_owned(),
            content: None,
            images: vec![image("https://cdn.test/a.jpg"), image("https://cdn.test/b.jpg")],
        })
        .await
        .unwrap()
    }

    fn list_input(&self, user_id: Uuid, start: Option<&str>, end: Option<&str>) -> ListEventsInput {
        ListEventsInput {
            user_id,
            space_id: self.space_id,
            start_date: start.map(str::to_owned),
            end_date: end.map(str::to_owned),
            page: OffsetPage::default(),
        }
    }

    fn lister(&self) -> ListEventsUseCase<MockSpaceRepo, MockEventRepo> {
        ListEventsUseCase {
            spaces: self.spaces.clone(),
            events: self.events.clone(),
        }
    }
}

// ── CreateEvent / GetEvent ───────────────────────────────────────────────────

#[tokio::test]
async fn should_create_event_with_ordered_images() {
    let f = fixture().await;
    let event = f
        .create(f.member_id, "2024-05-20", Some("13:14"), "  Anniversary ")
        .await;

    assert_eq!(event.title, "Anniversary");
    assert_eq!(event.event_date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
    assert_eq!(event.event_time, NaiveTime::from_hms_opt(13, 14, 0));
    let orders: Vec<i32> = event.images.iter().map(|i| i.sort_order).collect();
    assert_eq!(orders, vec![0, 1]);
    assert!(event.images.iter().all(|i| i.event_id == event.id));

    let fetched = GetEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(f.owner_id, event.id)
    .await
    .unwrap();
    assert_eq!(fetched.id, event.id);
}

#[tokio::test]
async fn should_forbid_outsiders_from_events() {
    let f = fixture().await;
    let create = CreateEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(CreateEventInput {
        user_id: f.outsider_id,
        space_id: f.space_id,
        event_date: "2024-05-20".to_owned(),
        event_time: None,
        title: "Sneaky".to_owned(),
        content: None,
        images: vec![],
    })
    .await;
    assert!(
        matches!(&create, Err(ApiError::Forbidden(msg)) if msg == "您不在该空间中，无法创建事件"),
        "expected Forbidden, got {create:?}"
    );

    let event = f.create(f.owner_id, "2024-05-20", None, "Private").await;
    let get = GetEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(f.outsider_id, event.id)
    .await;
    assert!(
        matches!(get, Err(ApiError::Forbidden(_))),
        "expected Forbidden, got {get:?}"
    );
}

#[tokio::test]
async fn should_validate_event_fields() {
    let f = fixture().await;
    let uc = CreateEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    };
    let input = |date: &str, time: Option<&str>, title: &str, images: Vec<NewImage>| {
        CreateEventInput {
            user_id: f.owner_id,
            space_id: f.space_id,
            event_date: date.to_owned(),
            event_time: time.map(str::to_owned),
            title: title.to_owned(),
            content: None,
            images,
        }
    };

    for (case, result) in [
        ("bad date", uc.execute(input("2024/05/20", None, "t", vec![])).await),
        ("bad time", uc.execute(input("2024-05-20", Some("25:00"), "t", vec![])).await),
        ("blank title", uc.execute(input("2024-05-20", None, "   ", vec![])).await),
        (
            "blank image url",
            uc.execute(input("2024-05-20", None, "t", vec![image(" ")])).await,
        ),
    ] {
        assert!(
            matches!(result, Err(ApiError::Validation(_))),
            "{case}: expected Validation, got {result:?}"
        );
    }
}

// ── UpdateEvent ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_update_fields_and_replace_images() {
    let f = fixture().await;
    let event = f.create(f.member_id, "2024-05-20", Some("09:00"), "Before").await;
    let uc = UpdateEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    };

    let kept = uc
        .execute(
            f.member_id,
            event.id,
            UpdateEventInput {
                title: Some("After".to_owned()),
                event_time: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(kept.title, "After");
    assert_eq!(kept.event_time, None);
    assert_eq!(kept.images.len(), 2, "images untouched without a new list");

    let replaced = uc
        .execute(
            f.member_id,
            event.id,
            UpdateEventInput {
                images: Some(vec![NewImage {
                    image_url: "https://cdn.test/c.jpg".to_owned(),
                    thumbnail_url: Some(String::new()),
                }]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(replaced.images.len(), 1);
    assert_eq!(replaced.images[0].sort_order, 0);
    assert_eq!(replaced.images[0].thumbnail_url, None);

    let stored = f.events.events.lock().unwrap()[0].clone();
    assert_eq!(stored.title, "After");
    assert_eq!(stored.images.len(), 1);
}

#[tokio::test]
async fn should_allow_only_creator_to_update() {
    let f = fixture().await;
    let event = f.create(f.member_id, "2024-05-20", None, "Mine").await;

    let result = UpdateEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(
        f.owner_id,
        event.id,
        UpdateEventInput {
            title: Some("Hijack".to_owned()),
            ..Default::default()
        },
    )
    .await;
    assert!(
        matches!(&result, Err(ApiError::Forbidden(msg)) if msg == "只有创建者可以修改事件"),
        "expected Forbidden, got {result:?}"
    );
}

#[tokio::test]
async fn should_lock_removed_member_out_of_own_events() {
    let f = fixture().await;
    let event = f.create(f.member_id, "2024-05-20", None, "Before leaving").await;
    let image_id = event.images[0].id;
    assert!(f.spaces.remove_member(f.space_id, f.member_id).await.unwrap());

    let update = UpdateEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(
        f.member_id,
        event.id,
        UpdateEventInput {
            title: Some("After leaving".to_owned()),
            ..Default::default()
        },
    )
    .await;
    assert!(
        matches!(&update, Err(ApiError::Forbidden(msg)) if msg == "无权访问该事件"),
        "expected Forbidden, got {update:?}"
    );

    let delete_image = DeleteEventImageUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(f.member_id, image_id)
    .await;
    assert!(
        matches!(&delete_image, Err(ApiError::Forbidden(msg)) if msg == "无权访问该事件"),
        "expected Forbidden, got {delete_image:?}"
    );

    let stored = f.events.events.lock().unwrap()[0].clone();
    assert_eq!(stored.title, "Before leaving");
    assert_eq!(stored.images.len(), 2);
}

// ── DeleteEvent ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_let_space_owner_delete_member_event() {
    let f = fixture().await;
    let event = f.create(f.member_id, "2024-05-20", None, "Member's").await;
    let uc = DeleteEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    };

    uc.execute(f.owner_id, event.id).await.unwrap();

    let gone = GetEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(f.member_id, event.id)
    .await;
    assert!(
        matches!(gone, Err(ApiError::NotFound(_))),
        "expected NotFound after delete, got {gone:?}"
    );
}

#[tokio::test]
async fn should_forbid_member_deleting_owner_event() {
    let f = fixture().await;
    let event = f.create(f.owner_id, "2024-05-20", None, "Owner's").await;

    let result = DeleteEventUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    }
    .execute(f.member_id, event.id)
    .await;
    assert!(
        matches!(result, Err(ApiError::Forbidden(_))),
        "expected Forbidden, got {result:?}"
    );
    assert_eq!(f.events.events.lock().unwrap().len(), 1);
}

// ── ListEvents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_newest_first_with_untimed_last() {
    let f = fixture().await;
    f.create(f.owner_id, "2024-01-01", None, "old").await;
    f.create(f.owner_id, "2024-03-01", None, "untimed").await;
    f.create(f.owner_id, "2024-03-01", Some("08:00"), "morning").await;
    f.create(f.owner_id, "2024-03-01", Some("20:00"), "evening").await;

    let events = f
        .lister()
        .execute(f.list_input(f.member_id, None, None))
        .await
        .unwrap();
    let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["evening", "morning", "untimed", "old"]);
}

#[tokio::test]
async fn should_filter_by_inclusive_date_range() {
    let f = fixture().await;
    for date in ["2024-01-31", "2024-02-01", "2024-02-29", "2024-03-01"] {
        f.create(f.owner_id, date, None, date).await;
    }

    let events = f
        .lister()
        .execute(f.list_input(f.owner_id, Some("2024-02-01"), Some("2024-02-29")))
        .await
        .unwrap();
    let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["2024-02-29", "2024-02-01"]);
}

#[tokio::test]
async fn should_check_range_before_membership() {
    let f = fixture().await;

    let half = f
        .lister()
        .execute(f.list_input(f.outsider_id, Some("2024-02-01"), None))
        .await;
    assert!(
        matches!(&half, Err(ApiError::Validation(msg)) if msg == "开始日期和结束日期必须同时提供"),
        "expected Validation, got {half:?}"
    );

    let inverted = f
        .lister()
        .execute(f.list_input(f.owner_id, Some("2024-03-01"), Some("2024-02-01")))
        .await;
    assert!(
        matches!(inverted, Err(ApiError::Validation(_))),
        "expected Validation, got {inverted:?}"
    );

    let outsider = f
        .lister()
        .execute(f.list_input(f.outsider_id, None, None))
        .await;
    assert!(
        matches!(outsider, Err(ApiError::Forbidden(_))),
        "expected Forbidden, got {outsider:?}"
    );
}

#[tokio::test]
async fn should_page_through_events() {
    let f = fixture().await;
    for day in 1..=5 {
        let date = format!("2024-04-0{day}");
        f.create(f.owner_id, &date, None, &date).await;
    }

    let mut input = f.list_input(f.owner_id, None, None);
    input.page = OffsetPage {
        limit: 2,
        offset: 1,
    };
    let events = f.lister().execute(input).await.unwrap();
    let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["2024-04-04", "2024-04-03"]);
}

// ── DeleteEventImage ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_delete_image_for_creator_only() {
    let f = fixture().await;
    let event = f.create(f.member_id, "2024-05-20", None, "Photos").await;
    let image_id = event.images[0].id;
    let uc = DeleteEventImageUseCase {
        spaces: f.spaces.clone(),
        events: f.events.clone(),
    };

    let denied = uc.execute(f.owner_id, image_id).await;
    assert!(
        matches!(&denied, Err(ApiError::Forbidden(msg)) if msg == "只有创建者可以删除图片"),
        "expected Forbidden, got {denied:?}"
    );

    uc.execute(f.member_id, image_id).await.unwrap();
    let stored = f.events.events.lock().unwrap()[0].clone();
    assert_eq!(stored.images.len(), 1);
    assert_eq!(stored.images[0].id, event.images[1].id);

    let again = uc.execute(f.member_id, image_id).await;
    assert!(
        matches!(&again, Err(ApiError::NotFound(msg)) if msg == "图片不存在"),
        "expected NotFound, got {again:?}"
    );
}

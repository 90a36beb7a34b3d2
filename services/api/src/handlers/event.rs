use axum::extract::State;
use axum::response::IntoResponse;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linetime_auth_types::identity::CurrentUser;
use linetime_core::response::ApiResponse;
use linetime_core::serde::{to_hms_opt, to_rfc3339_ms, to_ymd};
use linetime_domain::pagination::OffsetPage;

use crate::domain::types::{Event, EventImage, NewImage};
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use crate::usecase::event::{
    CreateEventInput, CreateEventUseCase, DeleteEventImageUseCase, DeleteEventUseCase,
    GetEventUseCase, ListEventsInput, ListEventsUseCase, UpdateEventInput, UpdateEventUseCase,
};

#[derive(Serialize)]
pub struct EventImageResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub sort_order: i32,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub uploaded_at: DateTime<Utc>,
}

impl From<EventImage> for EventImageResponse {
    fn from(image: EventImage) -> Self {
        Self {
            id: image.id,
            event_id: image.event_id,
            image_url: image.image_url,
            thumbnail_url: image.thumbnail_url,
            sort_order: image.sort_order,
            uploaded_at: image.uploaded_at,
        }
    }
}

#[derive(Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub space_id: Uuid,
    pub user_id: Uuid,
    #[serde(serialize_with = "to_ymd")]
    pub event_date: NaiveDate,
    #[serde(serialize_with = "to_hms_opt")]
    pub event_time: Option<NaiveTime>,
    pub title: String,
    pub content: Option<String>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
    pub images: Vec<EventImageResponse>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            space_id: event.space_id,
            user_id: event.user_id,
            event_date: event.event_date,
            event_time: event.event_time,
            title: event.title,
            content: event.content,
            created_at: event.created_at,
            updated_at: event.updated_at,
            images: event.images.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct ImageInput {
    pub image_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl From<ImageInput> for NewImage {
    fn from(input: ImageInput) -> Self {
        Self {
            image_url: input.image_url,
            thumbnail_url: input.thumbnail_url,
        }
    }
}

// ── POST /api/events ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub space_id: Uuid,
    pub event_date: String,
    #[serde(default)]
    pub event_time: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
}

pub async fn create_event(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = CreateEventUseCase {
        spaces: state.space_repo(),
        events: state.event_repo(),
    };
    let event = usecase
        .execute(CreateEventInput {
            user_id: current.user_id,
            space_id: body.space_id,
            event_date: body.event_date,
            event_time: body.event_time,
            title: body.title,
            content: body.content,
            images: body.images.into_iter().map(Into::into).collect(),
        })
        .await?;
    Ok(ApiResponse::ok(EventResponse::from(event)))
}

// ── GET /api/events/{id} ──────────────────────────────────────────────────────

pub async fn get_event(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(event_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = GetEventUseCase {
        spaces: state.space_repo(),
        events: state.event_repo(),
    };
    let event = usecase.execute(current.user_id, event_id).await?;
    Ok(ApiResponse::ok(EventResponse::from(event)))
}

// ── PUT /api/events/{id} ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImageInput>>,
}

pub async fn update_event(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(event_id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = UpdateEventUseCase {
        spaces: state.space_repo(),
        events: state.event_repo(),
    };
    let input = UpdateEventInput {
        event_date: body.event_date,
        event_time: body.event_time,
        title: body.title,
        content: body.content,
        images: body
            .images
            .map(|images| images.into_iter().map(Into::into).collect()),
    };
    let event = usecase.execute(current.user_id, event_id, input).await?;
    Ok(ApiResponse::ok(EventResponse::from(event)))
}

// ── DELETE /api/events/{id} ───────────────────────────────────────────────────

pub async fn delete_event(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(event_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = DeleteEventUseCase {
        spaces: state.space_repo(),
        events: state.event_repo(),
    };
    usecase.execute(current.user_id, event_id).await?;
    Ok(ApiResponse::message("删除事件成功"))
}

// ── GET /api/events/spaces/{space_id} ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListEventsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn list_events(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(space_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ListEventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = ListEventsUseCase {
        spaces: state.space_repo(),
        events: state.event_repo(),
    };
    let defaults = OffsetPage::default();
    let events = usecase
        .execute(ListEventsInput {
            user_id: current.user_id,
            space_id,
            start_date: query.start_date,
            end_date: query.end_date,
            page: OffsetPage {
                limit: query.limit.unwrap_or(defaults.limit),
                offset: query.offset.unwrap_or(defaults.offset),
            },
        })
        .await?;
    let body: Vec<EventResponse> = events.into_iter().map(EventResponse::from).collect();
    Ok(ApiResponse::ok(body))
}

// ── DELETE /api/events/images/{image_id} ──────────────────────────────────────

pub async fn delete_event_image(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(image_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = DeleteEventImageUseCase {
        spaces: state.space_repo(),
        events: state.event_repo(),
    };
    usecase.execute(current.user_id, image_id).await?;
    Ok(ApiResponse::message("删除图片成功"))
}

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use linetime_domain::pagination::OffsetPage;

use crate::domain::repository::{EventRepository, SpaceRepository};
use crate::domain::types::{Event, EventImage, NewImage};
use crate::domain::validation::{ensure_event_title, parse_date, parse_time};
use crate::error::ApiError;

fn build_images(event_id: Uuid, images: Vec<NewImage>) -> Vec<EventImage> {
    let now = Utc::now();
    images
        .into_iter()
        .enumerate()
        .map(|(index, image)| EventImage {
            id: Uuid::now_v7(),
            event_id,
            image_url: image.image_url,
            thumbnail_url: image.thumbnail_url.filter(|u| !u.is_empty()),
            sort_order: index as i32,
            uploaded_at: now,
        })
        .collect()
}

fn ensure_image_urls(images: &[NewImage]) -> Result<(), ApiError> {
    if images.iter().any(|i| i.image_url.trim().is_empty()) {
        return Err(ApiError::validation("图片地址不能为空"));
    }
    Ok(())
}

async fn find_event<E: EventRepository>(events: &E, event_id: Uuid) -> Result<Event, ApiError> {
    events
        .find_by_id(event_id)
        .await?
        .ok_or_else(|| ApiError::not_found("事件不存在"))
}

// ── CreateEvent ──────────────────────────────────────────────────────────────

pub struct CreateEventInput {
    pub user_id: Uuid,
    pub space_id: Uuid,
    pub event_date: String,
    pub event_time: Option<String>,
    pub title: String,
    pub content: Option<String>,
    pub images: Vec<NewImage>,
}

pub struct CreateEventUseCase<S: SpaceRepository, E: EventRepository> {
    pub spaces: S,
    pub events: E,
}

impl<S: SpaceRepository, E: EventRepository> CreateEventUseCase<S, E> {
    pub async fn execute(&self, input: CreateEventInput) -> Result<Event, ApiError> {
        let event_date = parse_date(&input.event_date)?;
        let event_time = match input.event_time.as_deref() {
            Some(raw) => parse_time(raw)?,
            None => None,
        };
        ensure_event_title(&input.title)?;
        ensure_image_urls(&input.images)?;

        if !self.spaces.is_member(input.space_id, input.user_id).await? {
            return Err(ApiError::forbidden("您不在该空间中，无法创建事件"));
        }

        let now = Utc::now();
        let id = Uuid::now_v7();
        let event = Event {
            id,
            space_id: input.space_id,
            user_id: input.user_id,
            event_date,
            event_time,
            title: input.title.trim().to_owned(),
            content: input.content,
            created_at: now,
            updated_at: now,
            images: build_images(id, input.images),
        };
        self.events.create(&event).await?;
        Ok(event)
    }
}

// ── GetEvent ─────────────────────────────────────────────────────────────────

pub struct GetEventUseCase<S: SpaceRepository, E: EventRepository> {
    pub spaces: S,
    pub events: E,
}

impl<S: SpaceRepository, E: EventRepository> GetEventUseCase<S, E> {
    pub async fn execute(&self, user_id: Uuid, event_id: Uuid) -> Result<Event, ApiError> {
        let event = find_event(&self.events, event_id).await?;
        if !self.spaces.is_member(event.space_id, user_id).await? {
            return Err(ApiError::forbidden("无权访问该事件"));
        }
        Ok(event)
    }
}

// ── UpdateEvent ──────────────────────────────────────────────────────────────

/// Partial update; `None` leaves a field untouched.
#[derive(Default)]
pub struct UpdateEventInput {
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    /// Replaces the whole image list when present.
    pub images: Option<Vec<NewImage>>,
}

pub struct UpdateEventUseCase<S: SpaceRepository, E: EventRepository> {
    pub spaces: S,
    pub events: E,
}

impl<S: SpaceRepository, E: EventRepository> UpdateEventUseCase<S, E> {
    /// Creator only, and only while still a member of the event's space.
    pub async fn execute(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        input: UpdateEventInput,
    ) -> Result<Event, ApiError> {
        let mut event = find_event(&self.events, event_id).await?;
        if !self.spaces.is_member(event.space_id, user_id).await? {
            return Err(ApiError::forbidden("无权访问该事件"));
        }
        if event.user_id != user_id {
            return Err(ApiError::forbidden("只有创建者可以修改事件"));
        }

        if let Some(raw) = input.event_date.as_deref() {
            event.event_date = parse_date(raw)?;
        }
        if let Some(raw) = input.event_time.as_deref() {
            event.event_time = parse_time(raw)?;
        }
        if let Some(title) = input.title {
            ensure_event_title(&title)?;
            event.title = title.trim().to_owned();
        }
        if let Some(content) = input.content {
            event.content = Some(content);
        }
        let replace_images = input.images.is_some();
        if let Some(images) = input.images {
            ensure_image_urls(&images)?;
            event.images = build_images(event.id, images);
        }
        event.updated_at = Utc::now();

        self.events.update(&event, replace_images).await?;
        Ok(event)
    }
}

// ── DeleteEvent ──────────────────────────────────────────────────────────────

pub struct DeleteEventUseCase<S: SpaceRepository, E: EventRepository> {
    pub spaces: S,
    pub events: E,
}

impl<S: SpaceRepository, E: EventRepository> DeleteEventUseCase<S, E> {
    /// Allowed for the event's creator and the space owner.
    pub async fn execute(&self, user_id: Uuid, event_id: Uuid) -> Result<(), ApiError> {
        let event = find_event(&self.events, event_id).await?;
        if event.user_id != user_id {
            let owner_id = self
                .spaces
                .find_by_id(event.space_id)
                .await?
                .map(|s| s.owner_id);
            if owner_id != Some(user_id) {
                return Err(ApiError::forbidden("只有创建者或空间创建者可以删除事件"));
            }
        }
        self.events.soft_delete(event_id).await
    }
}

// ── ListEvents ───────────────────────────────────────────────────────────────

pub struct ListEventsInput {
    pub user_id: Uuid,
    pub space_id: Uuid,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: OffsetPage,
}

pub struct ListEventsUseCase<S: SpaceRepository, E: EventRepository> {
    pub spaces: S,
    pub events: E,
}

impl<S: SpaceRepository, E: EventRepository> ListEventsUseCase<S, E> {
    pub async fn execute(&self, input: ListEventsInput) -> Result<Vec<Event>, ApiError> {
        let range = date_range(input.start_date.as_deref(), input.end_date.as_deref())?;

        if !self.spaces.is_member(input.space_id, input.user_id).await? {
            return Err(ApiError::forbidden("无权访问该空间"));
        }

        match range {
            Some((start, end)) => {
                self.events
                    .list_by_date_range(input.space_id, start, end)
                    .await
            }
            None => {
                self.events
                    .list_by_space(input.space_id, input.page.clamped())
                    .await
            }
        }
    }
}

fn date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<(NaiveDate, NaiveDate)>, ApiError> {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let (start, end) = (parse_date(start)?, parse_date(end)?);
            if start > end {
                return Err(ApiError::validation("开始日期不能晚于结束日期"));
            }
            Ok(Some((start, end)))
        }
        _ => Err(ApiError::validation("开始日期和结束日期必须同时提供")),
    }
}

// ── DeleteEventImage ─────────────────────────────────────────────────────────

pub struct DeleteEventImageUseCase<S: SpaceRepository, E: EventRepository> {
    pub spaces: S,
    pub events: E,
}

impl<S: SpaceRepository, E: EventRepository> DeleteEventImageUseCase<S, E> {
    pub async fn execute(&self, user_id: Uuid, image_id: Uuid) -> Result<(), ApiError> {
        let image = self
            .events
            .find_image(image_id)
            .await?
            .ok_or_else(|| ApiError::not_found("图片不存在"))?;
        let event = find_event(&self.events, image.event_id).await?;
        if !self.spaces.is_member(event.space_id, user_id).await? {
            return Err(ApiError::forbidden("无权访问该事件"));
        }
        if event.user_id != user_id {
            return Err(ApiError::forbidden("只有创建者可以删除图片"));
        }
        self.events.soft_delete_image(image_id).await
    }
}

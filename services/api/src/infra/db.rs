use std::collections::HashMap;

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, NullOrdering, Order};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    SqlErr, TransactionError, TransactionTrait,
};
use uuid::Uuid;

use linetime_api_schema::{event_images, events, space_members, spaces, users};
use linetime_domain::pagination::OffsetPage;
use linetime_domain::space::{MemberRole, SpaceType};
use linetime_domain::user::AuthProvider;

use crate::domain::repository::{EventRepository, SpaceRepository, UserRepository};
use crate::domain::types::{Event, EventImage, MemberProfile, Space, SpaceMember, User};
use crate::error::ApiError;

/// Unique-constraint violations become `Conflict(message)`; anything else is internal.
fn unique_or_internal(err: DbErr, message: &str, context: &'static str) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ApiError::conflict(message),
        _ => ApiError::Internal(anyhow::Error::new(err).context(context)),
    }
}

fn flatten_txn(err: TransactionError<DbErr>) -> DbErr {
    match err {
        TransactionError::Connection(e) | TransactionError::Transaction(e) => e,
    }
}

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl DbUserRepository {
    async fn find_one(
        &self,
        filter: impl sea_orm::sea_query::IntoCondition,
        context: &'static str,
    ) -> Result<Option<User>, ApiError> {
        let model = users::Entity::find()
            .filter(filter)
            .filter(users::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .context(context)?;
        Ok(model.map(user_from_model))
    }
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        self.find_one(users::Column::Id.eq(id), "find user by id").await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        self.find_one(users::Column::Email.eq(email), "find user by email")
            .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        self.find_one(users::Column::Username.eq(username), "find user by username")
            .await
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, ApiError> {
        self.find_one(users::Column::GoogleId.eq(google_id), "find user by google id")
            .await
    }

    async fn create(&self, user: &User) -> Result<(), ApiError> {
        users::ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            username: Set(user.username.clone()),
            password_hash: Set(user.password_hash.clone()),
            avatar_url: Set(user.avatar_url.clone()),
            default_space_id: Set(user.default_space_id),
            google_id: Set(user.google_id.clone()),
            auth_provider: Set(user.auth_provider.as_str().to_owned()),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await
        .map_err(|e| unique_or_internal(e, "邮箱或用户名已被使用", "create user"))?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), ApiError> {
        users::ActiveModel {
            id: Set(id),
            password_hash: Set(Some(password_hash.to_owned())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update user password")?;
        Ok(())
    }

    async fn link_google(&self, id: Uuid, google_id: &str) -> Result<(), ApiError> {
        users::ActiveModel {
            id: Set(id),
            google_id: Set(Some(google_id.to_owned())),
            auth_provider: Set(AuthProvider::Google.as_str().to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| unique_or_internal(e, "该 Google 账户已绑定其他用户", "link google"))?;
        Ok(())
    }

    async fn set_default_space(
        &self,
        id: Uuid,
        space_id: Option<Uuid>,
    ) -> Result<(), ApiError> {
        users::ActiveModel {
            id: Set(id),
            default_space_id: Set(space_id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set default space")?;
        Ok(())
    }

    async fn clear_default_space_if(&self, id: Uuid, space_id: Uuid) -> Result<(), ApiError> {
        users::Entity::update_many()
            .col_expr(users::Column::DefaultSpaceId, Expr::value(Option::<Uuid>::None))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::DefaultSpaceId.eq(space_id))
            .exec(&self.db)
            .await
            .context("clear default space")?;
        Ok(())
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        username: model.username,
        password_hash: model.password_hash,
        avatar_url: model.avatar_url,
        default_space_id: model.default_space_id,
        google_id: model.google_id,
        auth_provider: AuthProvider::parse(&model.auth_provider),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Space repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSpaceRepository {
    pub db: DatabaseConnection,
}

impl SpaceRepository for DbSpaceRepository {
    async fn create_with_owner(
        &self,
        space: &Space,
        owner: &SpaceMember,
    ) -> Result<(), ApiError> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                let space = space.clone();
                let owner = owner.clone();
                Box::pin(async move {
                    insert_space(txn, &space).await?;
                    insert_member(txn, &owner).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| unique_or_internal(flatten_txn(e), "邀请码冲突", "create space"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Space>, ApiError> {
        let model = spaces::Entity::find_by_id(id)
            .filter(spaces::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .context("find space by id")?;
        Ok(model.map(space_from_model))
    }

    async fn find_by_invite_code(&self, code: &str) -> Result<Option<Space>, ApiError> {
        let model = spaces::Entity::find()
            .filter(spaces::Column::InviteCode.eq(code))
            .filter(spaces::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .context("find space by invite code")?;
        Ok(model.map(space_from_model))
    }

    async fn list_by_member(&self, user_id: Uuid) -> Result<Vec<Space>, ApiError> {
        let models = spaces::Entity::find()
            .join(
                sea_orm::JoinType::InnerJoin,
                spaces::Relation::SpaceMembers.def(),
            )
            .filter(space_members::Column::UserId.eq(user_id))
            .filter(spaces::Column::DeletedAt.is_null())
            .order_by_desc(spaces::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list spaces by member")?;
        Ok(models.into_iter().map(space_from_model).collect())
    }

    async fn update_invite(&self, id: Uuid, code: &str, link: &str) -> Result<(), ApiError> {
        spaces::ActiveModel {
            id: Set(id),
            invite_code: Set(code.to_owned()),
            invite_link: Set(link.to_owned()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| unique_or_internal(e, "邀请码冲突", "update invite code"))?;
        Ok(())
    }

    async fn is_member(&self, space_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        let count = space_members::Entity::find()
            .filter(space_members::Column::SpaceId.eq(space_id))
            .filter(space_members::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
            .context("check membership")?;
        Ok(count > 0)
    }

    async fn add_member(&self, member: &SpaceMember) -> Result<(), ApiError> {
        space_members::ActiveModel {
            id: Set(member.id),
            space_id: Set(member.space_id),
            user_id: Set(member.user_id),
            role: Set(member.role.as_str().to_owned()),
            joined_at: Set(member.joined_at),
        }
        .insert(&self.db)
        .await
        .map_err(|e| unique_or_internal(e, "您已经在该空间中", "add member"))?;
        Ok(())
    }

    async fn remove_member(&self, space_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        let result = space_members::Entity::delete_many()
            .filter(space_members::Column::SpaceId.eq(space_id))
            .filter(space_members::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("remove member")?;
        Ok(result.rows_affected > 0)
    }

    async fn list_members(&self, space_id: Uuid) -> Result<Vec<MemberProfile>, ApiError> {
        let rows = space_members::Entity::find()
            .filter(space_members::Column::SpaceId.eq(space_id))
            .find_also_related(users::Entity)
            .all(&self.db)
            .await
            .context("list members")?;

        let mut members: Vec<MemberProfile> = rows
            .into_iter()
            .filter_map(|(member, user)| {
                let user = user.filter(|u| u.deleted_at.is_none())?;
                Some(MemberProfile {
                    user_id: user.id,
                    username: user.username,
                    email: user.email,
                    avatar_url: user.avatar_url,
                    role: MemberRole::parse(&member.role),
                    joined_at: member.joined_at,
                })
            })
            .collect();
        members.sort_by_key(|m| (m.role != MemberRole::Owner, m.joined_at));
        Ok(members)
    }
}

async fn insert_space(txn: &DatabaseTransaction, space: &Space) -> Result<(), DbErr> {
    spaces::ActiveModel {
        id: Set(space.id),
        name: Set(space.name.clone()),
        description: Set(space.description.clone()),
        invite_code: Set(space.invite_code.clone()),
        invite_link: Set(space.invite_link.clone()),
        owner_id: Set(space.owner_id),
        space_type: Set(space.space_type.as_str().to_owned()),
        created_at: Set(space.created_at),
        deleted_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_member(txn: &DatabaseTransaction, member: &SpaceMember) -> Result<(), DbErr> {
    space_members::ActiveModel {
        id: Set(member.id),
        space_id: Set(member.space_id),
        user_id: Set(member.user_id),
        role: Set(member.role.as_str().to_owned()),
        joined_at: Set(member.joined_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn space_from_model(model: spaces::Model) -> Space {
    Space {
        id: model.id,
        name: model.name,
        description: model.description,
        invite_code: model.invite_code,
        invite_link: model.invite_link,
        owner_id: model.owner_id,
        space_type: SpaceType::parse(&model.space_type).unwrap_or_default(),
        created_at: model.created_at,
    }
}

// ── Event repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEventRepository {
    pub db: DatabaseConnection,
}

impl DbEventRepository {
    /// Attach live images, `sort_order` ascending, to each event.
    async fn with_images(&self, models: Vec<events::Model>) -> Result<Vec<Event>, ApiError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let images = event_images::Entity::find()
            .filter(event_images::Column::EventId.is_in(ids))
            .filter(event_images::Column::DeletedAt.is_null())
            .order_by_asc(event_images::Column::SortOrder)
            .all(&self.db)
            .await
            .context("load event images")?;

        let mut by_event: HashMap<Uuid, Vec<EventImage>> = HashMap::new();
        for image in images {
            by_event
                .entry(image.event_id)
                .or_default()
                .push(image_from_model(image));
        }
        Ok(models
            .into_iter()
            .map(|m| {
                let images = by_event.remove(&m.id).unwrap_or_default();
                event_from_model(m, images)
            })
            .collect())
    }

    fn newest_first(space_id: Uuid) -> sea_orm::Select<events::Entity> {
        events::Entity::find()
            .filter(events::Column::SpaceId.eq(space_id))
            .filter(events::Column::DeletedAt.is_null())
            .order_by_desc(events::Column::EventDate)
            .order_by_with_nulls(events::Column::EventTime, Order::Desc, NullOrdering::Last)
            .order_by_desc(events::Column::CreatedAt)
    }
}

impl EventRepository for DbEventRepository {
    async fn create(&self, event: &Event) -> Result<(), ApiError> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                let event = event.clone();
                Box::pin(async move {
                    events::ActiveModel {
                        id: Set(event.id),
                        space_id: Set(event.space_id),
                        user_id: Set(event.user_id),
                        event_date: Set(event.event_date),
                        event_time: Set(event.event_time),
                        title: Set(event.title.clone()),
                        content: Set(event.content.clone()),
                        created_at: Set(event.created_at),
                        updated_at: Set(event.updated_at),
                        deleted_at: Set(None),
                    }
                    .insert(txn)
                    .await?;
                    insert_images(txn, &event.images).await
                })
            })
            .await
            .map_err(flatten_txn)
            .context("create event")?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, ApiError> {
        let model = events::Entity::find_by_id(id)
            .filter(events::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .context("find event by id")?;
        let Some(model) = model else {
            return Ok(None);
        };
        Ok(self.with_images(vec![model]).await?.pop())
    }

    async fn list_by_space(
        &self,
        space_id: Uuid,
        page: OffsetPage,
    ) -> Result<Vec<Event>, ApiError> {
        let models = Self::newest_first(space_id)
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.db)
            .await
            .context("list events by space")?;
        self.with_images(models).await
    }

    async fn list_by_date_range(
        &self,
        space_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>, ApiError> {
        let models = Self::newest_first(space_id)
            .filter(events::Column::EventDate.between(start, end))
            .all(&self.db)
            .await
            .context("list events by date range")?;
        self.with_images(models).await
    }

    async fn update(&self, event: &Event, replace_images: bool) -> Result<(), ApiError> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                let event = event.clone();
                Box::pin(async move {
                    events::ActiveModel {
                        id: Set(event.id),
                        event_date: Set(event.event_date),
                        event_time: Set(event.event_time),
                        title: Set(event.title.clone()),
                        content: Set(event.content.clone()),
                        updated_at: Set(event.updated_at),
                        ..Default::default()
                    }
                    .update(txn)
                    .await?;

                    if replace_images {
                        event_images::Entity::update_many()
                            .col_expr(event_images::Column::DeletedAt, Expr::value(Utc::now()))
                            .filter(event_images::Column::EventId.eq(event.id))
                            .filter(event_images::Column::DeletedAt.is_null())
                            .exec(txn)
                            .await?;
                        insert_images(txn, &event.images).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn)
            .context("update event")?;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), ApiError> {
        events::Entity::update_many()
            .col_expr(events::Column::DeletedAt, Expr::value(Utc::now()))
            .filter(events::Column::Id.eq(id))
            .filter(events::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .context("soft delete event")?;
        Ok(())
    }

    async fn find_image(&self, image_id: Uuid) -> Result<Option<EventImage>, ApiError> {
        let model = event_images::Entity::find_by_id(image_id)
            .filter(event_images::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .context("find event image")?;
        Ok(model.map(image_from_model))
    }

    async fn soft_delete_image(&self, image_id: Uuid) -> Result<(), ApiError> {
        event_images::Entity::update_many()
            .col_expr(event_images::Column::DeletedAt, Expr::value(Utc::now()))
            .filter(event_images::Column::Id.eq(image_id))
            .filter(event_images::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .context("soft delete event image")?;
        Ok(())
    }
}

async fn insert_images(txn: &DatabaseTransaction, images: &[EventImage]) -> Result<(), DbErr> {
    if images.is_empty() {
        return Ok(());
    }
    let models = images.iter().map(|image| event_images::ActiveModel {
        id: Set(image.id),
        event_id: Set(image.event_id),
        image_url: Set(image.image_url.clone()),
        thumbnail_url: Set(image.thumbnail_url.clone()),
        sort_order: Set(image.sort_order),
        uploaded_at: Set(image.uploaded_at),
        deleted_at: Set(None),
    });
    event_images::Entity::insert_many(models).exec(txn).await?;
    Ok(())
}

fn event_from_model(model: events::Model, images: Vec<EventImage>) -> Event {
    Event {
        id: model.id,
        space_id: model.space_id,
        user_id: model.user_id,
        event_date: model.event_date,
        event_time: model.event_time,
        title: model.title,
        content: model.content,
        created_at: model.created_at,
        updated_at: model.updated_at,
        images,
    }
}

fn image_from_model(model: event_images::Model) -> EventImage {
    EventImage {
        id: model.id,
        event_id: model.event_id,
        image_url: model.image_url,
        thumbnail_url: model.thumbnail_url,
        sort_order: model.sort_order,
        uploaded_at: model.uploaded_at,
    }
}

use sea_orm::entity::prelude::*;

/// Account record. `password_hash` is empty for Google-only accounts.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: String,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub default_space_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub google_id: Option<String>,
    /// `"local"` or `"google"`.
    pub auth_provider: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::space_members::Entity")]
    SpaceMembers,
}

impl Related<super::space_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpaceMembers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

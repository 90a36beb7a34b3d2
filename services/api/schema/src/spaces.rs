use sea_orm::entity::prelude::*;

/// Shared container for events. Invite codes are unique across live and deleted spaces.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "spaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(unique)]
    pub invite_code: String,
    pub invite_link: String,
    pub owner_id: Uuid,
    #[sea_orm(column_name = "type")]
    pub space_type: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::space_members::Entity")]
    SpaceMembers,
    #[sea_orm(has_many = "super::events::Entity")]
    Events,
}

impl Related<super::space_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpaceMembers.def()
    }
}

impl Related<super::events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm_migration::prelude::*;

mod m20260101_000001_create_users;
mod m20260101_000002_create_spaces;
mod m20260101_000003_create_space_members;
mod m20260101_000004_create_events;
mod m20260101_000005_create_event_images;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_users::Migration),
            Box::new(m20260101_000002_create_spaces::Migration),
            Box::new(m20260101_000003_create_space_members::Migration),
            Box::new(m20260101_000004_create_events::Migration),
            Box::new(m20260101_000005_create_event_images::Migration),
        ]
    }
}

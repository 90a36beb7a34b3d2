use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventImages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventImages::EventId).uuid().not_null())
                    .col(
                        ColumnDef::new(EventImages::ImageUrl)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EventImages::ThumbnailUrl).string_len(500))
                    .col(
                        ColumnDef::new(EventImages::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventImages::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EventImages::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(EventImages::Table, EventImages::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(EventImages::Table)
                    .col(EventImages::EventId)
                    .name("idx_event_images_event_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventImages::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EventImages {
    Table,
    Id,
    EventId,
    ImageUrl,
    ThumbnailUrl,
    SortOrder,
    UploadedAt,
    DeletedAt,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Spaces::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Spaces::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Spaces::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Spaces::Description).text())
                    .col(
                        ColumnDef::new(Spaces::InviteCode)
                            .string_len(8)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Spaces::InviteLink).string_len(255).not_null())
                    .col(ColumnDef::new(Spaces::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Spaces::Type)
                            .string_len(20)
                            .not_null()
                            .default("personal"),
                    )
                    .col(
                        ColumnDef::new(Spaces::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Spaces::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Spaces::Table, Spaces::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Spaces::Table)
                    .col(Spaces::OwnerId)
                    .name("idx_spaces_owner_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Spaces::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Spaces {
    Table,
    Id,
    Name,
    Description,
    InviteCode,
    InviteLink,
    OwnerId,
    Type,
    CreatedAt,
    DeletedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

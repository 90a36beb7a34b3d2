use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SpaceMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SpaceMembers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SpaceMembers::SpaceId).uuid().not_null())
                    .col(ColumnDef::new(SpaceMembers::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(SpaceMembers::Role)
                            .string_len(20)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(SpaceMembers::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SpaceMembers::Table, SpaceMembers::SpaceId)
                            .to(Spaces::Table, Spaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SpaceMembers::Table, SpaceMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SpaceMembers::Table)
                    .col(SpaceMembers::SpaceId)
                    .col(SpaceMembers::UserId)
                    .unique()
                    .name("uq_space_members_space_user")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SpaceMembers::Table)
                    .col(SpaceMembers::UserId)
                    .name("idx_space_members_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SpaceMembers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SpaceMembers {
    Table,
    Id,
    SpaceId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum Spaces {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

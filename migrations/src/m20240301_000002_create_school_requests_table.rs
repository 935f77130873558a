use sea_orm_migration::prelude::*;

use super::m20240301_000001_create_reference_tables::{Programs, Schools};

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240301_000002_create_school_requests_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SchoolRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SchoolRequests::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchoolRequests::RequestNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SchoolRequests::SchoolId).uuid().not_null())
                    .col(ColumnDef::new(SchoolRequests::ProgramId).uuid().null())
                    .col(ColumnDef::new(SchoolRequests::DesiredDate).date().null())
                    .col(ColumnDef::new(SchoolRequests::AlternateDate).date().null())
                    .col(ColumnDef::new(SchoolRequests::StudentCount).integer().null())
                    .col(
                        ColumnDef::new(SchoolRequests::Budget)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(ColumnDef::new(SchoolRequests::Notes).text().null())
                    .col(
                        ColumnDef::new(SchoolRequests::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchoolRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchoolRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_school_requests_school")
                            .from(SchoolRequests::Table, SchoolRequests::SchoolId)
                            .to(Schools::Table, Schools::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_school_requests_program")
                            .from(SchoolRequests::Table, SchoolRequests::ProgramId)
                            .to(Programs::Table, Programs::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_school_requests_status")
                    .table(SchoolRequests::Table)
                    .col(SchoolRequests::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SchoolRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SchoolRequests {
    Table,
    Id,
    RequestNumber,
    SchoolId,
    ProgramId,
    DesiredDate,
    AlternateDate,
    StudentCount,
    Budget,
    Notes,
    Status,
    CreatedAt,
    UpdatedAt,
}

use sea_orm_migration::prelude::*;

use super::m20240301_000002_create_school_requests_table::SchoolRequests;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240301_000003_create_quotes_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Quotes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Quotes::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Quotes::QuoteNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Quotes::RequestId).uuid().not_null())
                    .col(money(Quotes::SessionFee))
                    .col(money(Quotes::TransportFee))
                    .col(money(Quotes::MaterialCost))
                    .col(money(Quotes::AssistantFee))
                    .col(money(Quotes::Overhead))
                    .col(money(Quotes::Subtotal))
                    .col(
                        ColumnDef::new(Quotes::MarginRate)
                            .decimal_len(9, 6)
                            .not_null(),
                    )
                    .col(money(Quotes::MarginAmount))
                    .col(money(Quotes::Vat))
                    .col(money(Quotes::Discount))
                    .col(money(Quotes::Total))
                    .col(money(Quotes::FinalTotal))
                    .col(ColumnDef::new(Quotes::ValidUntil).date().not_null())
                    .col(ColumnDef::new(Quotes::Notes).text().null())
                    .col(ColumnDef::new(Quotes::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Quotes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotes_request")
                            .from(Quotes::Table, Quotes::RequestId)
                            .to(SchoolRequests::Table, SchoolRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_quotes_request_id")
                    .table(Quotes::Table)
                    .col(Quotes::RequestId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Quotes::Table).to_owned())
            .await
    }
}

fn money(column: Quotes) -> ColumnDef {
    ColumnDef::new(column)
        .decimal_len(16, 4)
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
pub enum Quotes {
    Table,
    Id,
    QuoteNumber,
    RequestId,
    SessionFee,
    TransportFee,
    MaterialCost,
    AssistantFee,
    Overhead,
    Subtotal,
    MarginRate,
    MarginAmount,
    Vat,
    Discount,
    Total,
    FinalTotal,
    ValidUntil,
    Notes,
    CreatedBy,
    CreatedAt,
}

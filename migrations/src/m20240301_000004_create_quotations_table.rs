use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240301_000004_create_quotations_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Quotations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Quotations::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quotations::QuotationNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Quotations::Recipient).string().not_null())
                    .col(ColumnDef::new(Quotations::ContactName).string().null())
                    .col(ColumnDef::new(Quotations::Email).string().null())
                    .col(ColumnDef::new(Quotations::Phone).string().null())
                    .col(ColumnDef::new(Quotations::Title).string().not_null())
                    .col(ColumnDef::new(Quotations::Items).json().not_null())
                    .col(
                        ColumnDef::new(Quotations::SupplyAmount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quotations::Vat)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quotations::TotalAmount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Quotations::Notes).text().null())
                    .col(ColumnDef::new(Quotations::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Quotations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Quotations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Quotations {
    Table,
    Id,
    QuotationNumber,
    Recipient,
    ContactName,
    Email,
    Phone,
    Title,
    Items,
    SupplyAmount,
    Vat,
    TotalAmount,
    Notes,
    CreatedBy,
    CreatedAt,
}

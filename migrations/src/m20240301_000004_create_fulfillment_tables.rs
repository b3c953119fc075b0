use sea_orm_migration::prelude::*;

use super::m20240301_000002_create_catalog_tables::Products;
use super::m20240301_000003_create_orders_tables::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deliveries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Deliveries::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deliveries::OrderId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Deliveries::SaleId).uuid().null())
                    .col(ColumnDef::new(Deliveries::Status).string().not_null())
                    .col(ColumnDef::new(Deliveries::Address).text().not_null())
                    .col(ColumnDef::new(Deliveries::DeliveryDate).timestamp().null())
                    .col(ColumnDef::new(Deliveries::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Deliveries::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deliveries_order")
                            .from(Deliveries::Table, Deliveries::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Sales::OrderId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Sales::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Sales::VendorId).uuid().not_null())
                    .col(ColumnDef::new(Sales::TotalAmount).decimal().not_null())
                    .col(ColumnDef::new(Sales::Status).string().not_null())
                    .col(ColumnDef::new(Sales::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_order")
                            .from(Sales::Table, Sales::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleLines::SaleId).uuid().not_null())
                    .col(ColumnDef::new(SaleLines::ProductId).uuid().not_null())
                    .col(ColumnDef::new(SaleLines::QuantitySold).integer().not_null())
                    .col(ColumnDef::new(SaleLines::UnitPrice).decimal().not_null())
                    .col(ColumnDef::new(SaleLines::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_lines_sale")
                            .from(SaleLines::Table, SaleLines::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_lines_product")
                            .from(SaleLines::Table, SaleLines::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Invoices::SaleId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Invoices::OrderId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::Subtotal).decimal().not_null())
                    .col(ColumnDef::new(Invoices::TotalAmount).decimal().not_null())
                    .col(ColumnDef::new(Invoices::PaymentStatus).string().not_null())
                    .col(ColumnDef::new(Invoices::IssuedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_sale")
                            .from(Invoices::Table, Invoices::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Payments::InvoiceId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payments::OrderId).uuid().not_null())
                    .col(ColumnDef::new(Payments::AmountPaid).decimal().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::PaidAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_invoice")
                            .from(Payments::Table, Payments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deliveries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Deliveries {
    Table,
    Id,
    OrderId,
    SaleId,
    Status,
    Address,
    DeliveryDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Sales {
    Table,
    Id,
    OrderId,
    ClientId,
    VendorId,
    TotalAmount,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum SaleLines {
    Table,
    Id,
    SaleId,
    ProductId,
    QuantitySold,
    UnitPrice,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Invoices {
    Table,
    Id,
    SaleId,
    OrderId,
    Subtotal,
    TotalAmount,
    PaymentStatus,
    IssuedAt,
}

#[derive(DeriveIden)]
pub enum Payments {
    Table,
    Id,
    InvoiceId,
    OrderId,
    AmountPaid,
    Method,
    PaidAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Orders::UserId).string().not_null())
                    .col(ColumnDef::new(Orders::Email).string().not_null())
                    // Resolved line items, snapshotted at materialization time.
                    .col(ColumnDef::new(Orders::Items).json().not_null())
                    .col(ColumnDef::new(Orders::Amount).decimal().not_null())
                    .col(ColumnDef::new(Orders::AddressId).uuid().not_null())
                    // Address fields copied into the order so later edits to the
                    // address row do not rewrite order history.
                    .col(ColumnDef::new(Orders::ShippingAddress).json().not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string()
                            .not_null()
                            .default("placed"),
                    )
                    .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::PaymentSessionId).string().null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        // Exactly-once reconciliation per hosted payment session: redelivered
        // completion events hit this constraint instead of inserting twice.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_orders_payment_session_id")
                    .table(Orders::Table)
                    .col(Orders::PaymentSessionId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    Email,
    Items,
    Amount,
    AddressId,
    ShippingAddress,
    Status,
    PaymentMethod,
    PaymentStatus,
    PaymentSessionId,
    CreatedAt,
}

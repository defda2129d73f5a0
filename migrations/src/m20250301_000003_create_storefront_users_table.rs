use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StorefrontUsers::Table)
                    .if_not_exists()
                    // Keyed by the identity provider's principal id; the row
                    // only exists to hold the saved cart snapshot.
                    .col(
                        ColumnDef::new(StorefrontUsers::Id)
                            .string()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StorefrontUsers::CartItems).json().not_null())
                    .col(
                        ColumnDef::new(StorefrontUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StorefrontUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum StorefrontUsers {
    Table,
    Id,
    CartItems,
    UpdatedAt,
}

use super::Rates;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rates::EntityId).string().not_null())
                    .col(ColumnDef::new(Rates::AuthorId).string().not_null())
                    .col(ColumnDef::new(Rates::Overall).double().not_null())
                    .col(ColumnDef::new(Rates::CategoryValues).json().not_null())
                    .col(ColumnDef::new(Rates::Review).text().null())
                    .col(
                        ColumnDef::new(Rates::Anonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Rates::SubmittedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rates::UsefulCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rates::ReplyCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Rates::History).json().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_rates")
                            .col(Rates::EntityId)
                            .col(Rates::AuthorId),
                    )
                    .to_owned(),
            )
            .await?;

        // Author lookups across entities
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rates_author_id")
                    .table(Rates::Table)
                    .col(Rates::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rates::Table).to_owned())
            .await
    }
}

use super::RateCategoryAggregates;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RateCategoryAggregates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RateCategoryAggregates::EntityId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateCategoryAggregates::CategoryIndex)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateCategoryAggregates::Histogram)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateCategoryAggregates::RatedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RateCategoryAggregates::Mean)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(RateCategoryAggregates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_rate_category_aggregates")
                            .col(RateCategoryAggregates::EntityId)
                            .col(RateCategoryAggregates::CategoryIndex),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RateCategoryAggregates::Table).to_owned())
            .await
    }
}

use super::RateCombinedAggregates;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RateCombinedAggregates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RateCombinedAggregates::EntityId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RateCombinedAggregates::RatedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RateCombinedAggregates::OverallMean)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(RateCombinedAggregates::CategoryMeans)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateCombinedAggregates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RateCombinedAggregates::Table).to_owned())
            .await
    }
}

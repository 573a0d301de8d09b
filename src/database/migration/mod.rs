use sea_orm_migration::prelude::*;

pub use sea_orm_migration::MigratorTrait;

mod m20250901_000001_create_rates_table;
mod m20250901_000002_create_rate_category_aggregates_table;
mod m20250901_000003_create_rate_combined_aggregates_table;
mod m20250915_000001_create_rate_comments_table;
mod m20250915_000002_create_rate_reactions_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_rates_table::Migration),
            Box::new(m20250901_000002_create_rate_category_aggregates_table::Migration),
            Box::new(m20250901_000003_create_rate_combined_aggregates_table::Migration),
            Box::new(m20250915_000001_create_rate_comments_table::Migration),
            Box::new(m20250915_000002_create_rate_reactions_table::Migration),
        ]
    }
}

/// Common table and column identifiers
#[derive(Iden)]
pub enum Rates {
    Table,
    EntityId,
    AuthorId,
    Overall,
    CategoryValues,
    Review,
    Anonymous,
    SubmittedAt,
    UsefulCount,
    ReplyCount,
    History,
}

#[derive(Iden)]
pub enum RateCategoryAggregates {
    Table,
    EntityId,
    CategoryIndex,
    Histogram,
    RatedCount,
    Mean,
    UpdatedAt,
}

#[derive(Iden)]
pub enum RateCombinedAggregates {
    Table,
    EntityId,
    RatedCount,
    OverallMean,
    CategoryMeans,
    UpdatedAt,
}

#[derive(Iden)]
pub enum RateComments {
    Table,
    CommentId,
    EntityId,
    AuthorId,
    UserId,
    Comment,
    CreatedAt,
    UpdatedAt,
    History,
}

#[derive(Iden)]
pub enum RateReactions {
    Table,
    EntityId,
    AuthorId,
    UserId,
    CreatedAt,
}

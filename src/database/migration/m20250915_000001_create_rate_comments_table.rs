use super::{RateComments, Rates};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RateComments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RateComments::CommentId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RateComments::EntityId).string().not_null())
                    .col(ColumnDef::new(RateComments::AuthorId).string().not_null())
                    .col(ColumnDef::new(RateComments::UserId).string().not_null())
                    .col(ColumnDef::new(RateComments::Comment).text().not_null())
                    .col(
                        ColumnDef::new(RateComments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateComments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(RateComments::History).json().not_null())
                    .to_owned(),
            )
            .await?;

        // Create foreign key constraint only for PostgreSQL (SQLite doesn't support adding FK after table creation)
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_rate_comments_rate")
                        .from(
                            RateComments::Table,
                            (RateComments::EntityId, RateComments::AuthorId),
                        )
                        .to(Rates::Table, (Rates::EntityId, Rates::AuthorId))
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rate_comments_rate")
                    .table(RateComments::Table)
                    .col(RateComments::EntityId)
                    .col(RateComments::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RateComments::Table).to_owned())
            .await
    }
}

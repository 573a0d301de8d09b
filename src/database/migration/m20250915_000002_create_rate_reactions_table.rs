use super::{RateReactions, Rates};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RateReactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RateReactions::EntityId).string().not_null())
                    .col(ColumnDef::new(RateReactions::AuthorId).string().not_null())
                    .col(ColumnDef::new(RateReactions::UserId).string().not_null())
                    .col(
                        ColumnDef::new(RateReactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_rate_reactions")
                            .col(RateReactions::EntityId)
                            .col(RateReactions::AuthorId)
                            .col(RateReactions::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_rate_reactions_rate")
                        .from(
                            RateReactions::Table,
                            (RateReactions::EntityId, RateReactions::AuthorId),
                        )
                        .to(Rates::Table, (Rates::EntityId, Rates::AuthorId))
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RateReactions::Table).to_owned())
            .await
    }
}

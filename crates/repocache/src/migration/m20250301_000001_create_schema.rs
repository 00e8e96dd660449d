//! Initial migration to create the repocache database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_repositories(manager).await?;
        self.create_elsewhere(manager).await?;
        self.create_events(manager).await?;
        self.create_refetch_locks(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RefetchLocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Elsewhere::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::Participant).big_integer().null())
                    // Remote identity
                    .col(ColumnDef::new(Repositories::Platform).string().not_null())
                    .col(ColumnDef::new(Repositories::Slug).string().not_null())
                    .col(ColumnDef::new(Repositories::RemoteId).string().not_null())
                    .col(ColumnDef::new(Repositories::OwnerId).string().not_null())
                    // Content
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(ColumnDef::new(Repositories::Description).text().null())
                    .col(ColumnDef::new(Repositories::IsFork).boolean().null())
                    .col(ColumnDef::new(Repositories::StarsCount).integer().null())
                    // Timestamps
                    .col(
                        ColumnDef::new(Repositories::LastUpdate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::InfoFetchedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Platform-specific JSON text
                    .col(
                        ColumnDef::new(Repositories::ExtraInfo)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .to_owned(),
            )
            .await?;

        // Identity: one row per remote repository
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_platform_remote_id")
                    .table(Repositories::Table)
                    .col(Repositories::Platform)
                    .col(Repositories::RemoteId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Slugs are unique per platform too
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_platform_slug")
                    .table(Repositories::Table)
                    .col(Repositories::Platform)
                    .col(Repositories::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Candidate selection and stale cleanup
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_participant_platform_fetched")
                    .table(Repositories::Table)
                    .col(Repositories::Participant)
                    .col(Repositories::Platform)
                    .col(Repositories::InfoFetchedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_elsewhere(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Elsewhere::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Elsewhere::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Elsewhere::Participant).big_integer().not_null())
                    .col(ColumnDef::new(Elsewhere::Platform).string().not_null())
                    .col(
                        ColumnDef::new(Elsewhere::Domain)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Elsewhere::UserId).string().not_null())
                    .col(ColumnDef::new(Elsewhere::UserName).string().null())
                    .col(ColumnDef::new(Elsewhere::DisplayName).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_elsewhere_platform_domain_user_id")
                    .table(Elsewhere::Table)
                    .col(Elsewhere::Platform)
                    .col(Elsewhere::Domain)
                    .col(Elsewhere::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_elsewhere_participant_platform_domain")
                    .table(Elsewhere::Table)
                    .col(Elsewhere::Participant)
                    .col(Elsewhere::Platform)
                    .col(Elsewhere::Domain)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_events(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Events::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Events::Participant).big_integer().not_null())
                    .col(ColumnDef::new(Events::EventType).string().not_null())
                    .col(
                        ColumnDef::new(Events::Payload)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(
                        ColumnDef::new(Events::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_participant_recorded")
                    .table(Events::Table)
                    .col(Events::Participant)
                    .col(Events::RecordedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_refetch_locks(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RefetchLocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefetchLocks::LockKey)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RefetchLocks::Participant)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RefetchLocks::Platform).string().not_null())
                    .col(
                        ColumnDef::new(RefetchLocks::AcquiredAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    Participant,
    Platform,
    Slug,
    RemoteId,
    OwnerId,
    Name,
    Description,
    IsFork,
    StarsCount,
    LastUpdate,
    InfoFetchedAt,
    ExtraInfo,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "elsewhere")]
enum Elsewhere {
    Table,
    Id,
    Participant,
    Platform,
    Domain,
    UserId,
    UserName,
    DisplayName,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Participant,
    EventType,
    Payload,
    RecordedAt,
}

#[derive(DeriveIden)]
enum RefetchLocks {
    Table,
    LockKey,
    Participant,
    Platform,
    AcquiredAt,
}

use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // The UNIQUE constraint on phone_numbers.number is what makes
        // duplicate insertion fail atomically; handlers never pre-check.
        manager
            .create_table(
                schema
                    .create_table_from_entity(PhoneNumbers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AdminUsers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminUsers).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PhoneNumbers).to_owned())
            .await?;

        Ok(())
    }
}

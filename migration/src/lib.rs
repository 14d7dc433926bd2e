pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_api_formats_table;
mod m20250301_000002_create_api_format_endpoints_table;
mod m20250301_000003_create_api_providers_table;
mod m20250301_000004_create_ai_models_table;
mod m20250301_000005_create_ai_assistants_table;
mod m20250301_000006_create_usage_records_table;
mod m20250301_000007_create_usage_users_daily_table;
mod m20250301_000008_create_mail_templates_table;
mod m20250301_000009_create_announcements_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_api_formats_table::Migration),
            Box::new(m20250301_000002_create_api_format_endpoints_table::Migration),
            Box::new(m20250301_000003_create_api_providers_table::Migration),
            Box::new(m20250301_000004_create_ai_models_table::Migration),
            Box::new(m20250301_000005_create_ai_assistants_table::Migration),
            Box::new(m20250301_000006_create_usage_records_table::Migration),
            Box::new(m20250301_000007_create_usage_users_daily_table::Migration),
            Box::new(m20250301_000008_create_mail_templates_table::Migration),
            Box::new(m20250301_000009_create_announcements_table::Migration),
        ]
    }
}

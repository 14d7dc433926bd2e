//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod api_formats;
pub mod api_format_endpoints;
pub mod api_providers;
pub mod ai_models;
pub mod ai_assistants;
pub mod usage_records;
pub mod usage_users_daily;
pub mod mail_templates;
pub mod announcements;
pub mod announcement_translations;

pub use api_formats::Entity as ApiFormats;
pub use api_format_endpoints::Entity as ApiFormatEndpoints;
pub use api_providers::Entity as ApiProviders;
pub use ai_models::Entity as AiModels;
pub use ai_assistants::Entity as AiAssistants;
pub use usage_records::Entity as UsageRecords;
pub use usage_users_daily::Entity as UsageUsersDaily;
pub use mail_templates::Entity as MailTemplates;
pub use announcements::Entity as Announcements;
pub use announcement_translations::Entity as AnnouncementTranslations;

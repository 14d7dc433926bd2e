//! # 测试数据 Fixtures
//!
//! 提供测试用的数据结构和预设数据

use chrono::{NaiveDateTime, Utc};
use entity::{
    ai_assistants::{self, AssistantStatus, AssistantVisibility},
    ai_models, api_format_endpoints, api_formats, api_providers, mail_templates,
    usage_records::{self, UsageStatus},
};
use sea_orm::Set;
use serde_json::json;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// API 格式测试数据构建器
#[derive(Debug, Clone)]
pub struct ApiFormatFixture {
    pub unique_name: String,
    pub display_name: String,
    pub base_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl ApiFormatFixture {
    /// 创建新的格式 fixture
    #[must_use]
    pub fn new(unique_name: &str) -> Self {
        Self {
            unique_name: unique_name.to_string(),
            display_name: unique_name.to_string(),
            base_url: None,
            metadata: None,
        }
    }

    /// OpenAI 兼容格式
    #[must_use]
    pub fn openai() -> Self {
        Self::new("openai-api").metadata(json!({"auth_type": "bearer"}))
    }

    /// Google 格式
    #[must_use]
    pub fn google() -> Self {
        Self::new("google-api").metadata(json!({"auth_type": "api_key"}))
    }

    /// 设置元数据
    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn to_active_model(self) -> api_formats::ActiveModel {
        api_formats::ActiveModel {
            unique_name: Set(self.unique_name),
            display_name: Set(self.display_name),
            base_url: Set(self.base_url),
            metadata: Set(self.metadata.map(|m| m.to_string())),
            provider_class: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
    }
}

/// 端点测试数据构建器
#[derive(Debug, Clone)]
pub struct EndpointFixture {
    pub name: String,
    pub path: String,
    pub method: String,
    pub is_active: bool,
}

impl EndpointFixture {
    #[must_use]
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            method: if name == "models.list" { "GET" } else { "POST" }.to_string(),
            is_active: true,
        }
    }

    /// 设置为停用状态
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn to_active_model(self, api_format_id: i32) -> api_format_endpoints::ActiveModel {
        api_format_endpoints::ActiveModel {
            api_format_id: Set(api_format_id),
            name: Set(self.name),
            path: Set(self.path),
            method: Set(self.method),
            is_active: Set(self.is_active),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
    }
}

/// 服务商测试数据构建器
#[derive(Debug, Clone)]
pub struct ProviderFixture {
    pub provider_name: String,
    pub unique_name: String,
    pub api_format_id: Option<i32>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub additional_settings: Option<serde_json::Value>,
}

impl ProviderFixture {
    /// 创建新的服务商 fixture
    #[must_use]
    pub fn new(unique_name: &str) -> Self {
        Self {
            provider_name: unique_name.to_string(),
            unique_name: unique_name.to_string(),
            api_format_id: None,
            api_key: None,
            base_url: Some("https://api.example.com/v1".to_string()),
            is_active: true,
            display_order: 0,
            additional_settings: None,
        }
    }

    #[must_use]
    pub fn name(mut self, provider_name: &str) -> Self {
        self.provider_name = provider_name.to_string();
        self
    }

    #[must_use]
    pub const fn format(mut self, api_format_id: i32) -> Self {
        self.api_format_id = Some(api_format_id);
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: Option<&str>) -> Self {
        self.base_url = base_url.map(str::to_string);
        self
    }

    /// 设置已加密的密钥列值
    #[must_use]
    pub fn stored_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    #[must_use]
    pub const fn order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: serde_json::Value) -> Self {
        self.additional_settings = Some(settings);
        self
    }

    /// 设置为停用状态
    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn to_active_model(self) -> api_providers::ActiveModel {
        api_providers::ActiveModel {
            provider_name: Set(self.provider_name),
            unique_name: Set(self.unique_name),
            api_format_id: Set(self.api_format_id),
            api_key: Set(self.api_key),
            base_url: Set(self.base_url),
            is_active: Set(self.is_active),
            display_order: Set(self.display_order),
            additional_settings: Set(self.additional_settings.map(|s| s.to_string())),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
    }
}

/// 模型测试数据构建器
#[derive(Debug, Clone)]
pub struct ModelFixture {
    pub system_id: String,
    pub model_id: String,
    pub label: String,
    pub provider_id: i32,
    pub is_active: bool,
    pub is_visible: bool,
}

impl ModelFixture {
    #[must_use]
    pub fn new(provider_id: i32, model_id: &str) -> Self {
        Self {
            system_id: uuid::Uuid::new_v4().to_string(),
            model_id: model_id.to_string(),
            label: model_id.to_string(),
            provider_id,
            is_active: true,
            is_visible: true,
        }
    }

    #[must_use]
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    #[must_use]
    pub fn system_id(mut self, system_id: &str) -> Self {
        self.system_id = system_id.to_string();
        self
    }

    pub fn to_active_model(self) -> ai_models::ActiveModel {
        ai_models::ActiveModel {
            system_id: Set(self.system_id),
            model_id: Set(self.model_id),
            label: Set(self.label),
            provider_id: Set(self.provider_id),
            is_active: Set(self.is_active),
            streamable: Set(true),
            is_visible: Set(self.is_visible),
            display_order: Set(0),
            information: Set(None),
            settings: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
    }
}

/// 助手测试数据构建器
#[derive(Debug, Clone)]
pub struct AssistantFixture {
    pub key: String,
    pub status: AssistantStatus,
    pub visibility: AssistantVisibility,
    pub owner_id: Option<i32>,
    pub ai_model: Option<String>,
}

impl AssistantFixture {
    #[must_use]
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            status: AssistantStatus::Active,
            visibility: AssistantVisibility::Public,
            owner_id: None,
            ai_model: None,
        }
    }

    #[must_use]
    pub const fn status(mut self, status: AssistantStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn visibility(mut self, visibility: AssistantVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub const fn owner(mut self, owner_id: i32) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    #[must_use]
    pub fn model(mut self, system_id: &str) -> Self {
        self.ai_model = Some(system_id.to_string());
        self
    }

    pub fn to_active_model(self) -> ai_assistants::ActiveModel {
        ai_assistants::ActiveModel {
            name: Set(self.key.replace('_', " ")),
            key: Set(self.key),
            description: Set(None),
            status: Set(self.status),
            visibility: Set(self.visibility),
            org_id: Set(None),
            owner_id: Set(self.owner_id),
            ai_model: Set(self.ai_model),
            prompt: Set(None),
            tools: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
    }
}

/// 用量记录测试数据构建器
#[derive(Debug, Clone)]
pub struct UsageRecordFixture {
    pub user_id: Option<i32>,
    pub api_provider: Option<String>,
    pub model: String,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub server_tool_use: Option<serde_json::Value>,
    pub status: Option<UsageStatus>,
    pub created_at: NaiveDateTime,
}

impl UsageRecordFixture {
    #[must_use]
    pub fn new(user_id: Option<i32>, created_at: NaiveDateTime) -> Self {
        Self {
            user_id,
            api_provider: Some("openai".to_string()),
            model: "gpt-4o".to_string(),
            prompt_tokens: Some(100),
            completion_tokens: Some(50),
            server_tool_use: None,
            status: Some(UsageStatus::Success),
            created_at,
        }
    }

    #[must_use]
    pub fn provider(mut self, api_provider: Option<&str>) -> Self {
        self.api_provider = api_provider.map(str::to_string);
        self
    }

    #[must_use]
    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    #[must_use]
    pub const fn tokens(mut self, prompt: Option<i32>, completion: Option<i32>) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self
    }

    #[must_use]
    pub fn tool_use(mut self, tool_use: serde_json::Value) -> Self {
        self.server_tool_use = Some(tool_use);
        self
    }

    #[must_use]
    pub const fn status(mut self, status: Option<UsageStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn to_active_model(self) -> usage_records::ActiveModel {
        usage_records::ActiveModel {
            user_id: Set(self.user_id),
            room_id: Set(None),
            record_type: Set("private".to_string()),
            api_provider: Set(self.api_provider),
            model: Set(self.model),
            prompt_tokens: Set(self.prompt_tokens),
            completion_tokens: Set(self.completion_tokens),
            cache_read_input_tokens: Set(None),
            cache_creation_input_tokens: Set(None),
            reasoning_tokens: Set(None),
            audio_input_tokens: Set(None),
            audio_output_tokens: Set(None),
            server_tool_use: Set(self.server_tool_use.map(|v| v.to_string())),
            status: Set(self.status),
            created_at: Set(self.created_at),
            updated_at: Set(self.created_at),
            ..Default::default()
        }
    }
}

/// 邮件模板测试数据
pub struct MailTemplateFixture;

impl MailTemplateFixture {
    pub fn create(
        template_type: &str,
        language: &str,
        subject: &str,
        body: &str,
    ) -> mail_templates::ActiveModel {
        mail_templates::ActiveModel {
            template_type: Set(template_type.to_string()),
            language: Set(language.to_string()),
            description: Set(None),
            subject: Set(subject.to_string()),
            body: Set(body.to_string()),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
    }
}

/// 测试配置
pub struct TestConfig;

impl TestConfig {
    /// 内存数据库的应用配置
    #[must_use]
    pub fn app_config() -> crate::config::AppConfig {
        let mut config = crate::config::AppConfig::default();
        config.app.name = "HAWKI".to_string();
        config.app.url = "https://hawki.test".to_string();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config
    }
}

//! # 邮件模板服务
//!
//! 按 `(type, language)` 读取模板，缺失时回退到英文模板

use chrono::Utc;
use entity::mail_templates;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::placeholder::{PlaceholderContext, Recipient, RenderedMail, render, test_data};
use crate::config::AppSection;
use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};

/// 找不到指定语言时使用的语言
pub const FALLBACK_LANGUAGE: &str = "en";

/// 新建或更新模板参数
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInput {
    #[serde(rename = "type")]
    pub template_type: String,
    pub language: String,
    #[serde(default)]
    pub description: Option<String>,
    pub subject: String,
    pub body: String,
}

/// 邮件模板服务
pub struct MailTemplateService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MailTemplateService<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 查找模板，指定语言不存在时回退到英文
    pub async fn find(&self, template_type: &str, language: &str) -> Result<mail_templates::Model> {
        if let Some(template) = self.find_exact(template_type, language).await? {
            return Ok(template);
        }

        if language != FALLBACK_LANGUAGE {
            if let Some(template) = self.find_exact(template_type, FALLBACK_LANGUAGE).await? {
                ldebug!(
                    "system",
                    LogStage::Rendering,
                    LogComponent::Mail,
                    "template_fallback",
                    &format!("模板 {template_type} 没有 {language} 版本，使用英文模板")
                );
                return Ok(template);
            }
        }

        lwarn!(
            "system",
            LogStage::Rendering,
            LogComponent::Mail,
            "template_not_found",
            &format!("邮件模板不存在: {template_type} ({language})")
        );
        Err(AdminError::not_found("Template", template_type))
    }

    async fn find_exact(
        &self,
        template_type: &str,
        language: &str,
    ) -> Result<Option<mail_templates::Model>> {
        mail_templates::Entity::find()
            .filter(mail_templates::Column::TemplateType.eq(template_type))
            .filter(mail_templates::Column::Language.eq(language))
            .one(self.db)
            .await
            .map_err(|err| db_error("查询邮件模板失败", &err))
    }

    /// 使用给定数据渲染模板
    pub async fn render_template(
        &self,
        template_type: &str,
        language: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<RenderedMail> {
        let template = self.find(template_type, language).await?;
        Ok(render(&template.subject, &template.body, data))
    }

    /// 使用预览数据渲染模板
    pub async fn preview(
        &self,
        template_type: &str,
        language: &str,
        app: &AppSection,
        recipient: Option<&Recipient>,
    ) -> Result<RenderedMail> {
        let inviter = recipient.map(|r| r.name.as_str());
        let context = PlaceholderContext::standard(app)
            .with_recipient(recipient)
            .with_data(test_data(template_type, &app.url, inviter));
        self.render_template(template_type, language, context.values())
            .await
    }

    /// 按 `(type, language)` 新建或更新模板
    pub async fn upsert(&self, input: TemplateInput) -> Result<mail_templates::Model> {
        if input.template_type.trim().is_empty() || input.language.trim().is_empty() {
            return Err(AdminError::validation("模板类型和语言不能为空"));
        }
        if input.subject.trim().is_empty() || input.body.trim().is_empty() {
            return Err(AdminError::template(format!(
                "模板 {} ({}) 的主题和正文不能为空",
                input.template_type, input.language
            )));
        }

        let now = Utc::now().naive_utc();
        let existing = self
            .find_exact(&input.template_type, &input.language)
            .await?;

        let saved = if let Some(existing) = existing {
            let mut active = existing.into_active_model();
            active.description = Set(input.description);
            active.subject = Set(input.subject);
            active.body = Set(input.body);
            active.updated_at = Set(now);
            active
                .update(self.db)
                .await
                .map_err(|err| db_error("更新邮件模板失败", &err))?
        } else {
            mail_templates::ActiveModel {
                template_type: Set(input.template_type),
                language: Set(input.language),
                description: Set(input.description),
                subject: Set(input.subject),
                body: Set(input.body),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(self.db)
            .await
            .map_err(|err| db_error("创建邮件模板失败", &err))?
        };

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Mail,
            "template_saved",
            &format!("邮件模板已保存: {} ({})", saved.template_type, saved.language)
        );
        Ok(saved)
    }

    /// 按类型、语言排序的全部模板
    pub async fn list(&self) -> Result<Vec<mail_templates::Model>> {
        mail_templates::Entity::find()
            .order_by_asc(mail_templates::Column::TemplateType)
            .order_by_asc(mail_templates::Column::Language)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询邮件模板列表失败", &err))
    }
}

fn db_error(message: &str, err: &DbErr) -> AdminError {
    lerror!(
        "system",
        LogStage::Db,
        LogComponent::Mail,
        "mail_db_error",
        &format!("{message}: {err}")
    );
    crate::error!(Database, format!("{message}: {err}"))
}

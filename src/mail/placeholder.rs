//! # 邮件占位符
//!
//! `{{key}}` 形式的占位符替换，花括号内不允许空白。未知键原样保留，只记录调试日志。

use chrono::{Local, NaiveDateTime};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::config::AppSection;
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

static PLACEHOLDER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_.]+)\}\}").ok());

/// 访客收件人名称
pub const GUEST_NAME: &str = "Guest User";
/// 访客收件人邮箱
pub const GUEST_EMAIL: &str = "guest@example.com";

/// 替换后的邮件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
    /// 没有对应数据的占位符，按首次出现顺序
    pub unresolved: Vec<String>,
}

/// 邮件收件人
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

impl Recipient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// 替换 `subject` 和 `body` 中的占位符
#[must_use]
pub fn render(subject: &str, body: &str, data: &BTreeMap<String, String>) -> RenderedMail {
    let mut unresolved = Vec::new();
    let subject = replace_placeholders(subject, data, &mut unresolved);
    let body = replace_placeholders(body, data, &mut unresolved);

    if !unresolved.is_empty() {
        ldebug!(
            "system",
            LogStage::Rendering,
            LogComponent::Mail,
            "unresolved_placeholders",
            &format!("存在未解析的占位符: {}", unresolved.join(", "))
        );
    }

    RenderedMail {
        subject,
        body,
        unresolved,
    }
}

fn replace_placeholders(
    text: &str,
    data: &BTreeMap<String, String>,
    unresolved: &mut Vec<String>,
) -> String {
    let Some(re) = PLACEHOLDER_RE.as_ref() else {
        return text.to_string();
    };

    re.replace_all(text, |caps: &Captures<'_>| {
        let key = &caps[1];
        data.get(key).map_or_else(
            || {
                if !unresolved.iter().any(|k| k == key) {
                    unresolved.push(key.to_string());
                }
                caps[0].to_string()
            },
            Clone::clone,
        )
    })
    .into_owned()
}

/// 文本中出现的占位符，去重后按首次出现顺序返回
#[must_use]
pub fn scan_placeholders(text: &str) -> Vec<String> {
    let Some(re) = PLACEHOLDER_RE.as_ref() else {
        return Vec::new();
    };

    let mut keys: Vec<String> = Vec::new();
    for caps in re.captures_iter(text) {
        let key = &caps[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// 模板类型对应的预览数据
#[must_use]
pub fn test_data(
    template_type: &str,
    app_url: &str,
    inviter: Option<&str>,
) -> BTreeMap<String, String> {
    let app_url = app_url.trim_end_matches('/');
    let pairs: Vec<(&str, String)> = match template_type {
        "otp" => vec![("otp_code", "123456".to_string())],
        "invitation" => vec![
            ("invitation_link", format!("{app_url}/invitation/test-link")),
            ("room_name", "Test Group Chat".to_string()),
            ("inviter_name", inviter.unwrap_or("Test Inviter").to_string()),
        ],
        "welcome" | "approval" => vec![
            ("login_url", format!("{app_url}/login")),
            ("dashboard_url", format!("{app_url}/admin")),
        ],
        "notification" => vec![("dashboard_url", format!("{app_url}/admin"))],
        _ => Vec::new(),
    };

    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// 模板类型可用的占位符及说明
#[must_use]
pub fn available_placeholders(template_type: &str) -> Vec<(&'static str, &'static str)> {
    let mut placeholders = vec![
        ("app_name", "Name of the application"),
        ("app_url", "URL of the application"),
        ("user_name", "Name of the user"),
        ("user_email", "User's email address"),
        ("current_date", "Current date (YYYY-MM-DD)"),
        ("current_datetime", "Current date and time (YYYY-MM-DD HH:MM:SS)"),
        ("year", "Current year"),
    ];

    match template_type {
        "otp" => placeholders.push(("otp_code", "One-time password/authentication code")),
        "invitation" => placeholders.extend([
            ("invitation_link", "Link to join a group chat or room"),
            ("room_name", "Name of the chat room or group"),
            ("inviter_name", "Name of the person sending the invitation"),
        ]),
        "welcome" | "approval" => placeholders.extend([
            ("login_url", "Link to the login page"),
            ("dashboard_url", "Link to the admin dashboard"),
        ]),
        "notification" => placeholders.push(("dashboard_url", "Link to the admin dashboard")),
        _ => {}
    }

    placeholders
}

/// 占位符取值集合，后写入的值覆盖先写入的值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderContext {
    values: BTreeMap<String, String>,
}

impl PlaceholderContext {
    /// 应用名称、地址与当前时间
    #[must_use]
    pub fn standard(app: &AppSection) -> Self {
        Self::standard_at(app, Local::now().naive_local())
    }

    /// 以指定时间生成标准占位符
    #[must_use]
    pub fn standard_at(app: &AppSection, now: NaiveDateTime) -> Self {
        let mut values = BTreeMap::new();
        values.insert("app_name".to_string(), app.name.clone());
        values.insert(
            "app_url".to_string(),
            app.url.trim_end_matches('/').to_string(),
        );
        values.insert(
            "current_date".to_string(),
            now.format("%Y-%m-%d").to_string(),
        );
        values.insert(
            "current_datetime".to_string(),
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        values.insert("year".to_string(), now.format("%Y").to_string());
        Self { values }
    }

    /// 收件人信息，缺省时使用访客值
    #[must_use]
    pub fn with_recipient(mut self, recipient: Option<&Recipient>) -> Self {
        let (name, email) = recipient.map_or((GUEST_NAME, GUEST_EMAIL), |r| {
            (r.name.as_str(), r.email.as_str())
        });
        self.values.insert("user_name".to_string(), name.to_string());
        self.values.insert("user_email".to_string(), email.to_string());
        self
    }

    /// 自定义数据，覆盖同名的标准值
    #[must_use]
    pub fn with_data<I, K, V>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.values
            .extend(data.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> BTreeMap<String, String> {
        self.values
    }
}

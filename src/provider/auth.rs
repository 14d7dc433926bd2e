//! # 服务商认证方式
//!
//! 认证方式由格式的 `unique_name` 固定映射，不从数据库读取代码路径

use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use crate::error::{Context, Result};
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 未配置格式的服务商按此格式处理
pub const DEFAULT_FORMAT: &str = "openai-api";
/// Anthropic 接口版本
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// 认证方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key` + `anthropic-version`
    Anthropic,
    /// 查询参数 `key`
    GoogleQueryKey,
    /// 不发送凭据
    None,
}

impl AuthStyle {
    /// 按格式名选择认证方式
    #[must_use]
    pub fn for_format(format_unique_name: Option<&str>) -> Self {
        match format_unique_name.unwrap_or(DEFAULT_FORMAT) {
            "google-api" | "google-generative-language-api" => Self::GoogleQueryKey,
            "anthropic-api" => Self::Anthropic,
            "ollama-api" => Self::None,
            _ => Self::Bearer,
        }
    }

    /// 该方式是否需要 API 密钥
    #[must_use]
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::None)
    }

    /// 构建请求头（键名小写）
    ///
    /// 先合并服务商配置的额外请求头，再补充认证头；额外请求头中已有认证头时不覆盖。
    #[must_use]
    pub fn build_headers(
        self,
        api_key: Option<&str>,
        extra_headers: &[(String, String)],
    ) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());

        for (name, value) in extra_headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        let api_key = api_key.filter(|key| !key.is_empty());
        match (self, api_key) {
            (Self::Bearer, Some(key)) => {
                headers
                    .entry("authorization".to_string())
                    .or_insert_with(|| format!("Bearer {key}"));
            }
            (Self::Anthropic, Some(key)) => {
                headers
                    .entry("x-api-key".to_string())
                    .or_insert_with(|| key.to_string());
                headers
                    .entry("anthropic-version".to_string())
                    .or_insert_with(|| ANTHROPIC_VERSION.to_string());
            }
            (Self::Anthropic, None) => {
                headers
                    .entry("anthropic-version".to_string())
                    .or_insert_with(|| ANTHROPIC_VERSION.to_string());
            }
            _ => {}
        }

        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::ProviderAuth,
            "build_headers",
            &format!("构建请求头: style={self}, headers={}", headers.len())
        );
        headers
    }

    /// 将凭据写入地址（仅 Google 方式），已带 `key` 参数时保持不变
    pub fn apply_to_url(self, url: &str, api_key: Option<&str>) -> Result<String> {
        let api_key = api_key.filter(|key| !key.is_empty());
        let (Self::GoogleQueryKey, Some(key)) = (self, api_key) else {
            return Ok(url.to_string());
        };

        let mut parsed = Url::parse(url).with_context(|| format!("无效的请求地址: {url}"))?;
        if !parsed.query_pairs().any(|(name, _)| name == "key") {
            parsed.query_pairs_mut().append_pair("key", key);
        }
        Ok(parsed.to_string())
    }
}

impl fmt::Display for AuthStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bearer => "bearer",
            Self::Anthropic => "anthropic",
            Self::GoogleQueryKey => "google_query_key",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Some("openai-api"), AuthStyle::Bearer)]
    #[case(Some("google-api"), AuthStyle::GoogleQueryKey)]
    #[case(Some("google-generative-language-api"), AuthStyle::GoogleQueryKey)]
    #[case(Some("anthropic-api"), AuthStyle::Anthropic)]
    #[case(Some("ollama-api"), AuthStyle::None)]
    #[case(Some("mistral-api"), AuthStyle::Bearer)]
    #[case(None, AuthStyle::Bearer)]
    fn test_for_format(#[case] format: Option<&str>, #[case] expected: AuthStyle) {
        assert_eq!(AuthStyle::for_format(format), expected);
    }

    #[test]
    fn test_bearer_headers() {
        let headers = AuthStyle::Bearer.build_headers(Some("sk-test"), &[]);
        assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer sk-test"));
        assert_eq!(headers.get("accept").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn test_existing_auth_header_is_kept() {
        let extra = vec![
            ("Authorization".to_string(), "Bearer custom".to_string()),
            ("X-Org".to_string(), "hawki".to_string()),
        ];
        let headers = AuthStyle::Bearer.build_headers(Some("sk-test"), &extra);
        assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer custom"));
        assert_eq!(headers.get("x-org").map(String::as_str), Some("hawki"));
    }

    #[test]
    fn test_anthropic_headers() {
        let headers = AuthStyle::Anthropic.build_headers(Some("ak"), &[]);
        assert_eq!(headers.get("x-api-key").map(String::as_str), Some("ak"));
        assert_eq!(
            headers.get("anthropic-version").map(String::as_str),
            Some(ANTHROPIC_VERSION)
        );
        assert!(!headers.contains_key("authorization"));
    }

    #[test]
    fn test_google_uses_query_key_only() {
        let headers = AuthStyle::GoogleQueryKey.build_headers(Some("gk"), &[]);
        assert!(!headers.contains_key("authorization"));
        assert!(!headers.contains_key("x-api-key"));

        let url = AuthStyle::GoogleQueryKey
            .apply_to_url("https://generativelanguage.googleapis.com/v1beta/models", Some("gk"))
            .unwrap();
        assert_eq!(url, "https://generativelanguage.googleapis.com/v1beta/models?key=gk");
    }

    #[test]
    fn test_none_sends_no_credentials() {
        assert!(!AuthStyle::None.requires_api_key());
        let headers = AuthStyle::None.build_headers(Some("ignored"), &[]);
        assert_eq!(headers.len(), 1);

        let url = AuthStyle::None
            .apply_to_url("http://localhost:11434/api/tags", Some("ignored"))
            .unwrap();
        assert_eq!(url, "http://localhost:11434/api/tags");
    }
}

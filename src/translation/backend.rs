//! 翻译后端
//!
//! `TranslateBackend` 是翻译请求的唯一接缝：页面一侧通过消息通道转发
//! （见 `messaging::ChannelBackend`），后台一侧直接请求公共翻译接口
//! （`GoogleTranslateBackend`）。

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use url::Url;

use crate::config::AppConfig;
use crate::parsers::html::preview;

use super::error::{TranslationError, TranslationResult};

/// 翻译后端接口
pub trait TranslateBackend: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &'static str;

    /// 将 `text` 翻译为 `target_lang`
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
    ) -> BoxFuture<'a, TranslationResult<String>>;
}

/// 公共翻译接口（`translate_a/single`，gtx 客户端）
///
/// 请求形如 `GET {endpoint}?client=gtx&sl=auto&tl=<lang>&dt=t&q=<text>`，
/// 响应是嵌套数组，`data[0]` 中每个片段的第 0 项是一段译文。
pub struct GoogleTranslateBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl GoogleTranslateBackend {
    pub fn new(endpoint: &str, request_timeout: Duration, user_agent: &str) -> TranslationResult<Self> {
        let endpoint = Url::parse(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("无法创建HTTP客户端: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &AppConfig) -> TranslationResult<Self> {
        Self::new(&config.endpoint, config.request_timeout(), &config.user_agent)
    }

    /// 构造请求 URL
    pub fn request_url(&self, text: &str, target_lang: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", "auto")
            .append_pair("tl", target_lang)
            .append_pair("dt", "t")
            .append_pair("q", text);
        url
    }

    async fn request(&self, text: &str, target_lang: &str) -> TranslationResult<String> {
        tracing::debug!("翻译请求: {} -> {}", preview(text, 50), target_lang);

        let response = self
            .client
            .get(self.request_url(text, target_lang))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.text().await?;
        let translation = parse_response(&body)?;
        tracing::debug!("翻译完成: {}", preview(&translation, 50));
        Ok(translation)
    }
}

impl TranslateBackend for GoogleTranslateBackend {
    fn name(&self) -> &'static str {
        "google-gtx"
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
    ) -> BoxFuture<'a, TranslationResult<String>> {
        self.request(text, target_lang).boxed()
    }
}

/// 解析接口响应，按顺序拼接 `data[0][i][0]` 中的译文片段
pub fn parse_response(body: &str) -> TranslationResult<String> {
    let data: Value = serde_json::from_str(body)?;

    let segments = data
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::MalformedResponse("缺少译文片段数组".to_string()))?;

    let translation: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translation.is_empty() {
        return Err(TranslationError::MalformedResponse(
            "译文片段为空".to_string(),
        ));
    }

    Ok(translation)
}

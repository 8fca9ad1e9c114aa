//! 页面与后台之间的消息通道
//!
//! 页面一侧发送 `{"action":"translate","text":..,"targetLang":..}`，后台服务
//! 回复 `{"success":true,"translation":..}` 或 `{"success":false,"error":..}`。
//! 后端翻译失败、请求格式错误或动作未知时都回复 `success:false`，
//! 页面一侧据此保持原字幕，不缓存也不渲染。

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::parsers::html::preview;
use crate::translation::{TranslateBackend, TranslationError, TranslationResult};

const CHANNEL_CAPACITY: usize = 32;

/// 通道请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    Translate {
        text: String,
        #[serde(rename = "targetLang")]
        target_lang: String,
    },
}

/// 通道响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(translation: String) -> Self {
        Self {
            success: true,
            translation: Some(translation),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            translation: None,
            error: Some(message.into()),
        }
    }
}

/// 后台翻译服务
#[derive(Clone)]
pub struct BackgroundService {
    backend: Arc<dyn TranslateBackend>,
}

impl BackgroundService {
    pub fn new(backend: Arc<dyn TranslateBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Translate { text, target_lang } => {
                match self.translate_text(&text, &target_lang).await {
                    Ok(translation) => Response::ok(translation),
                    Err(error) => Response::error(error.to_string()),
                }
            }
        }
    }

    /// 校验 JSON 请求体，失败时给出错误说明
    pub fn parse_json(body: &str) -> Result<Request, String> {
        let value = serde_json::from_str::<Value>(body).map_err(|e| {
            tracing::warn!("消息请求不是合法 JSON: {}", e);
            format!("无效的请求: {}", e)
        })?;
        Self::parse_value(value)
    }

    fn parse_value(value: Value) -> Result<Request, String> {
        serde_json::from_value::<Request>(value).map_err(|e| {
            tracing::warn!("无效的消息请求: {}", e);
            format!("无效的请求: {}", e)
        })
    }

    /// 处理未经校验的 JSON 请求
    pub async fn handle_value(&self, value: Value) -> Response {
        match Self::parse_value(value) {
            Ok(request) => self.handle(request).await,
            Err(message) => Response::error(message),
        }
    }

    pub async fn handle_json(&self, body: &str) -> Response {
        match Self::parse_json(body) {
            Ok(request) => self.handle(request).await,
            Err(message) => Response::error(message),
        }
    }

    /// 翻译文本；空文本原样返回
    pub async fn translate_text(&self, text: &str, target_lang: &str) -> TranslationResult<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        self.backend
            .translate(text, target_lang)
            .await
            .map_err(|error| {
                error.log(&format!("后台翻译失败 ({})", preview(text, 50)));
                error
            })
    }

    /// 在当前运行时上启动服务任务，返回页面一侧的通道
    pub fn spawn(self) -> MessageChannel {
        let (tx, mut rx) = mpsc::channel::<Envelope>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let response = self.handle(envelope.request).await;
                if envelope.reply.send(response).is_err() {
                    tracing::debug!("请求方已放弃等待响应");
                }
            }
            tracing::debug!("消息通道已关闭，后台服务退出");
        });

        MessageChannel { tx }
    }
}

struct Envelope {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// 页面一侧的通道句柄
#[derive(Clone)]
pub struct MessageChannel {
    tx: mpsc::Sender<Envelope>,
}

impl MessageChannel {
    pub async fn send(&self, request: Request) -> TranslationResult<Response> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| TranslationError::ChannelError("后台服务不可用".to_string()))?;

        response
            .await
            .map_err(|_| TranslationError::ChannelError("后台服务未回复".to_string()))
    }
}

/// 经消息通道转发的翻译后端
#[derive(Clone)]
pub struct ChannelBackend {
    channel: MessageChannel,
}

impl ChannelBackend {
    pub fn new(channel: MessageChannel) -> Self {
        Self { channel }
    }
}

impl TranslateBackend for ChannelBackend {
    fn name(&self) -> &'static str {
        "message-channel"
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
    ) -> BoxFuture<'a, TranslationResult<String>> {
        async move {
            let response = self
                .channel
                .send(Request::Translate {
                    text: text.to_string(),
                    target_lang: target_lang.to_string(),
                })
                .await?;

            match response {
                Response {
                    success: true,
                    translation: Some(translation),
                    ..
                } => Ok(translation),
                Response {
                    success: true,
                    translation: None,
                    ..
                } => Err(TranslationError::RemoteError("响应缺少译文".to_string())),
                Response { error, .. } => Err(TranslationError::RemoteError(
                    error.unwrap_or_else(|| "未知错误".to_string()),
                )),
            }
        }
        .boxed()
    }
}

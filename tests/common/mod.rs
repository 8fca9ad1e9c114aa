// 集成测试公共模块
//
// 提供页面样例、可控的翻译后端和基于 axum 的模拟翻译接口

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Query, http::StatusCode, routing::get, Router};
use futures::future::BoxFuture;
use futures::FutureExt;
use markup5ever_rcdom::{Handle, RcDom};

use subtrans::detection::{Detector, DetectorConfig};
use subtrans::parsers::html::html_to_dom;
use subtrans::settings::Settings;
use subtrans::translation::{
    ClientOptions, TranslateBackend, TranslationClient, TranslationError, TranslationResult,
};
use subtrans::SubtitleTranslator;

/// 页面样例
pub struct Fixtures;

impl Fixtures {
    pub fn youtube(text: &str) -> String {
        format!(
            "<html><body><div id=\"movie_player\">\
             <div class=\"ytp-caption-window-container\">\
             <span class=\"ytp-caption-segment\" style=\"left: 12px; top: 380px; width: 420px; height: 36px\">{}</span>\
             </div></div></body></html>",
            text
        )
    }

    pub fn dailymotion(text: &str) -> String {
        format!(
            "<html><body><div class=\"dmp-player\">\
             <video></video>\
             <div class=\"dmp-subtitles-line\" style=\"width: 60px; height: 20px\">tiny</div>\
             <div class=\"dmp-subtitles-line\" style=\"left: 40px; top: 500px; width: 640px; height: 48px\">{}</div>\
             </div></body></html>",
            text
        )
    }

    pub fn netflix(lines: &[&str]) -> String {
        let spans: String = lines
            .iter()
            .map(|line| format!("<span>{}</span>", line))
            .collect();
        format!(
            "<html><body><div class=\"player-timedtext\">\
             <div class=\"player-timedtext-text-container\" style=\"left: 100px; top: 600px; width: 800px; height: 60px\">{}</div>\
             </div></body></html>",
            spans
        )
    }

    pub fn generic(text: &str) -> String {
        format!(
            "<html><body><div class=\"vjs-text-track-display\">\
             <div class=\"vjs-caption-line\">{}</div></div></body></html>",
            text
        )
    }

    pub fn empty() -> String {
        "<html><body><div class=\"player\"><video></video></div></body></html>".to_string()
    }
}

pub fn parse(html: &str) -> RcDom {
    html_to_dom(html.as_bytes(), "utf-8").expect("fixture should parse")
}

pub fn document(html: &str) -> Handle {
    parse(html).document
}

/// 模拟后端的行为
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 固定译文
    Fixed(String),
    /// 在原文前加上 `[lang]`
    Tagged,
    /// 总是失败
    Fail,
}

/// 可计数、可延迟的翻译后端
pub struct MockBackend {
    reply: MockReply,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(reply: MockReply) -> Arc<Self> {
        Self::with_delay(reply, Duration::ZERO)
    }

    pub fn with_delay(reply: MockReply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TranslateBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
    ) -> BoxFuture<'a, TranslationResult<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                MockReply::Fixed(translation) => Ok(translation.clone()),
                MockReply::Tagged => Ok(format!("[{}] {}", target_lang, text)),
                MockReply::Fail => Err(TranslationError::NetworkError("mock failure".to_string())),
            }
        }
        .boxed()
    }
}

pub fn client_with(backend: Arc<MockBackend>, flight_timeout: Duration) -> TranslationClient {
    TranslationClient::new(
        backend,
        ClientOptions {
            default_language: "tr".to_string(),
            flight_timeout,
        },
    )
    .expect("client options are valid")
}

pub fn detector() -> Detector {
    Detector::new(&DetectorConfig {
        throttle: Duration::ZERO,
        min_candidate_width: 100.0,
    })
    .expect("built-in selectors parse")
}

pub fn translator_with(backend: Arc<MockBackend>, settings: Settings) -> SubtitleTranslator {
    SubtitleTranslator::new(
        settings,
        detector(),
        client_with(backend, Duration::from_secs(5)),
    )
}

/// 模拟翻译接口的行为
#[derive(Debug, Clone, Copy)]
pub enum EndpointMode {
    /// 返回 `[[["Merhaba","Hello",null,null,1]],null,"en"]`
    Merhaba,
    /// 返回 HTTP 500
    ServerError,
    /// 返回无法解析的响应体
    Garbage,
}

/// 在本地端口启动模拟翻译接口，返回接口地址
pub async fn spawn_endpoint(mode: EndpointMode) -> String {
    let app = Router::new().route(
        "/translate_a/single",
        get(move |Query(params): Query<HashMap<String, String>>| async move {
            let source = params.get("q").cloned().unwrap_or_default();
            match mode {
                EndpointMode::Merhaba => (
                    StatusCode::OK,
                    format!(
                        "[[[\"Merhaba\",{},null,null,1]],null,\"en\"]",
                        serde_json::Value::String(source)
                    ),
                ),
                EndpointMode::ServerError => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
                }
                EndpointMode::Garbage => (StatusCode::OK, "<html>blocked</html>".to_string()),
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock endpoint");
    let address = listener.local_addr().expect("local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock endpoint");
    });

    format!("http://{}/translate_a/single", address)
}

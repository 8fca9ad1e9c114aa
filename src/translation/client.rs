//! 翻译客户端
//!
//! 把一次字幕翻译请求依次交给：空文本检查 → 在途检查 → 目标语言判断 →
//! 缓存 → 单飞守卫 → 带安全超时的后端调用。任何失败都回退为原文，结果里的
//! [`TranslationStatus`] 告诉调用方是否值得渲染。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::parsers::html::preview;

use super::backend::TranslateBackend;
use super::cache::TranslationCache;
use super::error::{TranslationError, TranslationResult};
use super::flight::SingleFlight;
use super::language::LanguageMarker;

/// 翻译结果的来源
#[derive(Debug, Clone)]
pub enum TranslationStatus {
    /// 后端返回的新译文
    Network,
    /// 缓存命中
    Cache,
    /// 原文已经是目标语言
    AlreadyInTarget,
    /// 空白文本
    Empty,
    /// 已有请求在途，本次被丢弃
    Dropped,
    /// 后端失败或超时
    Failed(TranslationError),
}

/// 一次翻译的结果
#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub status: TranslationStatus,
}

impl Translation {
    fn unchanged(text: &str, status: TranslationStatus) -> Self {
        Self {
            text: text.to_string(),
            status,
        }
    }

    /// 是否得到了可渲染的译文
    pub fn is_translated(&self) -> bool {
        matches!(
            self.status,
            TranslationStatus::Network | TranslationStatus::Cache
        )
    }
}

/// 客户端选项
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub default_language: String,
    pub flight_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ClientOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_language: config.default_language.clone(),
            flight_timeout: config.flight_timeout(),
        }
    }
}

/// 翻译客户端
///
/// 克隆得到的句柄共享缓存与单飞守卫。
#[derive(Clone)]
pub struct TranslationClient {
    backend: Arc<dyn TranslateBackend>,
    cache: TranslationCache,
    flight: Arc<SingleFlight>,
    marker: LanguageMarker,
}

impl TranslationClient {
    pub fn new(backend: Arc<dyn TranslateBackend>, options: ClientOptions) -> TranslationResult<Self> {
        if options.flight_timeout.is_zero() {
            return Err(TranslationError::ConfigError(
                "flight timeout 必须大于 0".to_string(),
            ));
        }

        Ok(Self {
            backend,
            cache: TranslationCache::new(),
            flight: Arc::new(SingleFlight::new(options.flight_timeout)),
            marker: LanguageMarker::new(&options.default_language)?,
        })
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// 翻译 `text`，失败时返回原文
    pub async fn translate(&self, text: &str, target_lang: &str) -> Translation {
        if text.trim().is_empty() {
            return Translation::unchanged(text, TranslationStatus::Empty);
        }

        // 有翻译在途时新的检测直接丢弃，缓存命中也不例外
        if self.flight.is_busy() {
            tracing::debug!("已有翻译在途，丢弃: {}", preview(text, 50));
            return Translation::unchanged(text, TranslationStatus::Dropped);
        }

        if self.marker.already_in_target(text, target_lang) {
            tracing::debug!("已是目标语言，跳过: {}", preview(text, 50));
            return Translation::unchanged(text, TranslationStatus::AlreadyInTarget);
        }

        if let Some(cached) = self.cache.get(text) {
            tracing::debug!("缓存命中: {}", preview(text, 50));
            return Translation {
                text: cached,
                status: TranslationStatus::Cache,
            };
        }

        let Some(_permit) = self.flight.try_acquire() else {
            tracing::debug!("已有翻译在途，丢弃: {}", preview(text, 50));
            return Translation::unchanged(text, TranslationStatus::Dropped);
        };

        let timeout = self.flight.timeout();
        let outcome = match tokio::time::timeout(timeout, self.backend.translate(text, target_lang)).await {
            Ok(result) => result,
            Err(_) => Err(TranslationError::TimeoutError(timeout)),
        };

        match outcome {
            Ok(translated) => {
                tracing::info!(
                    backend = self.backend.name(),
                    "翻译成功: {} -> {}",
                    preview(text, 50),
                    preview(&translated, 50)
                );
                self.cache.insert(text.to_string(), translated.clone());
                Translation {
                    text: translated,
                    status: TranslationStatus::Network,
                }
            }
            Err(error) => {
                error.log("翻译失败，回退为原文");
                Translation::unchanged(text, TranslationStatus::Failed(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoBackend {
        calls: AtomicUsize,
    }

    impl TranslateBackend for EchoBackend {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn translate<'a>(
            &'a self,
            text: &'a str,
            target_lang: &'a str,
        ) -> BoxFuture<'a, TranslationResult<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(format!("[{}] {}", target_lang, text)) }.boxed()
        }
    }

    fn client() -> (TranslationClient, Arc<EchoBackend>) {
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
        });
        let client = TranslationClient::new(backend.clone(), ClientOptions::default()).unwrap();
        (client, backend)
    }

    #[tokio::test]
    async fn empty_text_is_returned_unchanged() {
        let (client, backend) = client();

        let result = client.translate("   ", "tr").await;
        assert_eq!(result.text, "   ");
        assert!(matches!(result.status, TranslationStatus::Empty));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn turkish_text_skips_backend() {
        let (client, backend) = client();

        let result = client.translate("Nasılsın?", "tr").await;
        assert_eq!(result.text, "Nasılsın?");
        assert!(matches!(result.status, TranslationStatus::AlreadyInTarget));
        assert!(!result.is_translated());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_call_hits_cache() {
        let (client, backend) = client();

        let first = client.translate("Hello", "de").await;
        let second = client.translate("Hello", "de").await;

        assert_eq!(first.text, "[de] Hello");
        assert_eq!(second.text, "[de] Hello");
        assert!(matches!(first.status, TranslationStatus::Network));
        assert!(matches!(second.status, TranslationStatus::Cache));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn busy_client_drops_before_cache_lookup() {
        let (client, _backend) = client();
        client.translate("Hello", "de").await;

        let _permit = client.flight.try_acquire().unwrap();
        let result = client.translate("Hello", "de").await;
        assert_eq!(result.text, "Hello");
        assert!(matches!(result.status, TranslationStatus::Dropped));
    }

    #[test]
    fn zero_flight_timeout_is_rejected() {
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
        });
        let options = ClientOptions {
            default_language: "tr".to_string(),
            flight_timeout: Duration::ZERO,
        };
        assert!(TranslationClient::new(backend, options).is_err());
    }
}

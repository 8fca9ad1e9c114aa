//! 翻译缓存模块
//!
//! 以原文为键缓存译文。缓存随进程存在，不设容量上限也不做淘汰，
//! 字幕量级很小，整个会话内的条目数通常只有几百条。

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_entries: usize,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// 翻译缓存
///
/// 克隆得到的是同一份缓存的句柄。
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
    stats: Arc<RwLock<CacheStats>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按原文精确查找
    pub fn get(&self, text: &str) -> Option<String> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
            .cloned();

        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.total_requests += 1;
        if found.is_some() {
            stats.cache_hits += 1;
        } else {
            stats.cache_misses += 1;
        }

        found
    }

    /// 插入译文，已存在时覆盖
    pub fn insert(&self, original: String, translated: String) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(original, translated);

        self.stats
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .total_entries = entries.len();
    }

    pub fn contains_key(&self, text: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(text)
    }

    pub fn size(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// 清空缓存，统计计数保留
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.stats
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .total_entries = 0;
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> CacheStats {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

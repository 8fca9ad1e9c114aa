//! 用户设置与设置存储
//!
//! [`Settings`] 是控制器持有的设置快照；[`SettingsStore`] 是异步键值存储，
//! 写入后向订阅者广播只包含变化键的差异 `{key: {newValue, oldValue?}}`。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::config::constants::DEFAULT_LANGUAGE;
use crate::core::{SubtitleError, SubtitleResult};

pub const ENABLED: &str = "enabled";
pub const TARGET_LANGUAGE: &str = "targetLanguage";
pub const AUTO_TRANSLATE: &str = "autoTranslate";
pub const SHOW_ORIGINAL: &str = "showOriginal";
pub const TRANSLATION_COUNT: &str = "translationCount";

/// 设置记录包含的键
pub const SETTING_KEYS: &[&str] = &[ENABLED, TARGET_LANGUAGE, AUTO_TRANSLATE, SHOW_ORIGINAL];

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// 用户设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub target_language: String,
    pub auto_translate: bool,
    pub show_original: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_language: DEFAULT_LANGUAGE.to_string(),
            auto_translate: true,
            show_original: false,
        }
    }
}

/// 单个键的变化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// 一次写入产生的差异
pub type SettingsChanges = BTreeMap<String, StorageChange>;

impl Settings {
    /// 把存储中读到的值合并到默认设置上
    pub fn from_values(values: &HashMap<String, Value>) -> Self {
        let mut settings = Self::default();
        for (key, value) in values {
            settings.apply_value(key, value);
        }
        settings
    }

    /// 应用一次差异，返回实际发生变化的设置键
    pub fn apply_changes(&mut self, changes: &SettingsChanges) -> Vec<&'static str> {
        let mut changed = Vec::new();
        for (key, change) in changes {
            let Some(value) = &change.new_value else {
                continue;
            };
            if let Some(key) = self.apply_value(key, value) {
                changed.push(key);
            }
        }
        changed
    }

    /// 转换为存储中的键值
    pub fn to_values(&self) -> HashMap<String, Value> {
        HashMap::from([
            (ENABLED.to_string(), Value::Bool(self.enabled)),
            (
                TARGET_LANGUAGE.to_string(),
                Value::String(self.target_language.clone()),
            ),
            (AUTO_TRANSLATE.to_string(), Value::Bool(self.auto_translate)),
            (SHOW_ORIGINAL.to_string(), Value::Bool(self.show_original)),
        ])
    }

    fn apply_value(&mut self, key: &str, value: &Value) -> Option<&'static str> {
        let (key, changed) = match key {
            ENABLED => (ENABLED, Self::update_bool(&mut self.enabled, key, value)),
            AUTO_TRANSLATE => (
                AUTO_TRANSLATE,
                Self::update_bool(&mut self.auto_translate, key, value),
            ),
            SHOW_ORIGINAL => (
                SHOW_ORIGINAL,
                Self::update_bool(&mut self.show_original, key, value),
            ),
            TARGET_LANGUAGE => match value.as_str() {
                Some(language) if !language.trim().is_empty() => {
                    let changed = self.target_language != language;
                    self.target_language = language.to_string();
                    (TARGET_LANGUAGE, changed)
                }
                _ => {
                    tracing::warn!("忽略无效的设置值 {} = {}", key, value);
                    return None;
                }
            },
            _ => return None,
        };
        changed.then_some(key)
    }

    fn update_bool(slot: &mut bool, key: &str, value: &Value) -> bool {
        match value.as_bool() {
            Some(flag) => {
                let changed = *slot != flag;
                *slot = flag;
                changed
            }
            None => {
                tracing::warn!("忽略无效的设置值 {} = {}", key, value);
                false
            }
        }
    }
}

/// 异步设置存储
pub trait SettingsStore: Send + Sync {
    /// 读取给定键，缺失的键不出现在结果中
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, SubtitleResult<HashMap<String, Value>>>;

    /// 写入键值，并通知订阅者实际变化的键
    fn set(&self, values: Map<String, Value>) -> BoxFuture<'_, SubtitleResult<SettingsChanges>>;

    /// 订阅变化通知
    fn subscribe(&self) -> broadcast::Receiver<SettingsChanges>;
}

/// 进程内设置存储
#[derive(Debug, Clone)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, Value>>>,
    changes: broadcast::Sender<SettingsChanges>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// 预置默认设置的存储
    pub fn with_defaults() -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(Settings::default().to_values());
        store
    }

    fn read(&self, keys: &[&str]) -> HashMap<String, Value> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        keys.iter()
            .filter_map(|key| values.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect()
    }

    fn write(&self, updates: Map<String, Value>) -> SettingsChanges {
        let mut changes = SettingsChanges::new();
        {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            for (key, new_value) in updates {
                let old_value = values.insert(key.clone(), new_value.clone());
                if old_value.as_ref() != Some(&new_value) {
                    changes.insert(
                        key,
                        StorageChange {
                            old_value,
                            new_value: Some(new_value),
                        },
                    );
                }
            }
        }

        if !changes.is_empty() {
            // 没有订阅者时发送失败，忽略即可
            let _ = self.changes.send(changes.clone());
        }
        changes
    }
}

impl SettingsStore for MemoryStore {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, SubtitleResult<HashMap<String, Value>>> {
        async move { Ok(self.read(keys)) }.boxed()
    }

    fn set(&self, values: Map<String, Value>) -> BoxFuture<'_, SubtitleResult<SettingsChanges>> {
        async move { Ok(self.write(values)) }.boxed()
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingsChanges> {
        self.changes.subscribe()
    }
}

/// 读取设置，存储中的值覆盖默认值
pub async fn load_settings(store: &dyn SettingsStore) -> SubtitleResult<Settings> {
    let values = store.get(SETTING_KEYS).await?;
    Ok(Settings::from_values(&values))
}

/// 翻译计数加一，返回新计数
pub async fn increment_counter(store: &dyn SettingsStore) -> SubtitleResult<u64> {
    let values = store.get(&[TRANSLATION_COUNT]).await?;
    let count = match values.get(TRANSLATION_COUNT) {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            SubtitleError::Settings(format!("{} 不是非负整数: {}", TRANSLATION_COUNT, value))
        })?,
    } + 1;

    let mut update = Map::new();
    update.insert(TRANSLATION_COUNT.to_string(), Value::from(count));
    store.set(update).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn changes(value: Value) -> SettingsChanges {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn stored_values_override_defaults() {
        let values = HashMap::from([
            (TARGET_LANGUAGE.to_string(), json!("de")),
            (SHOW_ORIGINAL.to_string(), json!(true)),
        ]);

        let settings = Settings::from_values(&values);
        assert_eq!(settings.target_language, "de");
        assert!(settings.show_original);
        assert!(settings.enabled);
        assert!(settings.auto_translate);
    }

    #[test]
    fn apply_changes_reports_changed_keys() {
        let mut settings = Settings::default();
        let diff = changes(json!({
            "enabled": {"newValue": false, "oldValue": true},
            "showOriginal": {"newValue": false},
            "translationCount": {"newValue": 4}
        }));

        let changed = settings.apply_changes(&diff);
        assert_eq!(changed, vec![ENABLED]);
        assert!(!settings.enabled);
    }

    #[test]
    fn wrong_types_are_ignored() {
        let mut settings = Settings::default();
        let diff = changes(json!({
            "enabled": {"newValue": "no"},
            "targetLanguage": {"newValue": 42}
        }));

        assert!(settings.apply_changes(&diff).is_empty());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn change_serializes_camel_case() {
        let change = StorageChange {
            old_value: None,
            new_value: Some(json!("es")),
        };
        assert_eq!(serde_json::to_value(&change).unwrap(), json!({"newValue": "es"}));
    }

    #[tokio::test]
    async fn store_notifies_only_changed_keys() {
        let store = MemoryStore::with_defaults();
        let mut rx = store.subscribe();

        let mut update = Map::new();
        update.insert(ENABLED.to_string(), json!(true));
        update.insert(TARGET_LANGUAGE.to_string(), json!("es"));
        store.set(update).await.unwrap();

        let diff = rx.recv().await.unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[TARGET_LANGUAGE].old_value, Some(json!("tr")));
        assert_eq!(diff[TARGET_LANGUAGE].new_value, Some(json!("es")));

        // 无变化的写入不通知
        let mut update = Map::new();
        update.insert(ENABLED.to_string(), json!(true));
        assert!(store.set(update).await.unwrap().is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn counter_starts_at_one() {
        let store = MemoryStore::new();
        assert_eq!(increment_counter(&store).await.unwrap(), 1);
        assert_eq!(increment_counter(&store).await.unwrap(), 2);

        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings, Settings::default());
    }
}

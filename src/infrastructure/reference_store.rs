//! 参考文档存储 - 基础设施层
//!
//! 只暴露 load / save 两个能力，具体后端由配置决定：
//! - `FileReferenceStore`：本地 JSON 文件
//! - `KvReferenceStore`：REST 风格的托管 KV 存储（每个槽位一个 key）
//! - `MemoryReferenceStore`：进程内存

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::{Config, StoreBackend};
use crate::error::{AppError, AppResult, ConfigError, StorageError};
use crate::models::{ReferenceContext, ReferenceSlot, SlotName};

/// 参考文档存储端口
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// 读取全部槽位
    async fn load(&self) -> AppResult<ReferenceContext>;

    /// 保存单个槽位，返回保存时间
    async fn save_slot(
        &self,
        slot: SlotName,
        content: String,
        filename: String,
    ) -> AppResult<DateTime<Utc>>;
}

/// 根据配置创建存储后端
pub fn from_config(config: &Config) -> Result<Arc<dyn ReferenceStore>, ConfigError> {
    let store: Arc<dyn ReferenceStore> = match config.reference_store {
        StoreBackend::File => Arc::new(FileReferenceStore::new(&config.reference_file)),
        StoreBackend::Kv => {
            let url = config
                .kv_rest_api_url
                .clone()
                .ok_or_else(|| ConfigError::IncompleteStore {
                    backend: "kv".to_string(),
                    key: "KV_REST_API_URL".to_string(),
                })?;
            let token = config
                .kv_rest_api_token
                .clone()
                .ok_or_else(|| ConfigError::IncompleteStore {
                    backend: "kv".to_string(),
                    key: "KV_REST_API_TOKEN".to_string(),
                })?;
            Arc::new(KvReferenceStore::new(url, token, &config.kv_key_prefix))
        }
        StoreBackend::Memory => Arc::new(MemoryReferenceStore::default()),
    };
    Ok(store)
}

// ========== 本地文件 ==========

/// 本地 JSON 文件存储
pub struct FileReferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileReferenceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_context(&self) -> Result<ReferenceContext, StorageError> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("参考文档文件不存在，返回空上下文: {}", self.path.display());
            return Ok(ReferenceContext::default());
        }

        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(|source| StorageError::Read {
                path: self.path.display().to_string(),
                source,
            })?;

        if raw.trim().is_empty() {
            return Ok(ReferenceContext::default());
        }

        Ok(serde_json::from_str(&raw)?)
    }

    /// 先写临时文件再重命名，避免留下写了一半的文件
    async fn write_context(&self, context: &ReferenceContext) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(context)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await.map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}

#[async_trait]
impl ReferenceStore for FileReferenceStore {
    async fn load(&self) -> AppResult<ReferenceContext> {
        Ok(self.read_context().await?)
    }

    async fn save_slot(
        &self,
        slot: SlotName,
        content: String,
        filename: String,
    ) -> AppResult<DateTime<Utc>> {
        let _guard = self.write_lock.lock().await;

        let mut context = self.read_context().await?;
        let saved_at = Utc::now();
        context.set_slot(
            slot,
            ReferenceSlot {
                content,
                filename,
                saved_at,
            },
        );
        self.write_context(&context).await?;

        info!("✓ 参考文档已保存: {} -> {}", slot, self.path.display());
        Ok(saved_at)
    }
}

// ========== 托管 KV ==========

/// REST 风格的 KV 存储
///
/// 约定：`GET {url}/get/{key}` 返回 `{"result": "<json>" | null}`，
/// `POST {url}/set/{key}` 以请求体作为值。
pub struct KvReferenceStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
    key_prefix: String,
}

#[derive(Debug, Deserialize)]
struct KvGetResponse {
    result: Option<String>,
}

impl KvReferenceStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, key_prefix: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            key_prefix: key_prefix.to_string(),
        }
    }

    fn key(&self, slot: SlotName) -> String {
        format!("{}:{}", self.key_prefix, slot)
    }

    async fn get_slot(&self, slot: SlotName) -> AppResult<Option<ReferenceSlot>> {
        let key = self.key(slot);
        let response = self
            .client
            .get(format!("{}/get/{}", self.base_url, key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::remote_storage(&key, e))?;

        if !response.status().is_success() {
            return Err(AppError::remote_storage(
                &key,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: KvGetResponse = response
            .json()
            .await
            .map_err(|e| AppError::remote_storage(&key, e))?;

        match body.result {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).map_err(StorageError::from)?,
            )),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ReferenceStore for KvReferenceStore {
    async fn load(&self) -> AppResult<ReferenceContext> {
        let mut context = ReferenceContext::default();
        for slot in SlotName::ALL {
            if let Some(value) = self.get_slot(slot).await? {
                context.set_slot(slot, value);
            }
        }
        Ok(context)
    }

    async fn save_slot(
        &self,
        slot: SlotName,
        content: String,
        filename: String,
    ) -> AppResult<DateTime<Utc>> {
        let key = self.key(slot);
        let saved_at = Utc::now();
        let value = serde_json::to_string(&ReferenceSlot {
            content,
            filename,
            saved_at,
        })
        .map_err(StorageError::from)?;

        let response = self
            .client
            .post(format!("{}/set/{}", self.base_url, key))
            .bearer_auth(&self.token)
            .body(value)
            .send()
            .await
            .map_err(|e| AppError::remote_storage(&key, e))?;

        if !response.status().is_success() {
            return Err(AppError::remote_storage(
                &key,
                format!("HTTP {}", response.status()),
            ));
        }

        info!("✓ 参考文档已保存到 KV: {}", key);
        Ok(saved_at)
    }
}

// ========== 内存 ==========

/// 进程内存存储
#[derive(Default)]
pub struct MemoryReferenceStore {
    context: RwLock<ReferenceContext>,
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn load(&self) -> AppResult<ReferenceContext> {
        Ok(self.context.read().await.clone())
    }

    async fn save_slot(
        &self,
        slot: SlotName,
        content: String,
        filename: String,
    ) -> AppResult<DateTime<Utc>> {
        let saved_at = Utc::now();
        self.context.write().await.set_slot(
            slot,
            ReferenceSlot {
                content,
                filename,
                saved_at,
            },
        );
        Ok(saved_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReferenceStore::new(dir.path().join("refs.json"));

        let context = store.load().await.unwrap();
        assert_eq!(context, ReferenceContext::default());
    }

    #[tokio::test]
    async fn test_file_store_saves_slots_independently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("refs.json");
        let store = FileReferenceStore::new(&path);

        store
            .save_slot(SlotName::Primary, "规则".to_string(), "rules.md".to_string())
            .await
            .unwrap();
        let saved_at = store
            .save_slot(SlotName::Guide, "指南".to_string(), "guide.md".to_string())
            .await
            .unwrap();

        // 新实例从磁盘读取
        let reopened = FileReferenceStore::new(&path);
        let context = reopened.load().await.unwrap();

        assert_eq!(context.primary.as_ref().unwrap().content, "规则");
        assert_eq!(context.guide.as_ref().unwrap().filename, "guide.md");
        assert_eq!(context.guide.as_ref().unwrap().saved_at, saved_at);
        assert!(context.supplementary.is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileReferenceStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, AppError::Storage(StorageError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_memory_store_overwrites_slot() {
        let store = MemoryReferenceStore::default();
        store
            .save_slot(SlotName::Primary, "v1".to_string(), "a.md".to_string())
            .await
            .unwrap();
        store
            .save_slot(SlotName::Primary, "v2".to_string(), "b.md".to_string())
            .await
            .unwrap();

        let context = store.load().await.unwrap();
        let primary = context.primary.unwrap();
        assert_eq!(primary.content, "v2");
        assert_eq!(primary.filename, "b.md");
    }

    #[test]
    fn test_kv_backend_requires_url_and_token() {
        let config = Config {
            reference_store: StoreBackend::Kv,
            kv_rest_api_url: Some("https://kv.example.com".to_string()),
            ..Config::default()
        };
        let err = from_config(&config).err().unwrap();
        assert_eq!(
            err,
            ConfigError::IncompleteStore {
                backend: "kv".to_string(),
                key: "KV_REST_API_TOKEN".to_string(),
            }
        );
    }

    #[test]
    fn test_kv_keys_are_prefixed_per_slot() {
        let store = KvReferenceStore::new("https://kv.example.com/", "t", "refs");
        assert_eq!(store.key(SlotName::Supplementary), "refs:supplementary");
        assert_eq!(store.base_url, "https://kv.example.com");
    }
}

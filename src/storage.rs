//! 界面状态存储模块
//!
//! # 设计思路
//!
//! 模拟启动器提供的 LocalStorage：一个键值对 JSON 文件。
//! 目前只保存一项：上次选中的上传器配置（`picgo:user_uploader_config`），
//! 启动时读取，切换下拉框或提交表单时写入。
//!
//! # 实现思路
//!
//! - 文件不存在或内容损坏时按空存储处理，不阻塞界面启动。
//! - 写入时先读出整份数据再整体写回，保留其它键。
//! - 所有可能失败的写操作均返回 `Result`。

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::context::UserUploaderConfig;
use crate::error::AppError;

/// 保存上次选中配置的键名。
pub const UPLOADER_CONFIG_KEY: &str = "picgo:user_uploader_config";
pub const LOCAL_STORAGE_FILE_NAME: &str = "local-storage.json";

/// 基于 JSON 文件的键值存储。
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 在指定目录下使用默认文件名。
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LOCAL_STORAGE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_all(&self) -> Map<String, Value> {
        if !self.path.exists() {
            return Map::new();
        }

        let parsed = fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<Map<String, Value>>(&content).ok());
        match parsed {
            Some(entries) => entries,
            None => {
                log::warn!("本地存储文件不可读或已损坏，按空存储处理: {}", self.path.display());
                Map::new()
            }
        }
    }

    fn save_all(&self, entries: &Map<String, Value>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("创建存储目录失败: {}", e)))?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Storage(format!("序列化存储失败: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.load_all()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.load_all();
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.save_all(&entries)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.load_all();
        if entries.remove(key).is_some() {
            self.save_all(&entries)?;
        }
        Ok(())
    }

    /// 读取上次选中的配置；无法解析时视为未保存。
    pub fn load_selection(&self) -> Option<UserUploaderConfig> {
        let text = self.get_item(UPLOADER_CONFIG_KEY)?;
        match UserUploaderConfig::from_json(&text) {
            Ok(selection) => Some(selection),
            Err(err) => {
                log::warn!("忽略无法解析的已保存配置: {}", err);
                None
            }
        }
    }

    pub fn save_selection(&self, selection: &UserUploaderConfig) -> Result<(), AppError> {
        self.set_item(UPLOADER_CONFIG_KEY, &selection.to_json()?)
    }
}

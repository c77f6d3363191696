//! 偏好设置模块
//!
//! # 设计思路
//!
//! 偏好设置保存在应用数据目录下的 `preferences.json`，字段与启动器扩展的偏好项一一对应：
//! 上传超时、自定义复制格式、代理、npm 路径与镜像、按日期分目录开关及前缀。
//!
//! # 实现思路
//!
//! - 文件不存在或内容损坏时回退到默认值，缺失的字段逐项取默认值。
//! - 超时时间以文本保存，使用时再解析，非法值在使用处报配置错误。
//! - 插件命令需要的环境变量在这里组装：在 `PATH` 前加上 `npm_path`。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::PluginRegistryOptions;
use crate::error::AppError;
use crate::timeout::parse_timeout_ms;

pub const PREFERENCES_FILE_NAME: &str = "preferences.json";
const APP_DIR_NAME: &str = "picgo-uploader";

/// 用户偏好设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// 追加到 `PATH` 前面的 npm 所在目录
    pub npm_path: String,
    /// 上传超时（毫秒，文本）
    pub upload_timeout: String,
    pub npm_mirror: String,
    pub npm_proxy: String,
    /// 写入引擎 `picBed.proxy` 的上传代理
    pub proxy: String,
    /// `custom` 复制格式的模板
    pub custom_format: String,
    pub enable_github_path_by_date: bool,
    pub github_path_prefix: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            npm_path: String::new(),
            upload_timeout: "30000".to_string(),
            npm_mirror: String::new(),
            npm_proxy: String::new(),
            proxy: String::new(),
            custom_format: "![$fileName]($url)".to_string(),
            enable_github_path_by_date: false,
            github_path_prefix: String::new(),
        }
    }
}

impl Preferences {
    pub fn upload_timeout_ms(&self) -> Result<u64, AppError> {
        parse_timeout_ms(&self.upload_timeout)
    }

    /// 去掉首尾空白后的日期目录前缀，空白时返回 `None`。
    pub fn github_path_prefix(&self) -> Option<&str> {
        Some(self.github_path_prefix.trim()).filter(|prefix| !prefix.is_empty())
    }

    pub fn registry_options(&self) -> PluginRegistryOptions {
        fn non_blank(value: &str) -> Option<String> {
            Some(value.trim().to_string()).filter(|v| !v.is_empty())
        }

        PluginRegistryOptions {
            npm_proxy: non_blank(&self.npm_proxy),
            npm_registry: non_blank(&self.npm_mirror),
        }
    }

    /// 当前进程环境变量，`PATH` 前追加 `npm_path`。
    pub fn process_env(&self) -> HashMap<String, String> {
        let base = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        self.process_env_from(base)
    }

    pub fn process_env_from(&self, mut env: HashMap<String, String>) -> HashMap<String, String> {
        let npm_path = self.npm_path.trim();
        if npm_path.is_empty() {
            return env;
        }

        let current = env.get("PATH").cloned().unwrap_or_default();
        let mut paths = vec![PathBuf::from(npm_path)];
        paths.extend(std::env::split_paths(&current));

        match std::env::join_paths(paths) {
            Ok(joined) => {
                env.insert("PATH".to_string(), joined.to_string_lossy().to_string());
            }
            Err(err) => log::warn!("npm_path 无法拼接进 PATH，已忽略: {}", err),
        }
        env
    }
}

/// 应用数据目录，不存在时自动创建。
pub fn app_data_dir() -> Result<PathBuf, AppError> {
    let base = dirs::config_dir()
        .ok_or_else(|| AppError::Preferences("无法定位用户配置目录".to_string()))?;
    let dir = base.join(APP_DIR_NAME);
    fs::create_dir_all(&dir)
        .map_err(|e| AppError::Preferences(format!("创建应用数据目录失败: {}", e)))?;
    Ok(dir)
}

pub fn load_preferences_from_path(path: &Path) -> Preferences {
    if !path.exists() {
        return Preferences::default();
    }

    match fs::read_to_string(path).map(|content| serde_json::from_str::<Preferences>(&content)) {
        Ok(Ok(preferences)) => preferences,
        Ok(Err(err)) => {
            log::warn!("解析偏好设置失败，使用默认值: {}", err);
            Preferences::default()
        }
        Err(err) => {
            log::warn!("读取偏好设置失败，使用默认值: {}", err);
            Preferences::default()
        }
    }
}

pub fn save_preferences_to_path(path: &Path, preferences: &Preferences) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(preferences)
        .map_err(|e| AppError::Preferences(format!("序列化偏好设置失败: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}

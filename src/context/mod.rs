//! # 上传器配置适配层（context）
//!
//! ## 设计思路
//!
//! `UploaderContext` 持有进程内唯一的引擎实例，向界面层提供类型安全的访问入口：
//! 上传器类型、各类型的配置列表、当前生效配置，以及“校验选择项 → 同步到引擎”的流程。
//! 引擎的插件与配置管理能力以薄透传的方式暴露。
//!
//! ## 实现思路
//!
//! - 引擎以 `Arc<E>` 显式注入，不做全局查找；测试每次注入一份新的 `MemoryEngine`。
//! - `is_available` 只返回布尔值，从不报错；`sync` 在唯一一次修改引擎状态之前完成全部校验。
//! - 没有有效选择时的回退规则集中在 `resolve_default`，结果确定、可测试。
//! - 上传前按需把 github 生效配置的 `path` 改写为 `前缀/年/月`，该改写会持久保存。
//! - 上传调用包在 `with_timeout` 中；引擎错误原样透传。
//!
//! ```text
//! 界面
//!  ├─ list_uploader_types / config_list      → 渲染下拉框
//!  ├─ resolve_default → sync                 → 确定并生效当前选择
//!  └─ upload
//!       ├─ apply_dated_path（可选）
//!       └─ with_timeout(engine.upload)
//! ```

mod selection;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use serde_json::json;

use crate::engine::{ImgInfo, PluginInfo, UploadEngine, UploaderConfigField, UploaderConfigItem};
use crate::error::AppError;
use crate::settings::Preferences;
use crate::timeout::{upload_timeout_message, with_timeout};

pub use selection::UserUploaderConfig;

/// 支持按日期分目录的上传器类型。
pub const DATE_PATH_UPLOADER: &str = "github";

/// 生成按日期分目录的路径，例如 `pics/2024/03`。
pub fn dated_path(prefix: &str, date: impl Datelike) -> String {
    format!("{}/{}/{:02}", prefix.trim(), date.year(), date.month())
}

fn require(value: &str, name: &'static str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::MissingParameter(name));
    }
    Ok(())
}

/// 上传器配置适配层。
pub struct UploaderContext<E: UploadEngine> {
    engine: Arc<E>,
    preferences: Preferences,
}

impl<E: UploadEngine> UploaderContext<E> {
    /// 绑定引擎实例，并把代理偏好写入引擎的 `picBed.proxy`。
    pub fn new(engine: Arc<E>, preferences: Preferences) -> Result<Self, AppError> {
        engine.set_config("picBed.proxy", json!(preferences.proxy.trim()))?;
        Ok(Self { engine, preferences })
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn list_uploader_types(&self) -> Vec<String> {
        self.engine.list_uploader_types()
    }

    fn has_type(&self, uploader_type: &str) -> bool {
        self.engine
            .list_uploader_types()
            .iter()
            .any(|t| t == uploader_type)
    }

    fn ensure_type(&self, uploader_type: &str) -> Result<(), AppError> {
        if self.has_type(uploader_type) {
            Ok(())
        } else {
            Err(AppError::UploaderTypeNotFound(uploader_type.to_string()))
        }
    }

    /// 引擎当前使用的上传器类型（`picBed.uploader`，其次 `picBed.current`）。
    pub fn active_uploader_type(&self) -> Option<String> {
        ["picBed.uploader", "picBed.current"]
            .iter()
            .filter_map(|key| self.engine.get_config(key))
            .filter_map(|value| value.as_str().map(str::to_string))
            .find(|value| !value.is_empty())
    }

    pub fn config_list(&self, uploader_type: &str) -> Result<Vec<UploaderConfigItem>, AppError> {
        self.ensure_type(uploader_type)?;
        Ok(self.engine.get_config_list(uploader_type))
    }

    /// 指定类型的生效配置；未指定类型时使用当前上传器类型。
    pub fn active_config(&self, uploader_type: Option<&str>) -> Result<Option<UploaderConfigItem>, AppError> {
        let uploader_type = match uploader_type {
            Some(t) => t.to_string(),
            None => self.active_uploader_type().unwrap_or_default(),
        };
        self.ensure_type(&uploader_type)?;
        Ok(self.engine.get_active_config(&uploader_type))
    }

    /// 选择项是否指向一份存在的配置。不会报错。
    pub fn is_available(&self, selection: &UserUploaderConfig) -> bool {
        self.find_config(selection).is_some()
    }

    /// 选择项指向的配置。
    pub fn find_config(&self, selection: &UserUploaderConfig) -> Option<UploaderConfigItem> {
        let id = selection.id()?;
        if !self.has_type(&selection.uploader_type) {
            return None;
        }
        self.engine
            .get_config_list(&selection.uploader_type)
            .into_iter()
            .find(|item| item.id == id)
    }

    /// 校验选择项并设为引擎的生效配置。
    ///
    /// 校验失败时不修改引擎状态。
    pub fn sync(&self, selection: &UserUploaderConfig) -> Result<(), AppError> {
        let uploader_type = selection.uploader_type.as_str();
        let id = selection
            .id()
            .ok_or_else(|| AppError::ConfigIdMissing(uploader_type.to_string()))?;
        self.ensure_type(uploader_type)?;

        let item = self
            .engine
            .get_config_list(uploader_type)
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| AppError::ConfigNotFound {
                uploader_type: uploader_type.to_string(),
                id: id.to_string(),
            })?;

        self.engine.use_config(uploader_type, &item.config_name)?;
        log::info!("🔄 已同步上传配置：{} [{}]", uploader_type, item.config_name);
        Ok(())
    }

    /// 确定当前应使用的选择项。
    ///
    /// 依次尝试：已保存且可用的选择项；当前上传器类型的生效配置；
    /// 第一个有配置的类型中的第一份配置。都没有时返回 `NoAvailableConfig`。
    pub fn resolve_default(&self, stored: Option<&UserUploaderConfig>) -> Result<UserUploaderConfig, AppError> {
        if let Some(stored) = stored {
            if self.is_available(stored) {
                return Ok(stored.clone());
            }
            log::info!(
                "已保存的配置不可用，回退到默认配置：{} [{}]",
                stored.uploader_type,
                stored.config_id.as_deref().unwrap_or("-")
            );
        }

        if let Some(active_type) = self.active_uploader_type().filter(|t| self.has_type(t)) {
            if let Some(item) = self.engine.get_active_config(&active_type) {
                return Ok(UserUploaderConfig::new(active_type, item.id));
            }
        }

        for uploader_type in self.list_uploader_types() {
            if let Some(first) = self.engine.get_config_list(&uploader_type).into_iter().next() {
                return Ok(UserUploaderConfig::new(uploader_type, first.id));
            }
        }

        Err(AppError::NoAvailableConfig)
    }

    /// 上传文件；`None` 表示上传剪贴板中的图片。
    pub async fn upload(&self, input: Option<Vec<PathBuf>>) -> Result<Vec<ImgInfo>, AppError> {
        self.upload_at(input, Local::now().date_naive()).await
    }

    /// 与 `upload` 相同，日期目录使用给定日期。
    pub async fn upload_at(&self, input: Option<Vec<PathBuf>>, today: NaiveDate) -> Result<Vec<ImgInfo>, AppError> {
        let timeout_ms = self.preferences.upload_timeout_ms()?;
        self.apply_dated_path(today)?;

        log::info!(
            "📤 开始上传 - 类型={} 文件数={}",
            self.active_uploader_type().unwrap_or_default(),
            input.as_ref().map_or_else(|| "clipboard".to_string(), |files| files.len().to_string())
        );

        let engine = Arc::clone(&self.engine);
        with_timeout(
            async move { engine.upload(input).await.map_err(AppError::from) },
            timeout_ms,
            upload_timeout_message(timeout_ms),
        )
        .await
    }

    /// 开启日期目录时，把 github 生效配置的 `path` 改写为 `前缀/年/月` 并保存。
    fn apply_dated_path(&self, today: NaiveDate) -> Result<(), AppError> {
        if !self.preferences.enable_github_path_by_date {
            return Ok(());
        }
        let Some(prefix) = self.preferences.github_path_prefix() else {
            return Ok(());
        };
        if self.active_uploader_type().as_deref() != Some(DATE_PATH_UPLOADER) || !self.has_type(DATE_PATH_UPLOADER) {
            return Ok(());
        }
        let Some(active) = self.engine.get_active_config(DATE_PATH_UPLOADER) else {
            return Ok(());
        };

        let path = dated_path(prefix, today);
        let config_name = active.config_name.clone();
        let updated = active.with_setting("path", path.as_str());
        self.engine
            .create_or_update(DATE_PATH_UPLOADER, &config_name, updated)?;

        log::debug!("📁 github 上传目录已更新为 {}", path);
        Ok(())
    }

    pub fn config_item_details(&self, uploader_type: &str) -> Result<Vec<UploaderConfigField>, AppError> {
        require(uploader_type, "uploader type")?;
        Ok(self.engine.uploader_config_details(uploader_type))
    }

    pub fn create_or_update_config(&self, uploader_type: &str, config: UploaderConfigItem) -> Result<(), AppError> {
        require(uploader_type, "uploader type")?;
        require(&config.config_name, "config name")?;
        let config_name = config.config_name.clone();
        self.engine
            .create_or_update(uploader_type, &config_name, config)?;
        Ok(())
    }

    pub fn copy_config(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), AppError> {
        require(uploader_type, "uploader type")?;
        require(old_name, "old config name")?;
        require(new_name, "new config name")?;
        self.engine.copy(uploader_type, old_name, new_name)?;
        Ok(())
    }

    pub fn rename_config(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), AppError> {
        require(uploader_type, "uploader type")?;
        require(old_name, "old config name")?;
        require(new_name, "new config name")?;
        self.engine.rename(uploader_type, old_name, new_name)?;
        Ok(())
    }

    pub fn remove_config(&self, uploader_type: &str, config_name: &str) -> Result<(), AppError> {
        require(uploader_type, "uploader type")?;
        require(config_name, "config name")?;
        self.engine.remove(uploader_type, config_name)?;
        Ok(())
    }

    pub fn installed_plugins(&self) -> Vec<String> {
        self.engine.installed_plugins()
    }

    pub fn enabled_plugins(&self) -> Vec<String> {
        self.engine.enabled_plugins()
    }

    pub fn plugin(&self, name: &str) -> Option<PluginInfo> {
        self.engine.get_plugin(name)
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.engine.has_plugin(name)
    }

    pub async fn install_plugins(&self, names: &[String]) -> Result<Vec<String>, AppError> {
        let names = plugin_names(names)?;
        let installed = self
            .engine
            .install_plugins(names, self.preferences.registry_options(), self.preferences.process_env())
            .await?;
        Ok(installed)
    }

    pub async fn update_plugins(&self, names: &[String]) -> Result<Vec<String>, AppError> {
        let names = plugin_names(names)?;
        let updated = self
            .engine
            .update_plugins(names, self.preferences.registry_options(), self.preferences.process_env())
            .await?;
        Ok(updated)
    }

    pub async fn uninstall_plugins(&self, names: &[String]) -> Result<Vec<String>, AppError> {
        let names = plugin_names(names)?;
        let removed = self
            .engine
            .uninstall_plugins(names, self.preferences.process_env())
            .await?;
        Ok(removed)
    }
}

fn plugin_names(names: &[String]) -> Result<Vec<String>, AppError> {
    let names: Vec<String> = names
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return Err(AppError::MissingParameter("plugin names"));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_path_pads_month() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");
        assert_eq!(dated_path("pics", date), "pics/2024/03");
        assert_eq!(dated_path("  blog/img ", date), "blog/img/2024/03");
    }

    #[test]
    fn plugin_names_drop_blanks() {
        let names = vec![" picgo-plugin-a ".to_string(), "  ".to_string()];
        assert_eq!(plugin_names(&names).expect("names"), vec!["picgo-plugin-a".to_string()]);
        assert!(matches!(
            plugin_names(&["".to_string()]),
            Err(AppError::MissingParameter(_))
        ));
    }

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("github", "uploader type").is_ok());
        assert!(matches!(require(" ", "uploader type"), Err(AppError::MissingParameter("uploader type"))));
    }
}

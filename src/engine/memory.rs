//! # 进程内引擎
//!
//! ## 设计思路
//!
//! 不依赖本机安装的 PicGo，在内存中模拟引擎的配置、上传与插件状态。
//! 测试每次构造一份新实例注入适配层，互不影响；也可在演示模式下直接使用。
//!
//! ## 实现思路
//!
//! - 全部状态放在 `RwLock<MemoryState>` 中，锁中毒时取回内部数据继续使用。
//! - 上传结果可预先排队（`push_upload_result`），队列为空时按文件名生成回显 URL。
//! - 每次上传与插件操作都会记录调用快照，供测试断言“上传发出时引擎处于什么状态”。

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::{Value, json};

use super::{
    EngineError, ImgInfo, PluginInfo, PluginRegistryOptions, UploadEngine, UploaderConfigField,
    UploaderConfigItem, assign_path, lookup_path, profiles,
};

const ECHO_URL_BASE: &str = "https://memory.picgo.local";

/// 一次上传调用发出时的引擎快照。
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCall {
    pub input: Option<Vec<PathBuf>>,
    pub active_type: Option<String>,
    pub active_config: Option<UploaderConfigItem>,
}

/// 插件操作类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginAction {
    Install,
    Update,
    Uninstall,
}

/// 一次插件操作的入参记录。
#[derive(Debug, Clone, PartialEq)]
pub struct PluginCall {
    pub action: PluginAction,
    pub names: Vec<String>,
    pub options: Option<PluginRegistryOptions>,
    pub env: HashMap<String, String>,
}

#[derive(Default)]
struct MemoryState {
    config: Value,
    types: Vec<String>,
    profiles: HashMap<String, Vec<UploaderConfigItem>>,
    default_ids: HashMap<String, String>,
    fields: HashMap<String, Vec<UploaderConfigField>>,
    plugins: Vec<PluginInfo>,
    scripted_uploads: VecDeque<Result<Vec<ImgInfo>, String>>,
    upload_delay: Option<Duration>,
    upload_calls: Vec<UploadCall>,
    plugin_calls: Vec<PluginCall>,
}

impl MemoryState {
    fn active_type(&self) -> Option<String> {
        lookup_path(&self.config, "picBed.uploader")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn active_config(&self, uploader_type: &str) -> Option<UploaderConfigItem> {
        let list = self.profiles.get(uploader_type)?;
        let default_id = self.default_ids.get(uploader_type).map(String::as_str);
        profiles::active(list, default_id).cloned()
    }

    fn list_mut(&mut self, uploader_type: &str) -> &mut Vec<UploaderConfigItem> {
        if !self.types.iter().any(|t| t == uploader_type) {
            self.types.push(uploader_type.to_string());
        }
        self.profiles.entry(uploader_type.to_string()).or_default()
    }

    fn existing_list_mut(
        &mut self,
        uploader_type: &str,
        config_name: &str,
    ) -> Result<&mut Vec<UploaderConfigItem>, EngineError> {
        self.profiles
            .get_mut(uploader_type)
            .ok_or_else(|| profiles::not_found(uploader_type, config_name))
    }
}

/// 进程内上传引擎。
#[derive(Default)]
pub struct MemoryEngine {
    state: RwLock<MemoryState>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册上传器类型及其配置；第一份配置成为默认配置。
    pub fn with_uploader(self, uploader_type: &str, items: Vec<UploaderConfigItem>) -> Self {
        {
            let mut state = self.write();
            if let Some(first) = items.first() {
                state
                    .default_ids
                    .insert(uploader_type.to_string(), first.id.clone());
            }
            state.list_mut(uploader_type).extend(items);
        }
        self
    }

    /// 设置当前上传器类型（`picBed.uploader`）。
    pub fn with_active_uploader(self, uploader_type: &str) -> Self {
        assign_path(&mut self.write().config, "picBed.uploader", json!(uploader_type));
        self
    }

    pub fn with_config_fields(self, uploader_type: &str, fields: Vec<UploaderConfigField>) -> Self {
        self.write()
            .fields
            .insert(uploader_type.to_string(), fields);
        self
    }

    pub fn with_plugin(self, name: &str, enabled: bool) -> Self {
        self.write().plugins.push(PluginInfo {
            name: name.to_string(),
            enabled,
        });
        self
    }

    /// 预置下一次上传的结果；`Err` 中的字符串会作为引擎上传错误返回。
    pub fn push_upload_result(&self, result: Result<Vec<ImgInfo>, String>) {
        self.write().scripted_uploads.push_back(result);
    }

    /// 每次上传前等待的时长，用于模拟慢速图床。
    pub fn set_upload_delay(&self, delay: Duration) {
        self.write().upload_delay = Some(delay);
    }

    pub fn upload_calls(&self) -> Vec<UploadCall> {
        self.read().upload_calls.clone()
    }

    pub fn plugin_calls(&self) -> Vec<PluginCall> {
        self.read().plugin_calls.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn echo_results(input: &Option<Vec<PathBuf>>) -> Vec<ImgInfo> {
        let paths = match input {
            Some(paths) => paths.clone(),
            None => vec![PathBuf::from("clipboard.png")],
        };

        paths
            .iter()
            .map(|path| {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| "image.png".to_string());
                let extname = path
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()));
                ImgInfo {
                    img_url: Some(format!("{}/{}", ECHO_URL_BASE, file_name)),
                    file_name: Some(file_name),
                    extname,
                    error: None,
                }
            })
            .collect()
    }

    fn record_plugin_call(
        &self,
        action: PluginAction,
        names: &[String],
        options: Option<PluginRegistryOptions>,
        env: HashMap<String, String>,
    ) {
        self.write().plugin_calls.push(PluginCall {
            action,
            names: names.to_vec(),
            options,
            env,
        });
    }
}

impl UploadEngine for MemoryEngine {
    fn get_config(&self, key: &str) -> Option<Value> {
        lookup_path(&self.read().config, key).cloned()
    }

    fn set_config(&self, key: &str, value: Value) -> Result<(), EngineError> {
        assign_path(&mut self.write().config, key, value);
        Ok(())
    }

    fn list_uploader_types(&self) -> Vec<String> {
        self.read().types.clone()
    }

    fn get_config_list(&self, uploader_type: &str) -> Vec<UploaderConfigItem> {
        self.read()
            .profiles
            .get(uploader_type)
            .cloned()
            .unwrap_or_default()
    }

    fn get_active_config(&self, uploader_type: &str) -> Option<UploaderConfigItem> {
        self.read().active_config(uploader_type)
    }

    fn use_config(&self, uploader_type: &str, config_name: &str) -> Result<(), EngineError> {
        let mut state = self.write();
        let id = {
            let list = state.profiles.get(uploader_type).map(Vec::as_slice).unwrap_or_default();
            profiles::find_by_name(list, uploader_type, config_name)?.id.clone()
        };

        state.default_ids.insert(uploader_type.to_string(), id);
        assign_path(&mut state.config, "picBed.uploader", json!(uploader_type));
        assign_path(&mut state.config, "picBed.current", json!(uploader_type));
        Ok(())
    }

    fn uploader_config_details(&self, uploader_type: &str) -> Vec<UploaderConfigField> {
        self.read()
            .fields
            .get(uploader_type)
            .cloned()
            .unwrap_or_default()
    }

    fn create_or_update(
        &self,
        uploader_type: &str,
        config_name: &str,
        config: UploaderConfigItem,
    ) -> Result<(), EngineError> {
        let mut state = self.write();
        let id = profiles::upsert(state.list_mut(uploader_type), config_name, config);
        state
            .default_ids
            .entry(uploader_type.to_string())
            .or_insert(id);
        Ok(())
    }

    fn copy(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), EngineError> {
        let mut state = self.write();
        let list = state.existing_list_mut(uploader_type, old_name)?;
        profiles::copy(list, uploader_type, old_name, new_name)
    }

    fn rename(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), EngineError> {
        let mut state = self.write();
        let list = state.existing_list_mut(uploader_type, old_name)?;
        profiles::rename(list, uploader_type, old_name, new_name)
    }

    fn remove(&self, uploader_type: &str, config_name: &str) -> Result<(), EngineError> {
        let mut state = self.write();
        let default_id = state.default_ids.get(uploader_type).cloned();
        let list = state.existing_list_mut(uploader_type, config_name)?;
        let next_default = profiles::remove(
            list,
            default_id.as_deref(),
            uploader_type,
            config_name,
        )?;

        match next_default {
            Some(id) => {
                state.default_ids.insert(uploader_type.to_string(), id);
            }
            None => {
                state.default_ids.remove(uploader_type);
            }
        }
        Ok(())
    }

    async fn upload(&self, input: Option<Vec<PathBuf>>) -> Result<Vec<ImgInfo>, EngineError> {
        let delay = {
            let mut state = self.write();
            let active_type = state.active_type();
            let active_config = active_type
                .as_deref()
                .and_then(|t| state.active_config(t));
            state.upload_calls.push(UploadCall {
                input: input.clone(),
                active_type,
                active_config,
            });
            state.upload_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.write().scripted_uploads.pop_front();
        match scripted {
            Some(Ok(results)) => Ok(results),
            Some(Err(message)) => Err(EngineError::Upload(message)),
            None => Ok(Self::echo_results(&input)),
        }
    }

    fn installed_plugins(&self) -> Vec<String> {
        self.read().plugins.iter().map(|p| p.name.clone()).collect()
    }

    fn enabled_plugins(&self) -> Vec<String> {
        self.read()
            .plugins
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.clone())
            .collect()
    }

    fn get_plugin(&self, name: &str) -> Option<PluginInfo> {
        self.read().plugins.iter().find(|p| p.name == name).cloned()
    }

    fn has_plugin(&self, name: &str) -> bool {
        self.read().plugins.iter().any(|p| p.name == name)
    }

    async fn install_plugins(
        &self,
        names: Vec<String>,
        options: PluginRegistryOptions,
        env: HashMap<String, String>,
    ) -> Result<Vec<String>, EngineError> {
        self.record_plugin_call(PluginAction::Install, &names, Some(options), env);
        let mut state = self.write();
        for name in &names {
            if !state.plugins.iter().any(|p| &p.name == name) {
                state.plugins.push(PluginInfo {
                    name: name.clone(),
                    enabled: true,
                });
            }
        }
        Ok(names)
    }

    async fn update_plugins(
        &self,
        names: Vec<String>,
        options: PluginRegistryOptions,
        env: HashMap<String, String>,
    ) -> Result<Vec<String>, EngineError> {
        self.record_plugin_call(PluginAction::Update, &names, Some(options), env);
        let state = self.read();
        if let Some(missing) = names.iter().find(|n| !state.plugins.iter().any(|p| &p.name == *n)) {
            return Err(EngineError::Plugin(format!("plugin '{}' is not installed", missing)));
        }
        Ok(names)
    }

    async fn uninstall_plugins(
        &self,
        names: Vec<String>,
        env: HashMap<String, String>,
    ) -> Result<Vec<String>, EngineError> {
        self.record_plugin_call(PluginAction::Uninstall, &names, None, env);
        self.write().plugins.retain(|p| !names.contains(&p.name));
        Ok(names)
    }
}

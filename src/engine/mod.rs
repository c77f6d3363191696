//! # 上传引擎接口（engine）
//!
//! ## 设计思路
//!
//! 真正的上传、配置存储与插件管理都由外部引擎（PicGo）完成，这里只定义一个窄接口
//! `UploadEngine`，适配层只通过它与引擎交互。
//!
//! - `model`：引擎侧数据结构，字段名与 PicGo 配置文件一致
//! - `error`：引擎错误
//! - `memory`：进程内引擎，测试和演示时注入，每个测试一份新实例
//! - `picgo_cli`：基于 PicGo 的 `config.json` 与 `picgo` 命令行的真实引擎
//!
//! ## 实现思路
//!
//! 引擎在进程内只构造一次，由调用方显式注入适配层（`Arc<E>`），不做隐式全局查找。
//! 实现方自行用 `RwLock` 保护内部状态：超时竞速中落败的上传任务仍可能在后台访问引擎。

mod error;
pub mod memory;
mod model;
mod profiles;
pub mod picgo_cli;

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;

use serde_json::Value;

pub use error::EngineError;
pub use memory::MemoryEngine;
pub use model::{
    ImgInfo, PluginInfo, PluginRegistryOptions, UploaderConfigField, UploaderConfigItem,
};
pub use picgo_cli::PicGoCliEngine;

/// 外部上传引擎需要提供的能力。
pub trait UploadEngine: Send + Sync + 'static {
    /// 读取点分路径配置，例如 `picBed.uploader`。
    fn get_config(&self, key: &str) -> Option<Value>;

    /// 写入点分路径配置，中间层级不存在时自动创建。
    fn set_config(&self, key: &str, value: Value) -> Result<(), EngineError>;

    /// 已注册的上传器类型。
    fn list_uploader_types(&self) -> Vec<String>;

    /// 指定类型下保存的全部配置。
    fn get_config_list(&self, uploader_type: &str) -> Vec<UploaderConfigItem>;

    /// 指定类型当前生效的配置。
    fn get_active_config(&self, uploader_type: &str) -> Option<UploaderConfigItem>;

    /// 将指定名称的配置设为该类型的生效配置，并把该类型设为当前上传器。
    fn use_config(&self, uploader_type: &str, config_name: &str) -> Result<(), EngineError>;

    /// 上传器声明的配置字段。
    fn uploader_config_details(&self, uploader_type: &str) -> Vec<UploaderConfigField>;

    /// 按名称创建或更新配置。
    fn create_or_update(
        &self,
        uploader_type: &str,
        config_name: &str,
        config: UploaderConfigItem,
    ) -> Result<(), EngineError>;

    fn copy(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), EngineError>;

    fn rename(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), EngineError>;

    fn remove(&self, uploader_type: &str, config_name: &str) -> Result<(), EngineError>;

    /// 上传文件；`None` 表示从剪贴板读取图片。
    fn upload(
        &self,
        input: Option<Vec<PathBuf>>,
    ) -> impl Future<Output = Result<Vec<ImgInfo>, EngineError>> + Send;

    /// 已安装的全部插件名。
    fn installed_plugins(&self) -> Vec<String>;

    /// 已启用的插件名。
    fn enabled_plugins(&self) -> Vec<String>;

    fn get_plugin(&self, name: &str) -> Option<PluginInfo>;

    fn has_plugin(&self, name: &str) -> bool;

    /// 安装插件，返回引擎报告的插件名。
    fn install_plugins(
        &self,
        names: Vec<String>,
        options: PluginRegistryOptions,
        env: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;

    fn update_plugins(
        &self,
        names: Vec<String>,
        options: PluginRegistryOptions,
        env: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;

    fn uninstall_plugins(
        &self,
        names: Vec<String>,
        env: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;
}

/// 按点分路径读取 JSON 值。
pub(crate) fn lookup_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// 按点分路径写入 JSON 值，途经的非对象节点会被替换为对象。
pub(crate) fn assign_path(root: &mut Value, key: &str, value: Value) {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut node = root;
    for segment in segments {
        if !node.is_object() {
            *node = Value::Object(Default::default());
        }
        let Some(map) = node.as_object_mut() else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }

    if !node.is_object() {
        *node = Value::Object(Default::default());
    }
    if let Some(map) = node.as_object_mut() {
        map.insert(last.to_string(), value);
    }
}

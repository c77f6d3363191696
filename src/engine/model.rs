//! # 引擎数据模型
//!
//! 字段命名与 PicGo 的 `config.json` 保持一致（`_id`、`_configName`、`imgUrl` 等），
//! 以便直接读写引擎的配置文件。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 某个上传器类型下保存的一份配置。
///
/// 除了 `_` 前缀的元数据外，其余字段都是该类型自己的设置（如 `repo`、`path`），
/// 以扁平方式保存在 `settings` 中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploaderConfigItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_configName")]
    pub config_name: String,
    #[serde(rename = "_createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl UploaderConfigItem {
    pub fn new(id: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config_name: config_name.into(),
            created_at: None,
            updated_at: None,
            settings: Map::new(),
        }
    }

    pub fn with_setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }
}

/// 上传器声明的一项配置字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploaderConfigField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// 单个文件的上传结果。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImgInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImgInfo {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            img_url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// 已安装插件的信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub enabled: bool,
}

/// 插件安装 / 更新时转发给 npm 的代理与镜像。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRegistryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm_registry: Option<String>,
}

//! # 配置选择项
//!
//! `UserUploaderConfig` 是界面层“当前选中哪份配置”的轻量引用，按 id 识别配置，
//! 名称只用于展示。它以 JSON 文本形式存入本地存储，也作为下拉框选项的值。

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 用户选中的上传器配置引用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUploaderConfig {
    pub uploader_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
}

impl UserUploaderConfig {
    pub fn new(uploader_type: impl Into<String>, config_id: impl Into<String>) -> Self {
        Self {
            uploader_type: uploader_type.into(),
            config_id: Some(config_id.into()),
        }
    }

    /// 非空的配置 id。
    pub fn id(&self) -> Option<&str> {
        self.config_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self).map_err(|e| AppError::InvalidSelection(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        serde_json::from_str(text).map_err(|e| AppError::InvalidSelection(format!("{}: {}", e, text)))
    }
}

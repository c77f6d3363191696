//! # 引擎错误
//!
//! 引擎侧的失败统一收敛到 `EngineError`，上层原样透传给调用方。

/// 上传引擎错误类型。
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Config '{config_name}' not found for uploader type '{uploader_type}'")]
    ConfigNameNotFound {
        uploader_type: String,
        config_name: String,
    },

    #[error("Config '{config_name}' already exists for uploader type '{uploader_type}'")]
    ConfigNameExists {
        uploader_type: String,
        config_name: String,
    },

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Plugin operation failed: {0}")]
    Plugin(String),

    #[error("Failed to run picgo: {0}")]
    Process(String),
}

//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，所有对外操作统一返回 `Result<T, AppError>`。
//! 校验失败各自对应独立分支，并在消息里带上出错的上传器类型或配置 id，
//! 调用方可以按分支匹配，也可以直接展示给用户。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 引擎错误通过 `From` 透传，消息保持原样，不做二次包装。
//! - `kind()` 把错误归入配置、上传、插件与用户输入几类，展示层据此决定
//!   是整屏报错、失败通知还是即时提示；错误本身不携带任何 UI 动作。
//!   引擎错误按内部分支归类，例如重名属于用户输入，配置文件损坏属于配置错误。
//! - 实现 `Serialize` 将错误序列化为字符串，方便宿主界面透传。

use serde::Serialize;

use crate::engine::EngineError;

/// 配置类错误附带的安装指引地址。
pub const SETUP_GUIDE_URL: &str = "https://docs.picgo.app/core/";

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 上传器类型未在引擎中注册
    #[error("Uploader type '{0}' not found")]
    UploaderTypeNotFound(String),

    /// 选择项缺少配置 id
    #[error("Config id is missing for uploader type '{0}'")]
    ConfigIdMissing(String),

    /// 该类型下不存在指定 id 的配置
    #[error("Config Id '{id}' not found for uploader type '{uploader_type}'")]
    ConfigNotFound { uploader_type: String, id: String },

    /// 所有类型下都没有可用配置
    #[error("No available config")]
    NoAvailableConfig,

    /// 超时时间不是正数
    #[error("Invalid upload timeout '{0}', expected a positive number of milliseconds")]
    InvalidTimeout(String),

    /// 持久化或下拉框中的选择项无法解析
    #[error("Invalid uploader selection: {0}")]
    InvalidSelection(String),

    /// 偏好设置文件读写失败
    #[error("Preferences error: {0}")]
    Preferences(String),

    /// 透传操作缺少必要参数
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// 提交的文件中没有图片
    #[error("Please pick image files.")]
    NoImageFiles,

    /// 上传超时，消息由调用方给定
    #[error("{0}")]
    Timeout(String),

    /// 上传任务在返回结果前异常终止
    #[error("Upload task aborted: {0}")]
    TaskAborted(String),

    /// 引擎没有返回任何结果
    #[error("No result returned")]
    NoResult,

    /// 引擎返回了结果但没有任何 URL
    #[error("No url result returned")]
    NoUrlResult,

    /// 引擎错误，原样透传
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// 剪贴板读写操作失败
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// 界面状态存储不可用
    #[error("Storage error: {0}")]
    Storage(String),

    /// 文件系统 I/O 错误
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

/// 错误分类，决定展示方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 阻塞式整屏报错，附带安装指引
    Configuration,
    /// 上传失败通知，可复制完整错误信息
    Upload,
    /// 插件安装、更新或卸载失败
    Plugin,
    /// 即时提示，不修改任何状态
    UserInput,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UploaderTypeNotFound(_)
            | Self::ConfigIdMissing(_)
            | Self::ConfigNotFound { .. }
            | Self::NoAvailableConfig
            | Self::InvalidTimeout(_)
            | Self::InvalidSelection(_)
            | Self::Preferences(_)
            | Self::Storage(_)
            | Self::Io(_) => ErrorKind::Configuration,
            Self::Timeout(_)
            | Self::TaskAborted(_)
            | Self::NoResult
            | Self::NoUrlResult
            | Self::Clipboard(_) => ErrorKind::Upload,
            Self::NoImageFiles | Self::MissingParameter(_) => ErrorKind::UserInput,
            Self::Engine(err) => match err {
                EngineError::ConfigNameNotFound { .. } | EngineError::ConfigNameExists { .. } => {
                    ErrorKind::UserInput
                }
                EngineError::ConfigFile(_) => ErrorKind::Configuration,
                EngineError::Upload(_) | EngineError::Process(_) => ErrorKind::Upload,
                EngineError::Plugin(_) => ErrorKind::Plugin,
            },
        }
    }

    /// 配置类错误返回安装指引地址，其余返回 `None`。
    pub fn help_url(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::Configuration => Some(SETUP_GUIDE_URL),
            _ => None,
        }
    }
}

/// 宿主界面要求错误可序列化，这里直接输出人类可读的消息。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

//! 上传处理模块
//!
//! # 设计思路
//!
//! 界面只有一个上传入口：提交表单（上传文件）或快捷上传剪贴板图片。
//! 本模块把一次上传串起来：恢复 / 切换选中的配置、过滤图片文件、调用适配层上传、
//! 检查结果，失败时生成可展示、可复制的失败报告。
//!
//! # 实现思路
//!
//! - 输入校验先于一切状态修改：没有图片文件时直接返回 `NoImageFiles`。
//! - 引擎返回空结果或全部没有 URL 时视为失败，不会静默报告成功。
//! - 错误本身不携带 UI 动作，`UploadFailure` 由调用方按需从错误生成。

use std::path::PathBuf;

use serde::Serialize;

use crate::context::{UploaderContext, UserUploaderConfig};
use crate::engine::{ImgInfo, UploadEngine};
use crate::error::AppError;
use crate::form::{image_files, UploadFormData};
use crate::storage::LocalStorage;

pub const UPLOAD_FAILED_TITLE: &str = "Upload Failed";

/// 上传失败时展示给用户的报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub title: String,
    pub message: String,
    /// “复制错误日志”动作写入剪贴板的完整信息
    pub detail: String,
}

impl UploadFailure {
    pub fn from_error(err: &AppError) -> Self {
        Self {
            title: UPLOAD_FAILED_TITLE.to_string(),
            message: err.to_string(),
            detail: format!("{:#?}", err),
        }
    }
}

/// 检查引擎返回的结果：至少一项，且至少一项带 URL。
pub fn check_results(results: Vec<ImgInfo>) -> Result<Vec<ImgInfo>, AppError> {
    if results.is_empty() {
        return Err(AppError::NoResult);
    }
    if !results.iter().any(|img| img.img_url.as_deref().is_some_and(|url| !url.is_empty())) {
        return Err(AppError::NoUrlResult);
    }
    Ok(results)
}

/// 上传提交的文件，非图片文件会被过滤掉。
pub async fn upload_files<E: UploadEngine>(
    ctx: &UploaderContext<E>,
    files: &[PathBuf],
) -> Result<Vec<ImgInfo>, AppError> {
    let images = image_files(files);
    if images.is_empty() {
        return Err(AppError::NoImageFiles);
    }
    if images.len() < files.len() {
        log::info!("已忽略 {} 个非图片文件", files.len() - images.len());
    }

    let results = ctx.upload(Some(images)).await;
    finish(results)
}

/// 上传剪贴板中的图片。
pub async fn upload_clipboard<E: UploadEngine>(ctx: &UploaderContext<E>) -> Result<Vec<ImgInfo>, AppError> {
    let results = ctx.upload(None).await;
    finish(results)
}

fn finish(results: Result<Vec<ImgInfo>, AppError>) -> Result<Vec<ImgInfo>, AppError> {
    match results.and_then(check_results) {
        Ok(images) => {
            log::info!("✅ 上传成功，共 {} 项", images.len());
            Ok(images)
        }
        Err(err) => {
            log::error!("❌ 上传失败: {}", err);
            Err(err)
        }
    }
}

/// 启动时恢复选中的配置：读取已保存的选择项，回退到默认配置，同步到引擎并保存。
pub fn restore_selection<E: UploadEngine>(
    ctx: &UploaderContext<E>,
    storage: &LocalStorage,
) -> Result<UserUploaderConfig, AppError> {
    let stored = storage.load_selection();
    let selection = ctx.resolve_default(stored.as_ref())?;
    ctx.sync(&selection)?;

    if stored.as_ref() != Some(&selection) {
        storage.save_selection(&selection)?;
    }
    Ok(selection)
}

/// 只读地计算当前会选中的配置，不同步引擎也不写存储。没有任何可用配置时返回 `None`。
pub fn peek_selection<E: UploadEngine>(
    ctx: &UploaderContext<E>,
    storage: &LocalStorage,
) -> Result<Option<UserUploaderConfig>, AppError> {
    match ctx.resolve_default(storage.load_selection().as_ref()) {
        Ok(selection) => Ok(Some(selection)),
        Err(AppError::NoAvailableConfig) => Ok(None),
        Err(err) => Err(err),
    }
}

/// 用户切换下拉框：校验并同步到引擎，成功后保存。
pub fn select<E: UploadEngine>(
    ctx: &UploaderContext<E>,
    storage: &LocalStorage,
    selection: &UserUploaderConfig,
) -> Result<(), AppError> {
    ctx.sync(selection)?;
    storage.save_selection(selection)
}

/// 处理表单提交：先检查文件，再切换到表单中的配置并上传。
pub async fn submit<E: UploadEngine>(
    ctx: &UploaderContext<E>,
    storage: &LocalStorage,
    form: &UploadFormData,
) -> Result<Vec<ImgInfo>, AppError> {
    if form.image_files().is_empty() {
        return Err(AppError::NoImageFiles);
    }
    select(ctx, storage, &form.uploader_config)?;
    upload_files(ctx, &form.files).await
}

/// 上传提示中展示的配置描述，例如 `github [Blog]`。
pub fn describe_selection<E: UploadEngine>(ctx: &UploaderContext<E>, selection: &UserUploaderConfig) -> String {
    match ctx.find_config(selection) {
        Some(item) => format!("{} [{}]", selection.uploader_type, item.config_name),
        None => selection.uploader_type.clone(),
    }
}

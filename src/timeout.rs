//! # 超时竞速
//!
//! ## 设计思路
//!
//! 上传调用和计时器同时启动，谁先完成就返回谁的结果。
//! 这是竞速而不是取消：计时器先到时，原操作仍在后台跑完，结果被丢弃。
//!
//! ## 实现思路
//!
//! - 操作通过 `tokio::spawn` 放到运行时上独立执行，对 `JoinHandle` 加 `tokio::time::timeout`。
//! - 超时后 `JoinHandle` 随之被丢弃，任务与调用方分离但不会被中止。
//! - 超时时长必须为正数；0 或无法解析的值直接报配置错误，不会悄悄关闭超时。

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// 在 `timeout_ms` 毫秒内等待 `operation` 完成。
///
/// 操作先完成时原样返回其结果（包括错误）；计时器先到时返回
/// `AppError::Timeout(timeout_message)`。
pub async fn with_timeout<F, T>(
    operation: F,
    timeout_ms: u64,
    timeout_message: impl Into<String>,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    if timeout_ms == 0 {
        return Err(AppError::InvalidTimeout(timeout_ms.to_string()));
    }

    let handle = tokio::spawn(operation);
    match tokio::time::timeout(Duration::from_millis(timeout_ms), handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(AppError::TaskAborted(join_error.to_string())),
        Err(_) => {
            let message = timeout_message.into();
            log::warn!("⏱️ 操作超时（{}ms），后台任务继续运行：{}", timeout_ms, message);
            Err(AppError::Timeout(message))
        }
    }
}

/// 解析偏好设置中以文本保存的超时毫秒数。
///
/// 小数部分向零截断；截断后仍须为正数。
pub fn parse_timeout_ms(text: &str) -> Result<u64, AppError> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| AppError::InvalidTimeout(trimmed.to_string()))?;

    if !value.is_finite() || value < 1.0 {
        return Err(AppError::InvalidTimeout(trimmed.to_string()));
    }

    Ok(value.trunc() as u64)
}

/// 上传超时提示文案，例如 `Upload timeout: 1.5s`。
pub fn upload_timeout_message(timeout_ms: u64) -> String {
    format!("Upload timeout: {}s", timeout_ms as f64 / 1000.0)
}

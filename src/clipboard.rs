//! # 剪贴板写入
//!
//! ## 设计思路
//!
//! 上传完成后把格式化好的链接写回系统剪贴板；上传失败时把完整错误信息写入剪贴板，
//! 方便用户反馈问题。剪贴板读取（上传剪贴板图片）由引擎自己完成，这里只负责写文本。
//!
//! ## 实现思路
//!
//! - 使用 `arboard` 写入纯文本。
//! - 剪贴板在其他程序占用时可能短暂不可用，失败后做有限次数的退避重试。
//! - 异步调用方通过 `spawn_blocking` 执行写入，避免阻塞运行时。

use std::time::Duration;

use crate::error::AppError;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 50;

fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS << attempt.min(4))
}

/// 将纯文本写入剪贴板。
pub fn copy_text(text: &str) -> Result<(), AppError> {
    let mut last_error = String::new();

    for attempt in 0..MAX_ATTEMPTS {
        let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text.to_string()));
        match result {
            Ok(()) => {
                log::debug!("📋 已写入剪贴板（{} 字节）", text.len());
                return Ok(());
            }
            Err(e) => {
                last_error = e.to_string();
                log::warn!("剪贴板写入失败（第 {} 次）: {}", attempt + 1, last_error);
                if attempt + 1 < MAX_ATTEMPTS {
                    std::thread::sleep(retry_delay(attempt));
                }
            }
        }
    }

    Err(AppError::Clipboard(last_error))
}

/// `copy_text` 的异步版本，在阻塞线程中执行。
pub async fn copy_text_async(text: String) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || copy_text(&text))
        .await
        .map_err(|e| AppError::Clipboard(format!("剪贴板任务异常终止: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_grows_and_is_capped() {
        assert_eq!(retry_delay(0), Duration::from_millis(50));
        assert_eq!(retry_delay(1), Duration::from_millis(100));
        assert_eq!(retry_delay(10), Duration::from_millis(800));
    }
}

//! # 配置列表操作
//!
//! 两种引擎共用的配置增删改规则：名称在同一类型内唯一，新配置分配新 id，
//! 删除默认配置时由第一份剩余配置接替。

use chrono::Utc;

use super::{EngineError, UploaderConfigItem};

pub(crate) fn not_found(uploader_type: &str, config_name: &str) -> EngineError {
    EngineError::ConfigNameNotFound {
        uploader_type: uploader_type.to_string(),
        config_name: config_name.to_string(),
    }
}

fn already_exists(uploader_type: &str, config_name: &str) -> EngineError {
    EngineError::ConfigNameExists {
        uploader_type: uploader_type.to_string(),
        config_name: config_name.to_string(),
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 当前生效配置：`default_id` 命中的那份，否则第一份。
pub(crate) fn active<'a>(
    list: &'a [UploaderConfigItem],
    default_id: Option<&str>,
) -> Option<&'a UploaderConfigItem> {
    list.iter()
        .find(|item| Some(item.id.as_str()) == default_id)
        .or_else(|| list.first())
}

/// 按名称创建或合并更新，返回被写入配置的 id。
///
/// 新建时若 `config.id` 为空则分配 uuid。
pub(crate) fn upsert(
    list: &mut Vec<UploaderConfigItem>,
    config_name: &str,
    config: UploaderConfigItem,
) -> String {
    let now = now_millis();

    if let Some(existing) = list.iter_mut().find(|item| item.config_name == config_name) {
        existing.settings.extend(config.settings);
        existing.updated_at = Some(now);
        return existing.id.clone();
    }

    let id = if config.id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        config.id
    };
    list.push(UploaderConfigItem {
        id: id.clone(),
        config_name: config_name.to_string(),
        created_at: Some(now),
        updated_at: Some(now),
        settings: config.settings,
    });
    id
}

pub(crate) fn copy(
    list: &mut Vec<UploaderConfigItem>,
    uploader_type: &str,
    old_name: &str,
    new_name: &str,
) -> Result<(), EngineError> {
    if list.iter().any(|item| item.config_name == new_name) {
        return Err(already_exists(uploader_type, new_name));
    }
    let settings = list
        .iter()
        .find(|item| item.config_name == old_name)
        .map(|item| item.settings.clone())
        .ok_or_else(|| not_found(uploader_type, old_name))?;

    let now = now_millis();
    list.push(UploaderConfigItem {
        id: uuid::Uuid::new_v4().to_string(),
        config_name: new_name.to_string(),
        created_at: Some(now),
        updated_at: Some(now),
        settings,
    });
    Ok(())
}

pub(crate) fn rename(
    list: &mut [UploaderConfigItem],
    uploader_type: &str,
    old_name: &str,
    new_name: &str,
) -> Result<(), EngineError> {
    if list.iter().any(|item| item.config_name == new_name) {
        return Err(already_exists(uploader_type, new_name));
    }
    let item = list
        .iter_mut()
        .find(|item| item.config_name == old_name)
        .ok_or_else(|| not_found(uploader_type, old_name))?;
    item.config_name = new_name.to_string();
    item.updated_at = Some(now_millis());
    Ok(())
}

/// 删除配置，返回新的默认 id（`None` 表示列表已空）。
pub(crate) fn remove(
    list: &mut Vec<UploaderConfigItem>,
    default_id: Option<&str>,
    uploader_type: &str,
    config_name: &str,
) -> Result<Option<String>, EngineError> {
    let index = list
        .iter()
        .position(|item| item.config_name == config_name)
        .ok_or_else(|| not_found(uploader_type, config_name))?;
    let removed = list.remove(index);

    if default_id == Some(removed.id.as_str()) || default_id.is_none() {
        return Ok(list.first().map(|item| item.id.clone()));
    }
    Ok(default_id.map(str::to_string))
}

pub(crate) fn find_by_name<'a>(
    list: &'a [UploaderConfigItem],
    uploader_type: &str,
    config_name: &str,
) -> Result<&'a UploaderConfigItem, EngineError> {
    list.iter()
        .find(|item| item.config_name == config_name)
        .ok_or_else(|| not_found(uploader_type, config_name))
}

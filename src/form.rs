//! 表单数据模块
//!
//! # 设计思路
//!
//! 上传表单由三部分组成：按上传器类型分组的配置下拉框、文件选择器、提交按钮。
//! 本模块只负责表单的数据侧：下拉框模型、提交值解析与图片文件过滤，渲染由宿主完成。
//!
//! # 实现思路
//!
//! - 下拉框每项的值是序列化后的 `UserUploaderConfig`，标题为配置名。
//! - 提交值是扁平的字段表：`uploader_config` 为单个值，`files` 为多个路径。
//! - 图片判断只看扩展名，大小写不敏感。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::context::{UploaderContext, UserUploaderConfig};
use crate::engine::UploadEngine;
use crate::error::AppError;

pub const UPLOADER_CONFIG_FIELD: &str = "uploader_config";
pub const FILES_FIELD: &str = "files";

static IMAGE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|webp|bmp|svg|ico|tiff?|heic|avif)$").unwrap()
});

/// 下拉框中的一项配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownItem {
    pub title: String,
    pub value: String,
}

/// 下拉框中一个上传器类型的分组。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownSection {
    pub title: String,
    pub items: Vec<DropdownItem>,
}

/// 按上传器类型生成下拉框分组，没有配置的类型也保留空分组。
pub fn build_dropdown<E: UploadEngine>(ctx: &UploaderContext<E>) -> Result<Vec<DropdownSection>, AppError> {
    ctx.list_uploader_types()
        .into_iter()
        .map(|uploader_type| -> Result<DropdownSection, AppError> {
            let items = ctx
                .config_list(&uploader_type)?
                .into_iter()
                .map(|item| -> Result<DropdownItem, AppError> {
                    let value = UserUploaderConfig::new(uploader_type.as_str(), item.id).to_json()?;
                    Ok(DropdownItem {
                        title: item.config_name,
                        value,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DropdownSection {
                title: uploader_type,
                items,
            })
        })
        .collect()
}

/// 提交的表单值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFormData {
    pub uploader_config: UserUploaderConfig,
    pub files: Vec<PathBuf>,
}

impl UploadFormData {
    /// 从扁平字段表解析；缺少 `uploader_config` 或其值无法解析时报错。
    pub fn from_fields(fields: &HashMap<String, Vec<String>>) -> Result<Self, AppError> {
        let raw = fields
            .get(UPLOADER_CONFIG_FIELD)
            .and_then(|values| values.first())
            .filter(|value| !value.trim().is_empty())
            .ok_or(AppError::MissingParameter(UPLOADER_CONFIG_FIELD))?;

        let files = fields
            .get(FILES_FIELD)
            .map(|values| {
                values
                    .iter()
                    .filter(|value| !value.trim().is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            uploader_config: UserUploaderConfig::from_json(raw)?,
            files,
        })
    }

    /// 提交的文件中的图片。
    pub fn image_files(&self) -> Vec<PathBuf> {
        image_files(&self.files)
    }
}

pub fn is_img_file(path: &Path) -> bool {
    IMAGE_EXTENSION.is_match(&path.to_string_lossy())
}

pub fn image_files(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|path| is_img_file(path))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{MemoryEngine, UploaderConfigItem};
    use crate::settings::Preferences;

    fn fields(pairs: &[(&str, Vec<&str>)]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(key, values)| (key.to_string(), values.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn image_filter_checks_extension_only() {
        assert!(is_img_file(Path::new("/tmp/cat.PNG")));
        assert!(is_img_file(Path::new("shot.jpeg")));
        assert!(is_img_file(Path::new("anim.webp")));
        assert!(!is_img_file(Path::new("notes.txt")));
        assert!(!is_img_file(Path::new("png")));

        let files = vec![PathBuf::from("a.gif"), PathBuf::from("b.pdf")];
        assert_eq!(image_files(&files), vec![PathBuf::from("a.gif")]);
    }

    #[test]
    fn form_data_parses_flat_fields() {
        let data = UploadFormData::from_fields(&fields(&[
            (UPLOADER_CONFIG_FIELD, vec![r#"{"uploaderType":"github","configId":"g1"}"#]),
            (FILES_FIELD, vec!["/tmp/a.png", "", "/tmp/b.txt"]),
        ]))
        .expect("parse form");

        assert_eq!(data.uploader_config, UserUploaderConfig::new("github", "g1"));
        assert_eq!(data.files.len(), 2);
        assert_eq!(data.image_files(), vec![PathBuf::from("/tmp/a.png")]);
    }

    #[test]
    fn form_data_requires_a_selection() {
        assert!(matches!(
            UploadFormData::from_fields(&fields(&[(FILES_FIELD, vec!["a.png"])])),
            Err(AppError::MissingParameter(UPLOADER_CONFIG_FIELD))
        ));
        assert!(matches!(
            UploadFormData::from_fields(&fields(&[(UPLOADER_CONFIG_FIELD, vec!["not json"])])),
            Err(AppError::InvalidSelection(_))
        ));
    }

    #[test]
    fn dropdown_groups_configs_by_type() {
        let engine = MemoryEngine::new()
            .with_uploader(
                "github",
                vec![UploaderConfigItem::new("g1", "Blog"), UploaderConfigItem::new("g2", "Work")],
            )
            .with_uploader("smms", vec![]);
        let ctx = UploaderContext::new(Arc::new(engine), Preferences::default()).expect("context");

        let sections = build_dropdown(&ctx).expect("dropdown");
        let github = sections.iter().find(|s| s.title == "github").expect("github section");
        assert_eq!(github.items.len(), 2);
        assert_eq!(github.items[0].title, "Blog");
        assert_eq!(
            UserUploaderConfig::from_json(&github.items[1].value).expect("value"),
            UserUploaderConfig::new("github", "g2")
        );
        assert!(sections.iter().any(|s| s.title == "smms" && s.items.is_empty()));
    }
}

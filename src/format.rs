//! 复制格式模块
//!
//! # 设计思路
//!
//! 上传结果可以按五种格式输出：URL、Markdown、HTML、UBB 和用户自定义模板。
//! 注册表是进程级静态表，只读，新增格式只需在 `EXPORT_FORMATS` 中追加一项。
//!
//! # 实现思路
//!
//! - 每种格式只负责把一张图片渲染为一行，`generate` 统一用 `\n` 拼接，末尾不带换行。
//! - 没有 URL 的结果同样输出一行（URL 为空），是否过滤失败项由调用方决定。
//! - 自定义模板用一条正则一次性替换 `$fileName`、`$url`、`$extName`，
//!   替换进去的内容不会被再次扫描，其余字符原样保留。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::engine::ImgInfo;

/// 自定义模板中可用的占位符。
static TEMPLATE_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(fileName|url|extName)").unwrap());

/// 一种复制格式。
#[derive(Debug, Clone, Copy)]
pub struct ExportFormat {
    pub name: &'static str,
    pub label: &'static str,
    render: fn(&ImgInfo, &str) -> String,
}

impl ExportFormat {
    /// 渲染全部结果，每张图片一行。`template` 只被 `custom` 使用。
    pub fn generate(&self, images: &[ImgInfo], template: &str) -> String {
        images
            .iter()
            .map(|img| (self.render)(img, template))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub static EXPORT_FORMATS: [ExportFormat; 5] = [
    ExportFormat {
        name: "url",
        label: "URL",
        render: |img, _| url_of(img).to_string(),
    },
    ExportFormat {
        name: "markdown",
        label: "Markdown",
        render: |img, _| format!("![]({})", url_of(img)),
    },
    ExportFormat {
        name: "html",
        label: "HTML",
        render: |img, _| format!("<img src=\"{}\" />", url_of(img)),
    },
    ExportFormat {
        name: "ubb",
        label: "UBB",
        render: |img, _| format!("[img]{}[/img]", url_of(img)),
    },
    ExportFormat {
        name: "custom",
        label: "Custom Format",
        render: render_custom,
    },
];

pub fn find_format(name: &str) -> Option<&'static ExportFormat> {
    EXPORT_FORMATS.iter().find(|format| format.name == name)
}

fn url_of(img: &ImgInfo) -> &str {
    img.img_url.as_deref().unwrap_or("")
}

fn render_custom(img: &ImgInfo, template: &str) -> String {
    TEMPLATE_TOKENS
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "fileName" => file_name(img),
            "url" => url_of(img).to_string(),
            _ => ext_name(img),
        })
        .into_owned()
}

/// 不含扩展名的文件名。
///
/// 优先取 `fileName` 并去掉第一次出现的 `extname`；没有 `fileName` 时取 URL
/// 最后一段中第一个 `.` 之前的部分；都没有时为 `image`。
pub fn file_name(img: &ImgInfo) -> String {
    if let Some(name) = &img.file_name {
        return match img.extname.as_deref().filter(|ext| !ext.is_empty()) {
            Some(ext) => name.replacen(ext, "", 1),
            None => name.clone(),
        };
    }

    img.img_url
        .as_deref()
        .and_then(|url| url.rsplit('/').next())
        .and_then(|segment| segment.split('.').next())
        .map(str::to_string)
        .unwrap_or_else(|| "image".to_string())
}

/// 带点的扩展名：优先 `extname`，否则取 URL 最后一个 `.` 之后的部分。
pub fn ext_name(img: &ImgInfo) -> String {
    if let Some(ext) = &img.extname {
        return ext.clone();
    }

    img.img_url
        .as_deref()
        .and_then(|url| url.rsplit_once('.'))
        .map(|(_, ext)| format!(".{}", ext))
        .unwrap_or_default()
}

//! # PicGo 命令行引擎
//!
//! ## 设计思路
//!
//! 本机安装的 PicGo 是真正的上传引擎。它的全部状态都在 `config.json` 中：
//!
//! ```text
//! {
//!   "picBed": { "uploader": "github", "current": "github", "proxy": "", "github": {...} },
//!   "uploader": { "github": { "configList": [ {"_id": ..., "_configName": ...} ], "defaultId": ... } },
//!   "picgoPlugins": { "picgo-plugin-xxx": true }
//! }
//! ```
//!
//! 配置的读写直接操作该文件；上传与插件管理交给 `picgo` 命令行完成。
//!
//! ## 实现思路
//!
//! - 配置文件整体读入 `RwLock<Value>`，每次修改先在副本上完成，落盘成功后再替换内存状态。
//! - 文件不存在视为空配置；内容损坏时报错而不是回退，避免覆盖用户的 PicGo 配置。
//!   配置列表中有无法解析的条目时，读取照常跳过该条目，修改则直接报错、不落盘。
//! - 上传执行 `picgo upload [files...]`，从 `[PicGo SUCCESS]` 标记之后的输出中提取 URL。
//! - 命令行可能改写配置文件（例如安装插件），命令结束后重新加载。

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use tokio::process::Command;

use super::{
    EngineError, ImgInfo, PluginInfo, PluginRegistryOptions, UploadEngine, UploaderConfigField,
    UploaderConfigItem, assign_path, lookup_path, profiles,
};

/// PicGo 内置的上传器类型。
pub const BUILTIN_UPLOADERS: [&str; 7] = ["smms", "tcyun", "github", "qiniu", "imgur", "aliyun", "upyun"];

const SUCCESS_MARKER: &str = "[PicGo SUCCESS]";
const ERROR_MARKER: &str = "[PicGo ERROR]";

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi escape regex"));
static URL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+$").expect("valid url line regex"));

/// 基于 PicGo 配置文件与命令行的上传引擎。
pub struct PicGoCliEngine {
    config_path: PathBuf,
    picgo_bin: PathBuf,
    config: RwLock<Value>,
}

impl PicGoCliEngine {
    /// 使用指定配置文件与 `picgo` 可执行文件创建引擎。
    pub fn new(config_path: impl Into<PathBuf>, picgo_bin: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let config_path = config_path.into();
        let config = load_config_from_path(&config_path)?;
        log::info!("📄 已加载 PicGo 配置：{}", config_path.display());

        Ok(Self {
            config_path,
            picgo_bin: picgo_bin.into(),
            config: RwLock::new(config),
        })
    }

    /// PicGo 默认配置文件位置：`~/.picgo/config.json`。
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".picgo").join("config.json"))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 重新从磁盘读取配置。
    pub fn reload(&self) -> Result<(), EngineError> {
        let fresh = load_config_from_path(&self.config_path)?;
        let mut config = self
            .config
            .write()
            .map_err(|_| EngineError::ConfigFile("配置写入锁已中毒".to_string()))?;
        *config = fresh;
        Ok(())
    }

    fn snapshot(&self) -> RwLockReadGuard<'_, Value> {
        self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 在配置副本上执行修改，落盘成功后替换内存状态。
    fn modify<R>(&self, apply: impl FnOnce(&mut Value) -> Result<R, EngineError>) -> Result<R, EngineError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| EngineError::ConfigFile("配置写入锁已中毒".to_string()))?;

        let mut draft = config.clone();
        let result = apply(&mut draft)?;
        save_config_to_path(&self.config_path, &draft)?;
        *config = draft;
        Ok(result)
    }

    async fn run_picgo(
        &self,
        args: Vec<OsString>,
        env: Option<HashMap<String, String>>,
    ) -> Result<String, EngineError> {
        let mut command = Command::new(&self.picgo_bin);
        command.args(&args);
        if let Some(env) = env {
            command.env_clear().envs(env);
        }

        log::debug!("▶️ 执行 picgo {:?}", args);
        let output = command
            .output()
            .await
            .map_err(|e| EngineError::Process(format!("{}: {}", self.picgo_bin.display(), e)))?;

        let stdout = strip_ansi(&String::from_utf8_lossy(&output.stdout));
        let stderr = strip_ansi(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(EngineError::Process(format!("exit code {}: {}", exit_code, detail)));
        }

        Ok(stdout)
    }

    fn reload_after_command(&self) {
        if let Err(err) = self.reload() {
            log::warn!("命令执行后重新加载 PicGo 配置失败：{}", err);
        }
    }

    async fn run_plugin_command(
        &self,
        action: &str,
        names: Vec<String>,
        options: Option<PluginRegistryOptions>,
        env: HashMap<String, String>,
    ) -> Result<Vec<String>, EngineError> {
        let mut args: Vec<OsString> = vec![action.into()];
        args.extend(names.iter().map(OsString::from));
        if let Some(options) = options {
            if let Some(proxy) = options.npm_proxy.filter(|p| !p.trim().is_empty()) {
                args.push("--proxy".into());
                args.push(proxy.into());
            }
            if let Some(registry) = options.npm_registry.filter(|r| !r.trim().is_empty()) {
                args.push("--registry".into());
                args.push(registry.into());
            }
        }

        let result = self.run_picgo(args, Some(env)).await;
        self.reload_after_command();

        let stdout = result.map_err(|e| EngineError::Plugin(e.to_string()))?;
        if let Some(line) = stdout.lines().find(|line| line.contains(ERROR_MARKER)) {
            return Err(EngineError::Plugin(line.trim().to_string()));
        }

        log::info!("🔌 picgo {} 完成：{:?}", action, names);
        Ok(names)
    }
}

fn load_config_from_path(config_path: &Path) -> Result<Value, EngineError> {
    if !config_path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let content = fs::read_to_string(config_path)
        .map_err(|e| EngineError::ConfigFile(format!("读取 {} 失败: {}", config_path.display(), e)))?;
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_str(&content)
        .map_err(|e| EngineError::ConfigFile(format!("解析 {} 失败: {}", config_path.display(), e)))
}

fn save_config_to_path(config_path: &Path, config: &Value) -> Result<(), EngineError> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| EngineError::ConfigFile(format!("创建配置目录失败: {}", e)))?;
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| EngineError::ConfigFile(format!("序列化配置失败: {}", e)))?;
    fs::write(config_path, content)
        .map_err(|e| EngineError::ConfigFile(format!("写入配置文件失败: {}", e)))
}

fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// 提取 `[PicGo SUCCESS]` 标记之后输出的 URL。
pub(crate) fn parse_upload_output(stdout: &str) -> Vec<String> {
    let clean = strip_ansi(stdout);
    let Some(position) = clean.find(SUCCESS_MARKER) else {
        return Vec::new();
    };

    clean[position + SUCCESS_MARKER.len()..]
        .lines()
        .map(|line| line.trim().trim_start_matches(':').trim())
        .filter(|line| URL_LINE.is_match(line))
        .map(str::to_string)
        .collect()
}

fn read_config_list(config: &Value, uploader_type: &str) -> Vec<UploaderConfigItem> {
    lookup_path(config, &format!("uploader.{}.configList", uploader_type))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// 修改前读取配置列表。任何一项无法解析时报错，避免写回时丢掉用户的配置。
fn read_config_list_for_edit(config: &Value, uploader_type: &str) -> Result<Vec<UploaderConfigItem>, EngineError> {
    let key = format!("uploader.{}.configList", uploader_type);
    let items = match lookup_path(config, &key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(EngineError::ConfigFile(format!("{} 不是数组", key))),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone())
                .map_err(|e| EngineError::ConfigFile(format!("{}[{}] 无法解析: {}", key, index, e)))
        })
        .collect()
}

fn write_config_list(
    config: &mut Value,
    uploader_type: &str,
    list: &[UploaderConfigItem],
) -> Result<(), EngineError> {
    let value = serde_json::to_value(list)
        .map_err(|e| EngineError::ConfigFile(format!("序列化配置列表失败: {}", e)))?;
    assign_path(config, &format!("uploader.{}.configList", uploader_type), value);
    Ok(())
}

fn read_default_id(config: &Value, uploader_type: &str) -> Option<String> {
    lookup_path(config, &format!("uploader.{}.defaultId", uploader_type))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn write_default_id(config: &mut Value, uploader_type: &str, id: Option<String>) {
    let key = format!("uploader.{}.defaultId", uploader_type);
    match id {
        Some(id) => assign_path(config, &key, json!(id)),
        None => {
            if let Some(entry) = config
                .get_mut("uploader")
                .and_then(|u| u.get_mut(uploader_type))
                .and_then(Value::as_object_mut)
            {
                entry.remove("defaultId");
            }
        }
    }
}

/// 把生效配置同步到 `picBed.<type>`，与 PicGo 自身的 `use` 行为一致。
fn mirror_active(config: &mut Value, uploader_type: &str, item: &UploaderConfigItem) -> Result<(), EngineError> {
    let value = serde_json::to_value(item)
        .map_err(|e| EngineError::ConfigFile(format!("序列化配置失败: {}", e)))?;
    assign_path(config, &format!("picBed.{}", uploader_type), value);
    Ok(())
}

fn image_info_for(path: Option<&PathBuf>, url: Option<&String>) -> ImgInfo {
    let file_name = match path {
        Some(path) => path.file_name().map(|n| n.to_string_lossy().to_string()),
        None => url.and_then(|u| u.rsplit('/').next()).map(str::to_string),
    };
    let extname = file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .map(|ext| format!(".{}", ext.to_string_lossy()));

    ImgInfo {
        file_name,
        extname,
        img_url: url.cloned(),
        error: if url.is_none() {
            Some("no url returned by picgo".to_string())
        } else {
            None
        },
    }
}

impl UploadEngine for PicGoCliEngine {
    fn get_config(&self, key: &str) -> Option<Value> {
        lookup_path(&self.snapshot(), key).cloned()
    }

    fn set_config(&self, key: &str, value: Value) -> Result<(), EngineError> {
        self.modify(|config| {
            assign_path(config, key, value);
            Ok(())
        })
    }

    fn list_uploader_types(&self) -> Vec<String> {
        let config = self.snapshot();
        let mut types: Vec<String> = BUILTIN_UPLOADERS.iter().map(|t| t.to_string()).collect();

        if let Some(configured) = config.get("uploader").and_then(Value::as_object) {
            for name in configured.keys() {
                if !types.contains(name) {
                    types.push(name.clone());
                }
            }
        }
        types
    }

    fn get_config_list(&self, uploader_type: &str) -> Vec<UploaderConfigItem> {
        read_config_list(&self.snapshot(), uploader_type)
    }

    fn get_active_config(&self, uploader_type: &str) -> Option<UploaderConfigItem> {
        let config = self.snapshot();
        let list = read_config_list(&config, uploader_type);
        let default_id = read_default_id(&config, uploader_type);
        profiles::active(&list, default_id.as_deref()).cloned()
    }

    fn use_config(&self, uploader_type: &str, config_name: &str) -> Result<(), EngineError> {
        self.modify(|config| {
            let list = read_config_list(config, uploader_type);
            let item = profiles::find_by_name(&list, uploader_type, config_name)?;

            write_default_id(config, uploader_type, Some(item.id.clone()));
            mirror_active(config, uploader_type, item)?;
            assign_path(config, "picBed.uploader", json!(uploader_type));
            assign_path(config, "picBed.current", json!(uploader_type));
            Ok(())
        })?;

        log::info!("✅ 已切换 PicGo 配置：{} [{}]", uploader_type, config_name);
        Ok(())
    }

    /// 命令行无法查询上传器声明的字段，这里以已保存配置中出现过的设置项代替。
    fn uploader_config_details(&self, uploader_type: &str) -> Vec<UploaderConfigField> {
        let mut names: Vec<String> = self
            .get_config_list(uploader_type)
            .into_iter()
            .flat_map(|item| item.settings.into_iter().map(|(key, _)| key))
            .collect();
        names.sort();
        names.dedup();

        names
            .into_iter()
            .map(|name| UploaderConfigField {
                name,
                field_type: "input".to_string(),
                required: false,
                default: None,
                alias: None,
            })
            .collect()
    }

    fn create_or_update(
        &self,
        uploader_type: &str,
        config_name: &str,
        config_item: UploaderConfigItem,
    ) -> Result<(), EngineError> {
        self.modify(|config| {
            let mut list = read_config_list_for_edit(config, uploader_type)?;
            let id = profiles::upsert(&mut list, config_name, config_item);
            write_config_list(config, uploader_type, &list)?;

            let default_id = read_default_id(config, uploader_type);
            match default_id {
                None => write_default_id(config, uploader_type, Some(id)),
                Some(default_id) if default_id == id => {
                    if let Some(item) = list.iter().find(|item| item.id == id) {
                        mirror_active(config, uploader_type, item)?;
                    }
                }
                Some(_) => {}
            }
            Ok(())
        })
    }

    fn copy(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), EngineError> {
        self.modify(|config| {
            let mut list = read_config_list_for_edit(config, uploader_type)?;
            profiles::copy(&mut list, uploader_type, old_name, new_name)?;
            write_config_list(config, uploader_type, &list)
        })
    }

    fn rename(&self, uploader_type: &str, old_name: &str, new_name: &str) -> Result<(), EngineError> {
        self.modify(|config| {
            let mut list = read_config_list_for_edit(config, uploader_type)?;
            profiles::rename(&mut list, uploader_type, old_name, new_name)?;
            write_config_list(config, uploader_type, &list)
        })
    }

    fn remove(&self, uploader_type: &str, config_name: &str) -> Result<(), EngineError> {
        self.modify(|config| {
            let mut list = read_config_list_for_edit(config, uploader_type)?;
            let default_id = read_default_id(config, uploader_type);
            let next_default = profiles::remove(&mut list, default_id.as_deref(), uploader_type, config_name)?;
            write_config_list(config, uploader_type, &list)?;
            write_default_id(config, uploader_type, next_default);
            Ok(())
        })
    }

    async fn upload(&self, input: Option<Vec<PathBuf>>) -> Result<Vec<ImgInfo>, EngineError> {
        let mut args: Vec<OsString> = vec!["upload".into()];
        if let Some(paths) = &input {
            args.extend(paths.iter().map(|p| p.as_os_str().to_os_string()));
        }

        let result = self.run_picgo(args, None).await;
        self.reload_after_command();
        let stdout = result.map_err(|e| EngineError::Upload(e.to_string()))?;

        if let Some(line) = stdout.lines().find(|line| line.contains(ERROR_MARKER)) {
            return Err(EngineError::Upload(line.trim().to_string()));
        }

        let urls = parse_upload_output(&stdout);
        log::info!("📤 picgo 返回 {} 个链接", urls.len());

        let results = match &input {
            Some(paths) => paths
                .iter()
                .enumerate()
                .map(|(index, path)| image_info_for(Some(path), urls.get(index)))
                .collect(),
            None => urls.iter().map(|url| image_info_for(None, Some(url))).collect(),
        };
        Ok(results)
    }

    fn installed_plugins(&self) -> Vec<String> {
        self.snapshot()
            .get("picgoPlugins")
            .and_then(Value::as_object)
            .map(|plugins| plugins.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn enabled_plugins(&self) -> Vec<String> {
        self.snapshot()
            .get("picgoPlugins")
            .and_then(Value::as_object)
            .map(|plugins| {
                plugins
                    .iter()
                    .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get_plugin(&self, name: &str) -> Option<PluginInfo> {
        let config = self.snapshot();
        let enabled = config.get("picgoPlugins")?.get(name)?.as_bool().unwrap_or(false);
        Some(PluginInfo {
            name: name.to_string(),
            enabled,
        })
    }

    fn has_plugin(&self, name: &str) -> bool {
        self.get_plugin(name).is_some()
    }

    async fn install_plugins(
        &self,
        names: Vec<String>,
        options: PluginRegistryOptions,
        env: HashMap<String, String>,
    ) -> Result<Vec<String>, EngineError> {
        self.run_plugin_command("install", names, Some(options), env).await
    }

    async fn update_plugins(
        &self,
        names: Vec<String>,
        options: PluginRegistryOptions,
        env: HashMap<String, String>,
    ) -> Result<Vec<String>, EngineError> {
        self.run_plugin_command("update", names, Some(options), env).await
    }

    async fn uninstall_plugins(
        &self,
        names: Vec<String>,
        env: HashMap<String, String>,
    ) -> Result<Vec<String>, EngineError> {
        self.run_plugin_command("uninstall", names, None, env).await
    }
}

//! # PicGo 图片上传工具 — 命令行入口
//!
//! 本文件只负责参数解析、日志初始化与引擎构造，
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use picgo_uploader::context::{UploaderContext, UserUploaderConfig};
use picgo_uploader::engine::{MemoryEngine, PicGoCliEngine, UploadEngine, UploaderConfigItem};
use picgo_uploader::error::{AppError, ErrorKind};
use picgo_uploader::format::{find_format, EXPORT_FORMATS};
use picgo_uploader::settings::{self, PREFERENCES_FILE_NAME};
use picgo_uploader::storage::LocalStorage;
use picgo_uploader::{clipboard, form, upload};

#[derive(Parser)]
#[command(name = "picgo-uploader", about = "Upload images through PicGo and copy the links")]
struct Cli {
    /// PicGo config file (default: ~/.picgo/config.json)
    #[arg(long, global = true)]
    picgo_config: Option<PathBuf>,
    /// picgo executable
    #[arg(long, global = true, default_value = "picgo")]
    picgo_bin: PathBuf,
    /// Preferences file (default: <config dir>/picgo-uploader/preferences.json)
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,
    /// Use an in-process engine with sample configs instead of PicGo
    #[arg(long, global = true)]
    demo: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload image files, or the clipboard image when no file is given
    Upload {
        files: Vec<PathBuf>,
        /// Output format: url, markdown, html, ubb, custom
        #[arg(long, default_value = "url")]
        format: String,
        /// Copy the formatted links to the clipboard
        #[arg(long)]
        copy: bool,
        /// Copy the full error detail to the clipboard when the upload fails
        #[arg(long)]
        copy_error: bool,
        /// Uploader type to switch to before uploading
        #[arg(long, requires = "config_id")]
        uploader: Option<String>,
        /// Config id to switch to before uploading
        #[arg(long, requires = "uploader")]
        config_id: Option<String>,
    },
    /// List uploader configs grouped by type
    Configs,
    /// Select the config used for uploads
    Use { uploader_type: String, config_id: String },
    /// List export formats
    Formats,
    /// Manage uploader configs
    Profile {
        #[command(subcommand)]
        sub: ProfileCommands,
    },
    /// Manage PicGo plugins
    Plugins {
        #[command(subcommand)]
        sub: PluginCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the setting fields an uploader declares
    Fields { uploader_type: String },
    /// Create a config or update its settings (KEY=VALUE)
    Set {
        uploader_type: String,
        config_name: String,
        #[arg(value_parser = parse_key_value)]
        settings: Vec<(String, String)>,
    },
    Copy { uploader_type: String, old_name: String, new_name: String },
    Rename { uploader_type: String, old_name: String, new_name: String },
    Remove { uploader_type: String, config_name: String },
}

#[derive(Subcommand)]
enum PluginCommands {
    List,
    Install { names: Vec<String> },
    Update { names: Vec<String> },
    Uninstall { names: Vec<String> },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Storage(format!("序列化输出失败: {}", e)))?;
    println!("{}", out);
    Ok(())
}

fn demo_engine() -> MemoryEngine {
    MemoryEngine::new()
        .with_uploader(
            "github",
            vec![
                UploaderConfigItem::new("demo-github-blog", "Blog")
                    .with_setting("repo", "someone/images")
                    .with_setting("branch", "main")
                    .with_setting("path", "img"),
            ],
        )
        .with_uploader("smms", vec![UploaderConfigItem::new("demo-smms", "Default")])
        .with_active_uploader("github")
        .with_plugin("picgo-plugin-compress", true)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let copy_error = matches!(cli.command, Commands::Upload { copy_error: true, .. });

    let result = if cli.demo {
        log::info!("🧪 使用演示引擎");
        run(cli, Arc::new(demo_engine())).await
    } else {
        match open_picgo_engine(&cli) {
            Ok(engine) => run(cli, Arc::new(engine)).await,
            Err(err) => Err(err),
        }
    };

    if let Err(err) = result {
        report_error(&err, copy_error).await;
        std::process::exit(1);
    }
}

fn open_picgo_engine(cli: &Cli) -> Result<PicGoCliEngine, AppError> {
    let config_path = match &cli.picgo_config {
        Some(path) => path.clone(),
        None => PicGoCliEngine::default_config_path()
            .ok_or_else(|| AppError::Preferences("无法定位用户主目录".to_string()))?,
    };
    Ok(PicGoCliEngine::new(config_path, cli.picgo_bin.clone())?)
}

async fn report_error(err: &AppError, copy_error: bool) {
    match err.kind() {
        ErrorKind::Configuration => {
            eprintln!("Error: {}", err);
            if let Some(url) = err.help_url() {
                eprintln!("See {} to set up PicGo.", url);
            }
        }
        ErrorKind::Upload => {
            let failure = upload::UploadFailure::from_error(err);
            eprintln!("{}: {}", failure.title, failure.message);
            if copy_error {
                match clipboard::copy_text_async(failure.detail).await {
                    Ok(()) => eprintln!("Error log copied to clipboard."),
                    Err(copy_err) => log::warn!("复制错误日志失败: {}", copy_err),
                }
            }
        }
        ErrorKind::Plugin | ErrorKind::UserInput => eprintln!("{}", err),
    }
}

async fn run<E: UploadEngine>(cli: Cli, engine: Arc<E>) -> Result<(), AppError> {
    let data_dir = settings::app_data_dir()?;
    let preferences_path = cli
        .preferences
        .clone()
        .unwrap_or_else(|| data_dir.join(PREFERENCES_FILE_NAME));
    let preferences = settings::load_preferences_from_path(&preferences_path);
    let storage = LocalStorage::in_dir(&data_dir);
    let ctx = UploaderContext::new(engine, preferences)?;

    match cli.command {
        Commands::Upload {
            files,
            format,
            copy,
            copy_error: _,
            uploader,
            config_id,
        } => {
            let export = find_format(&format).ok_or(AppError::MissingParameter("known export format"))?;

            let selection = match (uploader, config_id) {
                (Some(uploader_type), Some(config_id)) => {
                    let selection = UserUploaderConfig::new(uploader_type, config_id);
                    if !files.is_empty() && form::image_files(&files).is_empty() {
                        return Err(AppError::NoImageFiles);
                    }
                    upload::select(&ctx, &storage, &selection)?;
                    selection
                }
                _ => upload::restore_selection(&ctx, &storage)?,
            };
            eprintln!("Uploading... {}", upload::describe_selection(&ctx, &selection));

            let images = if files.is_empty() {
                upload::upload_clipboard(&ctx).await?
            } else {
                upload::upload_files(&ctx, &files).await?
            };

            let text = export.generate(&images, &ctx.preferences().custom_format);
            println!("{}", text);
            // 上传已经成功，复制失败不算上传失败
            if copy {
                match clipboard::copy_text_async(text).await {
                    Ok(()) => eprintln!("Copied {} link(s) as {}.", images.len(), export.label),
                    Err(err) => {
                        log::warn!("📋 复制链接失败: {}", err);
                        eprintln!("Uploaded, but the links could not be copied: {}", err);
                    }
                }
            }
        }
        Commands::Configs => {
            let selection = upload::peek_selection(&ctx, &storage)?;
            print_json(&serde_json::json!({
                "selected": selection,
                "sections": form::build_dropdown(&ctx)?,
            }))?;
        }
        Commands::Use { uploader_type, config_id } => {
            let selection = UserUploaderConfig::new(uploader_type, config_id);
            upload::select(&ctx, &storage, &selection)?;
            eprintln!("Using {}", upload::describe_selection(&ctx, &selection));
        }
        Commands::Formats => {
            let formats: Vec<_> = EXPORT_FORMATS
                .iter()
                .map(|format| serde_json::json!({ "name": format.name, "label": format.label }))
                .collect();
            print_json(&formats)?;
        }
        Commands::Profile { sub } => run_profile(&ctx, sub)?,
        Commands::Plugins { sub } => run_plugins(&ctx, sub).await?,
    }

    Ok(())
}

fn run_profile<E: UploadEngine>(ctx: &UploaderContext<E>, sub: ProfileCommands) -> Result<(), AppError> {
    match sub {
        ProfileCommands::Fields { uploader_type } => {
            print_json(&ctx.config_item_details(&uploader_type)?)?;
        }
        ProfileCommands::Set {
            uploader_type,
            config_name,
            settings,
        } => {
            let item = settings
                .into_iter()
                .fold(UploaderConfigItem::new("", config_name), |item, (key, value)| {
                    item.with_setting(&key, value)
                });
            ctx.create_or_update_config(&uploader_type, item)?;
        }
        ProfileCommands::Copy {
            uploader_type,
            old_name,
            new_name,
        } => ctx.copy_config(&uploader_type, &old_name, &new_name)?,
        ProfileCommands::Rename {
            uploader_type,
            old_name,
            new_name,
        } => ctx.rename_config(&uploader_type, &old_name, &new_name)?,
        ProfileCommands::Remove {
            uploader_type,
            config_name,
        } => ctx.remove_config(&uploader_type, &config_name)?,
    }
    Ok(())
}

async fn run_plugins<E: UploadEngine>(ctx: &UploaderContext<E>, sub: PluginCommands) -> Result<(), AppError> {
    match sub {
        PluginCommands::List => {
            let plugins: HashMap<String, bool> = ctx
                .installed_plugins()
                .into_iter()
                .map(|name| {
                    let enabled = ctx.plugin(&name).is_some_and(|plugin| plugin.enabled);
                    (name, enabled)
                })
                .collect();
            print_json(&plugins)?;
        }
        PluginCommands::Install { names } => print_json(&ctx.install_plugins(&names).await?)?,
        PluginCommands::Update { names } => print_json(&ctx.update_plugins(&names).await?)?,
        PluginCommands::Uninstall { names } => print_json(&ctx.uninstall_plugins(&names).await?)?,
    }
    Ok(())
}

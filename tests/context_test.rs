// Adapter behaviour against a fresh in-process engine per test
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use picgo_uploader::context::{UploaderContext, UserUploaderConfig};
use picgo_uploader::engine::memory::PluginAction;
use picgo_uploader::engine::{EngineError, MemoryEngine, UploadEngine, UploaderConfigItem};
use picgo_uploader::error::AppError;
use picgo_uploader::settings::Preferences;
use proptest::prelude::*;
use serde_json::json;

fn engine() -> MemoryEngine {
    MemoryEngine::new()
        .with_uploader(
            "github",
            vec![
                UploaderConfigItem::new("g1", "Blog").with_setting("path", "img"),
                UploaderConfigItem::new("g2", "Work").with_setting("path", "work"),
            ],
        )
        .with_uploader("smms", vec![UploaderConfigItem::new("s1", "Default")])
        .with_active_uploader("github")
}

fn context_with(engine: MemoryEngine, preferences: Preferences) -> (Arc<MemoryEngine>, UploaderContext<MemoryEngine>) {
    let engine = Arc::new(engine);
    let ctx = UploaderContext::new(Arc::clone(&engine), preferences).expect("create context");
    (engine, ctx)
}

fn context() -> (Arc<MemoryEngine>, UploaderContext<MemoryEngine>) {
    context_with(engine(), Preferences::default())
}

fn date_path_preferences(prefix: &str) -> Preferences {
    Preferences {
        enable_github_path_by_date: true,
        github_path_prefix: prefix.to_string(),
        ..Preferences::default()
    }
}

proptest! {
    #[test]
    fn availability_matches_type_and_id_membership(
        uploader_type in prop::sample::select(vec!["github", "smms", "imgur", ""]),
        config_id in prop::option::of(prop::sample::select(vec!["g1", "g2", "s1", "zz", ""])),
    ) {
        let (_, ctx) = context();
        let selection = UserUploaderConfig {
            uploader_type: uploader_type.to_string(),
            config_id: config_id.map(str::to_string),
        };

        let expected = matches!(
            (uploader_type, config_id),
            ("github", Some("g1")) | ("github", Some("g2")) | ("smms", Some("s1"))
        );
        prop_assert_eq!(ctx.is_available(&selection), expected);
    }
}

#[test]
fn construction_writes_trimmed_proxy() {
    let preferences = Preferences {
        proxy: "  http://127.0.0.1:7890 ".to_string(),
        ..Preferences::default()
    };
    let (engine, _ctx) = context_with(engine(), preferences);
    assert_eq!(engine.get_config("picBed.proxy"), Some(json!("http://127.0.0.1:7890")));
}

#[test]
fn config_list_rejects_unknown_types() {
    let (_, ctx) = context();
    assert_eq!(ctx.config_list("github").expect("github list").len(), 2);
    assert!(matches!(
        ctx.config_list("imgur"),
        Err(AppError::UploaderTypeNotFound(t)) if t == "imgur"
    ));
}

#[test]
fn active_config_defaults_to_active_type() {
    let (_, ctx) = context();
    assert_eq!(ctx.active_uploader_type().as_deref(), Some("github"));
    let active = ctx.active_config(None).expect("active config").expect("some config");
    assert_eq!(active.id, "g1");
    assert_eq!(
        ctx.active_config(Some("smms")).expect("smms").map(|c| c.id),
        Some("s1".to_string())
    );
}

#[test]
fn active_config_without_any_type_fails() {
    let (_, ctx) = context_with(MemoryEngine::new(), Preferences::default());
    assert!(matches!(
        ctx.active_config(None),
        Err(AppError::UploaderTypeNotFound(t)) if t.is_empty()
    ));
}

#[test]
fn sync_available_reference_activates_that_profile() {
    let (engine, ctx) = context();
    ctx.sync(&UserUploaderConfig::new("github", "g2")).expect("sync g2");
    assert_eq!(engine.get_active_config("github").map(|c| c.id), Some("g2".to_string()));

    ctx.sync(&UserUploaderConfig::new("smms", "s1")).expect("sync s1");
    assert_eq!(ctx.active_uploader_type().as_deref(), Some("smms"));
}

#[test]
fn sync_unavailable_reference_leaves_engine_untouched() {
    let (engine, ctx) = context();
    let before = engine.get_active_config("github");

    let missing_id = UserUploaderConfig {
        uploader_type: "github".to_string(),
        config_id: None,
    };
    assert!(matches!(ctx.sync(&missing_id), Err(AppError::ConfigIdMissing(_))));
    assert!(matches!(
        ctx.sync(&UserUploaderConfig::new("imgur", "i1")),
        Err(AppError::UploaderTypeNotFound(_))
    ));
    match ctx.sync(&UserUploaderConfig::new("github", "zz")) {
        Err(AppError::ConfigNotFound { uploader_type, id }) => {
            assert_eq!(uploader_type, "github");
            assert_eq!(id, "zz");
        }
        other => panic!("expected ConfigNotFound, got {:?}", other),
    }

    assert_eq!(engine.get_active_config("github"), before);
    assert_eq!(ctx.active_uploader_type().as_deref(), Some("github"));
}

#[test]
fn resolve_default_keeps_available_stored_selection() {
    let (_, ctx) = context();
    let stored = UserUploaderConfig::new("smms", "s1");
    assert_eq!(ctx.resolve_default(Some(&stored)).expect("resolve"), stored);
}

#[test]
fn resolve_default_falls_back_to_active_profile() {
    let (_, ctx) = context();
    let stale = UserUploaderConfig::new("github", "deleted");
    assert_eq!(
        ctx.resolve_default(Some(&stale)).expect("resolve"),
        UserUploaderConfig::new("github", "g1")
    );
    assert_eq!(ctx.resolve_default(None).expect("resolve"), UserUploaderConfig::new("github", "g1"));
}

#[test]
fn resolve_default_uses_first_type_with_profiles() {
    let engine = MemoryEngine::new()
        .with_uploader("imgur", vec![])
        .with_uploader("smms", vec![UploaderConfigItem::new("s1", "Default")])
        .with_active_uploader("imgur");
    let (_, ctx) = context_with(engine, Preferences::default());
    assert_eq!(ctx.resolve_default(None).expect("resolve"), UserUploaderConfig::new("smms", "s1"));
}

#[test]
fn resolve_default_without_profiles_fails() {
    let (_, ctx) = context_with(MemoryEngine::new().with_uploader("smms", vec![]), Preferences::default());
    assert!(matches!(ctx.resolve_default(None), Err(AppError::NoAvailableConfig)));
}

#[tokio::test]
async fn date_path_is_written_before_upload_and_persists() {
    let (engine, ctx) = context_with(engine(), date_path_preferences("pics"));
    let march = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");

    ctx.upload_at(Some(vec![PathBuf::from("/tmp/cat.png")]), march)
        .await
        .expect("upload");

    let calls = engine.upload_calls();
    assert_eq!(calls.len(), 1);
    let seen = calls[0].active_config.as_ref().expect("active config at upload");
    assert_eq!(seen.setting_str("path"), Some("pics/2024/03"));

    let after = engine.get_active_config("github").expect("github config");
    assert_eq!(after.id, "g1");
    assert_eq!(after.setting_str("path"), Some("pics/2024/03"));
}

#[tokio::test]
async fn date_path_skipped_for_other_uploaders_and_blank_prefix() {
    let (engine, ctx) = context_with(engine(), date_path_preferences("   "));
    let march = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
    ctx.upload_at(None, march).await.expect("upload");
    assert_eq!(engine.get_active_config("github").and_then(|c| c.setting_str("path").map(str::to_string)), Some("img".to_string()));

    let (engine, ctx) = context_with(engine_with_smms_active(), date_path_preferences("pics"));
    ctx.upload_at(None, march).await.expect("upload");
    assert_eq!(engine.get_active_config("github").and_then(|c| c.setting_str("path").map(str::to_string)), Some("img".to_string()));
}

fn engine_with_smms_active() -> MemoryEngine {
    engine().with_active_uploader("smms")
}

#[tokio::test]
async fn upload_times_out_with_seconds_message() {
    let preferences = Preferences {
        upload_timeout: "50".to_string(),
        ..Preferences::default()
    };
    let (engine, ctx) = context_with(engine(), preferences);
    engine.set_upload_delay(Duration::from_millis(300));

    match ctx.upload(None).await {
        Err(AppError::Timeout(message)) => assert_eq!(message, "Upload timeout: 0.05s"),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(engine.upload_calls().len(), 1);
}

#[tokio::test]
async fn invalid_timeout_fails_before_calling_engine() {
    let preferences = Preferences {
        upload_timeout: "soon".to_string(),
        ..Preferences::default()
    };
    let (engine, ctx) = context_with(engine(), preferences);
    assert!(matches!(ctx.upload(None).await, Err(AppError::InvalidTimeout(_))));
    assert!(engine.upload_calls().is_empty());
}

#[tokio::test]
async fn engine_upload_errors_propagate_unchanged() {
    let (engine, ctx) = context();
    engine.push_upload_result(Err("token expired".to_string()));

    match ctx.upload(None).await {
        Err(AppError::Engine(EngineError::Upload(message))) => assert_eq!(message, "token expired"),
        other => panic!("expected engine error, got {:?}", other),
    }
}

#[test]
fn profile_pass_throughs_check_presence_and_forward() {
    let (engine, ctx) = context();

    assert!(matches!(ctx.copy_config("github", "", "Copy"), Err(AppError::MissingParameter(_))));
    assert!(matches!(ctx.remove_config(" ", "Blog"), Err(AppError::MissingParameter(_))));

    ctx.copy_config("github", "Blog", "Blog copy").expect("copy");
    ctx.rename_config("github", "Blog copy", "Archive").expect("rename");
    assert!(matches!(
        ctx.rename_config("github", "Archive", "Work"),
        Err(AppError::Engine(EngineError::ConfigNameExists { .. }))
    ));

    let created = UploaderConfigItem::new("", "Fresh").with_setting("repo", "me/pics");
    ctx.create_or_update_config("github", created).expect("create");
    ctx.remove_config("github", "Work").expect("remove");

    let names: Vec<String> = engine
        .get_config_list("github")
        .into_iter()
        .map(|c| c.config_name)
        .collect();
    assert_eq!(names, vec!["Blog", "Archive", "Fresh"]);
}

#[tokio::test]
async fn plugin_pass_throughs_forward_registry_and_path() {
    let preferences = Preferences {
        npm_path: "/opt/node/bin".to_string(),
        npm_mirror: "https://registry.npmmirror.com".to_string(),
        npm_proxy: "http://127.0.0.1:7890".to_string(),
        ..Preferences::default()
    };
    let (engine, ctx) = context_with(engine().with_plugin("picgo-plugin-compress", false), preferences);

    assert!(matches!(ctx.install_plugins(&[]).await, Err(AppError::MissingParameter(_))));

    let installed = ctx
        .install_plugins(&["picgo-plugin-watermark".to_string()])
        .await
        .expect("install");
    assert_eq!(installed, vec!["picgo-plugin-watermark".to_string()]);
    assert!(ctx.has_plugin("picgo-plugin-watermark"));
    assert_eq!(ctx.enabled_plugins(), vec!["picgo-plugin-watermark".to_string()]);
    assert_eq!(ctx.plugin("picgo-plugin-compress").map(|p| p.enabled), Some(false));

    ctx.uninstall_plugins(&["picgo-plugin-compress".to_string()])
        .await
        .expect("uninstall");
    assert_eq!(ctx.installed_plugins(), vec!["picgo-plugin-watermark".to_string()]);

    let calls = engine.plugin_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].action, PluginAction::Install);
    let options = calls[0].options.as_ref().expect("registry options");
    assert_eq!(options.npm_registry.as_deref(), Some("https://registry.npmmirror.com"));
    assert_eq!(options.npm_proxy.as_deref(), Some("http://127.0.0.1:7890"));
    assert!(calls[0]
        .env
        .get("PATH")
        .is_some_and(|path| path.starts_with("/opt/node/bin")));
    assert_eq!(calls[1].action, PluginAction::Uninstall);
    assert!(calls[1].options.is_none());
}

// End-to-end upload flow: stored selection, form submit, result checks and export
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use picgo_uploader::context::{UploaderContext, UserUploaderConfig};
use picgo_uploader::engine::{ImgInfo, MemoryEngine, UploadEngine, UploaderConfigItem};
use picgo_uploader::error::AppError;
use picgo_uploader::form::{UploadFormData, FILES_FIELD, UPLOADER_CONFIG_FIELD};
use picgo_uploader::format::find_format;
use picgo_uploader::settings::Preferences;
use picgo_uploader::storage::LocalStorage;
use picgo_uploader::upload;

fn unique_temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock error")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("picgo-uploader-flow-test-{nanos}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn setup() -> (Arc<MemoryEngine>, UploaderContext<MemoryEngine>, LocalStorage, PathBuf) {
    let engine = Arc::new(
        MemoryEngine::new()
            .with_uploader(
                "github",
                vec![UploaderConfigItem::new("g1", "Blog"), UploaderConfigItem::new("g2", "Work")],
            )
            .with_uploader("smms", vec![UploaderConfigItem::new("s1", "Default")])
            .with_active_uploader("github"),
    );
    let ctx = UploaderContext::new(Arc::clone(&engine), Preferences::default()).expect("create context");
    let dir = unique_temp_dir();
    let storage = LocalStorage::in_dir(&dir);
    (engine, ctx, storage, dir)
}

fn form(selection: &UserUploaderConfig, files: &[&str]) -> UploadFormData {
    let mut fields = HashMap::new();
    fields.insert(
        UPLOADER_CONFIG_FIELD.to_string(),
        vec![selection.to_json().expect("serialize selection")],
    );
    fields.insert(FILES_FIELD.to_string(), files.iter().map(|f| f.to_string()).collect());
    UploadFormData::from_fields(&fields).expect("parse form")
}

#[test]
fn restore_uses_stored_selection_when_available() {
    let (engine, ctx, storage, dir) = setup();
    storage
        .save_selection(&UserUploaderConfig::new("github", "g2"))
        .expect("save selection");

    let selection = upload::restore_selection(&ctx, &storage).expect("restore");
    assert_eq!(selection, UserUploaderConfig::new("github", "g2"));
    assert_eq!(engine.get_active_config("github").map(|c| c.id), Some("g2".to_string()));
    assert_eq!(upload::describe_selection(&ctx, &selection), "github [Work]");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn restore_replaces_stale_selection_and_saves_it() {
    let (_, ctx, storage, dir) = setup();
    storage
        .save_selection(&UserUploaderConfig::new("github", "removed"))
        .expect("save selection");

    let selection = upload::restore_selection(&ctx, &storage).expect("restore");
    assert_eq!(selection, UserUploaderConfig::new("github", "g1"));
    assert_eq!(storage.load_selection(), Some(selection));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn peek_reports_fallback_without_syncing_or_saving() {
    let (engine, ctx, storage, dir) = setup();
    storage
        .save_selection(&UserUploaderConfig::new("smms", "removed"))
        .expect("save selection");

    let selection = upload::peek_selection(&ctx, &storage).expect("peek");
    assert_eq!(selection, Some(UserUploaderConfig::new("github", "g1")));
    assert_eq!(ctx.active_uploader_type().as_deref(), Some("github"));
    assert_eq!(
        storage.load_selection(),
        Some(UserUploaderConfig::new("smms", "removed"))
    );
    assert_eq!(engine.get_active_config("github").map(|c| c.id), Some("g1".to_string()));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn peek_is_none_when_nothing_is_configured() {
    let ctx = UploaderContext::new(Arc::new(MemoryEngine::new()), Preferences::default()).expect("create context");
    let dir = unique_temp_dir();
    let storage = LocalStorage::in_dir(&dir);

    assert_eq!(upload::peek_selection(&ctx, &storage).expect("peek"), None);
    assert!(matches!(
        upload::restore_selection(&ctx, &storage),
        Err(AppError::NoAvailableConfig)
    ));
    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn submit_without_images_changes_nothing() {
    let (engine, ctx, storage, dir) = setup();
    let data = form(&UserUploaderConfig::new("smms", "s1"), &["/tmp/notes.txt"]);

    assert!(matches!(upload::submit(&ctx, &storage, &data).await, Err(AppError::NoImageFiles)));
    assert!(engine.upload_calls().is_empty());
    assert_eq!(ctx.active_uploader_type().as_deref(), Some("github"));
    assert_eq!(storage.load_selection(), None);
    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn submit_switches_config_and_uploads_only_images() {
    let (engine, ctx, storage, dir) = setup();
    let selection = UserUploaderConfig::new("smms", "s1");
    let data = form(&selection, &["/tmp/a.png", "/tmp/readme.md", "/tmp/b.JPG"]);

    let images = upload::submit(&ctx, &storage, &data).await.expect("submit");
    assert_eq!(images.len(), 2);
    assert_eq!(storage.load_selection(), Some(selection));

    let calls = engine.upload_calls();
    assert_eq!(calls[0].active_type.as_deref(), Some("smms"));
    assert_eq!(
        calls[0].input,
        Some(vec![PathBuf::from("/tmp/a.png"), PathBuf::from("/tmp/b.JPG")])
    );

    let text = find_format("markdown").expect("markdown").generate(&images, "");
    assert_eq!(
        text,
        "![](https://memory.picgo.local/a.png)\n![](https://memory.picgo.local/b.JPG)"
    );
    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn clipboard_upload_renders_custom_template() {
    let (engine, ctx, _storage, dir) = setup();
    engine.push_upload_result(Ok(vec![ImgInfo {
        file_name: Some("cat.png".to_string()),
        extname: Some(".png".to_string()),
        img_url: Some("http://a/cat.png".to_string()),
        error: None,
    }]));

    let images = upload::upload_clipboard(&ctx).await.expect("upload");
    assert_eq!(engine.upload_calls()[0].input, None);

    let template = &ctx.preferences().custom_format;
    assert_eq!(
        find_format("custom").expect("custom").generate(&images, template),
        "![cat](http://a/cat.png)"
    );
    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn empty_and_urlless_results_are_failures() {
    let (engine, ctx, _storage, dir) = setup();
    engine.push_upload_result(Ok(vec![]));
    engine.push_upload_result(Ok(vec![ImgInfo {
        error: Some("rejected".to_string()),
        ..ImgInfo::default()
    }]));

    let first = upload::upload_clipboard(&ctx).await;
    assert!(matches!(first, Err(AppError::NoResult)));

    let second = upload::upload_clipboard(&ctx).await.expect_err("no url");
    let failure = upload::UploadFailure::from_error(&second);
    assert_eq!(failure.message, "No url result returned");
    let _ = fs::remove_dir_all(dir);
}

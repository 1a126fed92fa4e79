use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use indy_replay::config::{Config, SettingsLoader};
use indy_replay::domain::DEFAULT_SHARED_GROUP;
use indy_replay::error::ReplayError;

#[test]
fn load_partial_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("indy-replay.json");
    fs::write(
        &path,
        r#"{ "download_dir": "/scratch/down", "workers": 8, "promote_target": "builds-untested" }"#,
    )
    .unwrap();

    let settings = SettingsLoader::resolve(path.to_str()).unwrap();
    assert_eq!(settings.download_dir, Utf8PathBuf::from("/scratch/down"));
    assert_eq!(settings.upload_dir, Utf8PathBuf::from("/tmp/upload"));
    assert_eq!(settings.workers, 8);
    assert_eq!(settings.promote_target, "builds-untested");
    assert_eq!(settings.shared_group, DEFAULT_SHARED_GROUP);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nope.json");
    assert_matches!(
        SettingsLoader::resolve(path.to_str()),
        Err(ReplayError::ConfigRead(_))
    );
}

#[test]
fn malformed_config_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bad.json");
    fs::write(&path, "{ workers: }").unwrap();
    assert_matches!(
        SettingsLoader::resolve(path.to_str()),
        Err(ReplayError::ConfigParse(_))
    );
}

#[test]
fn metadata_workers_default_to_four() {
    let settings = SettingsLoader::resolve_config(Config {
        workers: Some(3),
        ..Config::default()
    });
    assert_eq!(settings.workers, 3);
    assert_eq!(settings.metadata_workers, 4);
    assert_eq!(settings.http_timeout_secs, 300);
}

use dedupify::actions::KeepPolicy;
use dedupify::config::Config;
use dedupify::duplicates::SortKey;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
io_threads = 2
extra_ignored_dirs = ["exports", "tmp"]
progress_interval_ms = 250
keep = "oldest"
sort = "name"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path);
    assert_eq!(config.io_threads, 2);
    assert_eq!(config.extra_ignored_dirs, vec!["exports", "tmp"]);
    assert_eq!(config.progress_interval(), Duration::from_millis(250));
    assert_eq!(config.keep, Some(KeepPolicy::Oldest));
    assert_eq!(config.sort, SortKey::Name);
    assert!(config.verify_before_delete);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load_from_path(dir.path().join("absent.toml"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_invalid_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "io_threads = \"many\"\n").unwrap();

    assert_eq!(Config::load_from_path(&path), Config::default());
}

#[test]
fn test_zero_threads_is_raised_to_one() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "io_threads = 0\n").unwrap();

    assert_eq!(Config::load_from_path(&path).io_threads, 1);
}

#[test]
fn test_written_config_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let config = Config {
        io_threads: 6,
        keep: Some(KeepPolicy::Newest),
        ..Config::default()
    };
    fs::write(&path, config.to_toml().unwrap()).unwrap();

    assert_eq!(Config::load_from_path(&path), config);
}

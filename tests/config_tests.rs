use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use neardupe::config::{CliOverrides, Config, ConfigError};
use neardupe::scanner::ExtractionMode;
use neardupe::similarity::SelectionPolicy;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

// Environment variables are process-wide
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.window_size, 10);
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.mode, ExtractionMode::Raw);
    assert!(config.stopwords.is_none());
}

#[test]
fn test_config_load_from_toml() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
window_size = 12
size_ratio = 2.0
mode = "preprocessed"
select = "best"
workers = 4
extensions = ["txt", "md"]
stopwords = ["the", "a"]
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path), &CliOverrides::default()).unwrap();

    assert_eq!(config.window_size, 12);
    assert_eq!(config.size_ratio, 2.0);
    assert_eq!(config.mode, ExtractionMode::Preprocessed);
    assert_eq!(config.select, SelectionPolicy::BestTierOnly);
    assert_eq!(config.workers, 4);
    assert_eq!(config.extensions, vec!["txt", "md"]);
    assert_eq!(
        config.stopwords,
        Some(vec!["the".to_string(), "a".to_string()])
    );
    // Untouched fields keep their defaults
    assert_eq!(config.settle_delay_secs, 5);
}

#[test]
fn test_config_load_from_env() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var("NEARDUPE_WINDOW_SIZE", "16");
    std::env::set_var("NEARDUPE_SELECT", "off");

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("NEARDUPE_"));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.window_size, 16);
    assert_eq!(config.select, SelectionPolicy::Off);

    std::env::remove_var("NEARDUPE_WINDOW_SIZE");
    std::env::remove_var("NEARDUPE_SELECT");
}

#[test]
fn test_precedence_file_env_cli() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "window_size = 12\nworkers = 3\nio_threads = 2\n").unwrap();

    std::env::set_var("NEARDUPE_WORKERS", "5");
    std::env::set_var("NEARDUPE_IO_THREADS", "6");

    let overrides = CliOverrides {
        io_threads: Some(8),
        ..CliOverrides::default()
    };
    let config = Config::load(Some(&config_path), &overrides);

    std::env::remove_var("NEARDUPE_WORKERS");
    std::env::remove_var("NEARDUPE_IO_THREADS");

    let config = config.unwrap();
    assert_eq!(config.window_size, 12, "file beats default");
    assert_eq!(config.workers, 5, "env beats file");
    assert_eq!(config.io_threads, 8, "cli beats env");
}

#[test]
fn test_invalid_values_rejected() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = 0\n").unwrap();

    let result = Config::load(Some(&config_path), &CliOverrides::default());
    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "workers",
            ..
        })
    ));

    let result = Config::load(
        Some(&config_path),
        &CliOverrides {
            window_size: Some(0),
            ..CliOverrides::default()
        },
    );
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_malformed_toml() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "window_size = \"many\"\n").unwrap();

    let result = Config::load(Some(&config_path), &CliOverrides::default());
    assert!(matches!(result, Err(ConfigError::Figment(_))));
}

#[test]
fn test_toml_file_provider_directly() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "ignore_suffixes = [\".download\"]\nstem = false\n").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.ignore_suffixes, vec![".download"]);
    assert!(!config.stem);
}

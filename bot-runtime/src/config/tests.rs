//! Config tests.

use std::collections::HashMap;
use std::env;
use std::io::Write;
use std::time::Duration;

use notifier_core::NotifierError;
use serial_test::serial;

use super::{CliOverrides, Config, DEFAULT_CONFIG_PATH};

const MINIMAL_YAML: &str = r#"
graphql_endpoint: https://overwatch.example.com/graphql
telegram_api_token: "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"
"#;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn assert_config_error(result: notifier_core::Result<Config>, needle: &str) {
    match result {
        Err(NotifierError::Config(msg)) => assert!(msg.contains(needle), "{}", msg),
        other => panic!("expected Config error containing {:?}, got {:?}", needle, other),
    }
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml_str(MINIMAL_YAML, &CliOverrides::default(), no_env).unwrap();

    assert_eq!(config.graphql_endpoint, "https://overwatch.example.com/graphql");
    assert_eq!(config.bind_host, "127.0.0.1");
    assert_eq!(config.bind_port, 5000);
    assert_eq!(config.telegram_api_url, "https://api.telegram.org");
    assert!(config.public_url.is_none());
    assert!(config.telegram_chat_id.is_none());
    assert!(!config.development_mode);
    assert_eq!(config.sleep_interval, Duration::from_secs(5));
    assert_eq!(config.retry_delay, Duration::from_secs(60));
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.shutdown_grace_period, Duration::from_secs(10));
    assert_eq!(config.watchdog_delay, Duration::from_secs(600));
    assert!(config.webhook_url().is_none());
}

#[test]
fn test_full_config_file() {
    let yaml = r#"
bind_host: 0.0.0.0
bind_port: 8080
graphql_endpoint: https://user:pw@overwatch.example.com/graphql
public_url: https://bot.example.com/
telegram_api_token: token-from-file
telegram_chat_id: -1001234567890
telegram_webhook_secret: s3cret_token
sleep_interval: 2.5
watchdog_delay: 0
"#;
    let config = Config::from_yaml_str(yaml, &CliOverrides::default(), no_env).unwrap();

    assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    assert_eq!(config.telegram_chat_id.as_deref(), Some("-1001234567890"));
    assert_eq!(config.sleep_interval, Duration::from_millis(2500));
    assert_eq!(config.watchdog_delay, Duration::ZERO);
    assert_eq!(
        config.webhook_url().as_deref(),
        Some("https://bot.example.com/telegram-webhook")
    );
}

#[test]
fn test_debug_output_hides_secrets() {
    let yaml = format!(
        "{}\ntelegram_webhook_secret: s3cret_token\n",
        MINIMAL_YAML.replace(
            "https://overwatch.example.com",
            "https://user:pw@overwatch.example.com"
        )
    );
    let config = Config::from_yaml_str(&yaml, &CliOverrides::default(), no_env).unwrap();
    let debug = format!("{:?}", config);

    assert!(!debug.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
    assert!(!debug.contains("s3cret_token"));
    assert!(!debug.contains(":pw@"));
}

#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    let env = env_from(&[
        ("BIND_HOST", "10.0.0.1"),
        ("BIND_PORT", "6000"),
        ("GRAPHQL_ENDPOINT", "http://localhost:8000/graphql"),
        ("TELEGRAM_API_TOKEN", "env-token"),
        ("TELEGRAM_CHAT_ID", "42"),
        ("PUBLIC_URL", ""),
    ]);
    let overrides = CliOverrides {
        host: None,
        port: Some(7000),
        development_mode: true,
    };

    let config = Config::from_yaml_str(MINIMAL_YAML, &overrides, env).unwrap();

    assert_eq!(config.bind_host, "10.0.0.1");
    assert_eq!(config.bind_port, 7000);
    assert_eq!(config.graphql_endpoint, "http://localhost:8000/graphql");
    assert_eq!(config.telegram_api_token, "env-token");
    assert_eq!(config.telegram_chat_id.as_deref(), Some("42"));
    assert!(config.public_url.is_none());
    assert!(config.development_mode);
}

#[test]
fn test_missing_credential_is_config_error() {
    let yaml = "graphql_endpoint: https://overwatch.example.com/graphql\n";
    assert_config_error(
        Config::from_yaml_str(yaml, &CliOverrides::default(), no_env),
        "telegram_api_token",
    );
}

#[test]
fn test_missing_endpoint_is_config_error() {
    let yaml = "telegram_api_token: abc\n";
    assert_config_error(
        Config::from_yaml_str(yaml, &CliOverrides::default(), no_env),
        "graphql_endpoint",
    );
}

#[test]
fn test_empty_file_is_config_error() {
    assert_config_error(
        Config::from_yaml_str("", &CliOverrides::default(), no_env),
        "missing required key",
    );
}

#[test]
fn test_invalid_yaml_is_config_error() {
    let yaml = "graphql_endpoint: [unclosed\ntelegram_api_token: abc\n";
    assert_config_error(
        Config::from_yaml_str(yaml, &CliOverrides::default(), no_env),
        "invalid YAML",
    );
}

#[test]
fn test_non_mapping_yaml_is_config_error() {
    assert_config_error(
        Config::from_yaml_str("- a\n- b\n", &CliOverrides::default(), no_env),
        "mapping",
    );
}

#[test]
fn test_wrong_value_type_is_config_error() {
    let yaml = format!("{}\nbind_port: not-a-port\n", MINIMAL_YAML);
    assert_config_error(
        Config::from_yaml_str(&yaml, &CliOverrides::default(), no_env),
        "invalid configuration",
    );
}

#[test]
fn test_invalid_urls_are_config_errors() {
    let yaml = "graphql_endpoint: not a url\ntelegram_api_token: abc\n";
    assert_config_error(
        Config::from_yaml_str(yaml, &CliOverrides::default(), no_env),
        "graphql_endpoint",
    );

    let yaml = "graphql_endpoint: ftp://example.com/x\ntelegram_api_token: abc\n";
    assert_config_error(
        Config::from_yaml_str(yaml, &CliOverrides::default(), no_env),
        "http or https",
    );

    let yaml = format!("{}\npublic_url: nope\n", MINIMAL_YAML);
    assert_config_error(
        Config::from_yaml_str(&yaml, &CliOverrides::default(), no_env),
        "public_url",
    );
}

#[test]
fn test_non_positive_interval_is_config_error() {
    let yaml = format!("{}\nsleep_interval: 0\n", MINIMAL_YAML);
    assert_config_error(
        Config::from_yaml_str(&yaml, &CliOverrides::default(), no_env),
        "sleep_interval",
    );
}

#[test]
fn test_oversized_interval_is_config_error() {
    let yaml = format!("{}\nsleep_interval: 1.0e30\n", MINIMAL_YAML);
    assert_config_error(
        Config::from_yaml_str(&yaml, &CliOverrides::default(), no_env),
        "sleep_interval",
    );
}

#[test]
fn test_invalid_webhook_secret_is_config_error() {
    let yaml = format!("{}\ntelegram_webhook_secret: \"has space\"\n", MINIMAL_YAML);
    assert_config_error(
        Config::from_yaml_str(&yaml, &CliOverrides::default(), no_env),
        "telegram_webhook_secret",
    );
}

#[test]
fn test_bad_bind_port_env_is_config_error() {
    assert_config_error(
        Config::from_yaml_str(
            MINIMAL_YAML,
            &CliOverrides::default(),
            env_from(&[("BIND_PORT", "http")]),
        ),
        "BIND_PORT",
    );
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    assert_config_error(
        Config::load_with_env(&path, &CliOverrides::default(), no_env),
        "not found",
    );
}

#[test]
fn test_resolve_path() {
    assert_eq!(
        Config::resolve_path(None),
        std::path::PathBuf::from(DEFAULT_CONFIG_PATH)
    );
    assert_eq!(
        Config::resolve_path(Some(std::path::Path::new("/etc/ow.yaml"))),
        std::path::PathBuf::from("/etc/ow.yaml")
    );
}

#[test]
#[serial]
fn test_load_reads_process_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL_YAML.as_bytes()).unwrap();

    env::set_var("TELEGRAM_API_TOKEN", "process-env-token");
    env::remove_var("GRAPHQL_ENDPOINT");
    env::remove_var("BIND_HOST");
    env::remove_var("BIND_PORT");
    env::remove_var("PUBLIC_URL");
    env::remove_var("TELEGRAM_CHAT_ID");
    env::remove_var("TELEGRAM_API_URL");

    let config = Config::load(file.path(), &CliOverrides::default()).unwrap();

    env::remove_var("TELEGRAM_API_TOKEN");

    assert_eq!(config.telegram_api_token, "process-env-token");
    assert_eq!(config.graphql_endpoint, "https://overwatch.example.com/graphql");
}

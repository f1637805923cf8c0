//! Shared helpers for bot-runtime integration tests.

#![allow(dead_code)]

pub mod mock_bot;

use std::sync::Arc;

use bot_runtime::{CliOverrides, Config};

/// Config pointing at unroutable endpoints; `extra` is appended to the YAML.
pub fn test_config(extra: &str) -> Config {
    let yaml = format!(
        "graphql_endpoint: http://127.0.0.1:9/graphql\ntelegram_api_token: test-token\n{}",
        extra
    );
    Config::from_yaml_str(&yaml, &CliOverrides::default(), |_: &str| None).unwrap()
}

pub fn shared_config(extra: &str) -> Arc<Config> {
    Arc::new(test_config(extra))
}

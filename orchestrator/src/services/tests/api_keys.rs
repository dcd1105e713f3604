//! Tests for environment and `.env` based API key loading

use std::env;
use std::fs;

use crate::services::api_keys::{RealApiKeySource, StaticApiKeySource};
use crate::traits::ApiKeySource;

/// Keys from a `.env` file in the working directory are picked up
#[test]
fn test_env_file_loading() {
    // Save current working directory
    let original_dir = env::current_dir().unwrap();

    // Create a temporary directory for this test
    let temp_dir = tempfile::tempdir().unwrap();
    env::set_current_dir(&temp_dir).unwrap();
    fs::write(".env", "IPINTEL_TEST_DOTENV_KEY=from-dotenv\n").unwrap();
    env::remove_var("IPINTEL_TEST_DOTENV_KEY");

    let source = RealApiKeySource::new();
    let key = source.api_key("IPINTEL_TEST_DOTENV_KEY");

    // Restore original directory
    env::set_current_dir(original_dir).unwrap();

    assert_eq!(key.as_deref(), Some("from-dotenv"));
}

/// Environment variables are read directly and blank values count as missing
#[test]
fn test_environment_variables() {
    env::set_var("IPINTEL_TEST_PRESENT_KEY", "abc123");
    env::set_var("IPINTEL_TEST_BLANK_KEY", "   ");

    let source = RealApiKeySource::new();

    assert_eq!(source.api_key("IPINTEL_TEST_PRESENT_KEY").as_deref(), Some("abc123"));
    assert_eq!(source.api_key("IPINTEL_TEST_BLANK_KEY"), None);
    assert_eq!(source.api_key("IPINTEL_TEST_NEVER_SET_KEY"), None);
}

#[test]
fn test_static_source() {
    let source = StaticApiKeySource::new()
        .with_key("ABUSEIPDB_API_KEY", "abuse")
        .with_key("IPINFO_TOKEN", "info");

    assert_eq!(source.api_key("ABUSEIPDB_API_KEY").as_deref(), Some("abuse"));
    assert_eq!(source.api_key("IPINFO_TOKEN").as_deref(), Some("info"));
    assert_eq!(source.api_key("OTHER"), None);
}

//! Integration tests for environment-based configuration

use serial_test::serial;
use sonar_agent::{ConfigError, SonarConfigBuilder};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const SONAR_ENV_VARS: &[&str] = &[
    "SONAR_LOG_PATH",
    "ENVIRONMENT",
    "SONAR_AGENT_NAME",
    "SONAR_REMOTE_TIMEOUT_MS",
    "SONAR_MAX_ITERATIONS",
    "LANGFUSE_PUBLIC_KEY",
    "LANGFUSE_SECRET_KEY",
    "LANGFUSE_HOST",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "SONAR_MODEL",
    "SONAR_TEMPERATURE",
];

/// Helper to set environment variable for test
fn set_env(key: &str, value: &str) {
    unsafe {
        env::set_var(key, value);
    }
}

fn clear_all_sonar_env_vars() {
    for key in SONAR_ENV_VARS {
        unsafe {
            env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_env_config_default_when_no_vars_set() {
    clear_all_sonar_env_vars();

    let config = SonarConfigBuilder::from_env()
        .expect("should load defaults when no env vars set")
        .build()
        .expect("should build valid config");

    assert_eq!(config.agent_name.as_str(), "research_agent");
    assert_eq!(config.max_iterations, 8);
    assert_eq!(config.telemetry.log_path, PathBuf::from("agent_logs.json"));
    assert_eq!(config.telemetry.environment, "development");
    assert_eq!(config.telemetry.remote_timeout, Duration::from_millis(2000));
    assert!(config.telemetry.remote.is_none());
    assert!(config.openai.is_none());
}

#[test]
#[serial]
fn test_env_config_telemetry_settings() {
    clear_all_sonar_env_vars();
    set_env("SONAR_LOG_PATH", "/tmp/sonar/events.jsonl");
    set_env("ENVIRONMENT", "production");
    set_env("SONAR_REMOTE_TIMEOUT_MS", "500");

    let config = SonarConfigBuilder::from_env()
        .expect("should load config")
        .build()
        .expect("should build valid config");

    assert_eq!(
        config.telemetry.log_path,
        PathBuf::from("/tmp/sonar/events.jsonl")
    );
    assert_eq!(config.telemetry.environment, "production");
    assert_eq!(config.telemetry.remote_timeout, Duration::from_millis(500));

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_langfuse_enables_remote() {
    clear_all_sonar_env_vars();
    set_env("LANGFUSE_PUBLIC_KEY", "pk-lf-1");
    set_env("LANGFUSE_SECRET_KEY", "sk-lf-1");
    set_env("LANGFUSE_HOST", "http://localhost:3000");

    let config = SonarConfigBuilder::from_env()
        .expect("should load config")
        .build()
        .expect("should build valid config");

    let remote = config.telemetry.remote.expect("remote export enabled");
    assert_eq!(remote.public_key, "pk-lf-1");
    assert_eq!(remote.secret_key, "sk-lf-1");
    assert_eq!(remote.host, "http://localhost:3000");

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_langfuse_default_host() {
    clear_all_sonar_env_vars();
    set_env("LANGFUSE_PUBLIC_KEY", "pk");
    set_env("LANGFUSE_SECRET_KEY", "sk");

    let config = SonarConfigBuilder::from_env().unwrap().build().unwrap();
    assert_eq!(
        config.telemetry.remote.unwrap().host,
        "https://cloud.langfuse.com"
    );

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_half_langfuse_credentials_rejected() {
    clear_all_sonar_env_vars();
    set_env("LANGFUSE_PUBLIC_KEY", "pk-lf-1");

    let result = SonarConfigBuilder::from_env()
        .expect("should load config")
        .build();

    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("must be set together")
    );

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_agent_settings() {
    clear_all_sonar_env_vars();
    set_env("SONAR_AGENT_NAME", "scout");
    set_env("SONAR_MAX_ITERATIONS", "12");

    let config = SonarConfigBuilder::from_env().unwrap().build().unwrap();
    assert_eq!(config.agent_name.as_str(), "scout");
    assert_eq!(config.max_iterations, 12);
    assert_eq!(config.profile().trace_name(), "scout_execution");

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_openai_settings() {
    clear_all_sonar_env_vars();
    set_env("OPENAI_API_KEY", "sk-test");
    set_env("OPENAI_BASE_URL", "http://localhost:8080/v1");
    set_env("SONAR_MODEL", "gpt-4o-mini");
    set_env("SONAR_TEMPERATURE", "0.7");

    let config = SonarConfigBuilder::from_env().unwrap().build().unwrap();
    let openai = config.openai.expect("openai backend configured");
    assert_eq!(openai.api_key, "sk-test");
    assert_eq!(openai.base_url, "http://localhost:8080/v1");
    assert_eq!(openai.model, "gpt-4o-mini");
    assert!((openai.temperature - 0.7).abs() < f32::EPSILON);

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_number() {
    clear_all_sonar_env_vars();
    set_env("SONAR_MAX_ITERATIONS", "many");

    let result = SonarConfigBuilder::from_env();
    match result {
        Err(ConfigError::InvalidEnvVar { key, message }) => {
            assert_eq!(key, "SONAR_MAX_ITERATIONS");
            assert!(message.contains("many"));
        }
        other => panic!("expected InvalidEnvVar, got {other:?}"),
    }

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_temperature() {
    clear_all_sonar_env_vars();
    set_env("SONAR_TEMPERATURE", "hot");

    assert!(matches!(
        SonarConfigBuilder::from_env(),
        Err(ConfigError::InvalidEnvVar { .. })
    ));

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_validation_remote_timeout() {
    clear_all_sonar_env_vars();
    set_env("SONAR_REMOTE_TIMEOUT_MS", "0");

    let result = SonarConfigBuilder::from_env().unwrap().build();
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("remote_timeout_ms must be greater than 0")
    );

    set_env("SONAR_REMOTE_TIMEOUT_MS", "30001");
    let result = SonarConfigBuilder::from_env().unwrap().build();
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("remote_timeout_ms must be <= 30000")
    );

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_validation_max_iterations() {
    clear_all_sonar_env_vars();
    set_env("SONAR_MAX_ITERATIONS", "100");

    let result = SonarConfigBuilder::from_env().unwrap().build();
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("max_iterations must be <= 64")
    );

    clear_all_sonar_env_vars();
}

#[test]
#[serial]
fn test_env_config_builder_overrides_env() {
    clear_all_sonar_env_vars();
    set_env("SONAR_MAX_ITERATIONS", "4");

    let config = SonarConfigBuilder::from_env()
        .unwrap()
        .max_iterations(6)
        .build()
        .unwrap();
    assert_eq!(config.max_iterations, 6);

    clear_all_sonar_env_vars();
}

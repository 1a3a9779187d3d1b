//! Configuration loader for relaybot.
//!
//! Finds `relaybot.toml`, deserializes it into [`BotConfig`], applies
//! environment overrides, and validates the result. Unlike a best-effort
//! settings file, a broken bot config is fatal: the process cannot relay
//! anything without an inference endpoint.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use relaybot_types::config::BotConfig;
use relaybot_types::error::ConfigError;

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "relaybot.toml";

/// Environment variable that overrides `telegram.token`.
pub const TOKEN_ENV_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// Candidate config paths, most specific first.
///
/// An explicit path (from `--config` or `RELAYBOT_CONFIG`) is the only
/// candidate when given. Otherwise `./relaybot.toml`, then
/// `{config_dir}/relaybot/config.toml`.
pub fn config_search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("relaybot").join("config.toml"));
    }
    paths
}

/// Locate, parse, override, and validate the bot configuration.
pub async fn load_bot_config(explicit: Option<&Path>) -> Result<BotConfig, ConfigError> {
    let candidates = config_search_paths(explicit);
    let mut found = None;
    for candidate in &candidates {
        if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
            found = Some(candidate.clone());
            break;
        }
    }
    let path = found.ok_or(ConfigError::NotFound(candidates))?;

    let mut config = load_bot_config_from(&path).await?;
    apply_env_overrides(&mut config, std::env::var(TOKEN_ENV_VAR).ok());
    config.validate()?;
    Ok(config)
}

/// Read and parse one config file without overrides or validation.
pub async fn load_bot_config_from(path: &Path) -> Result<BotConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let config = toml::from_str::<BotConfig>(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Apply environment overrides. A blank token value is ignored.
pub fn apply_env_overrides(config: &mut BotConfig, token: Option<String>) {
    if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
        tracing::debug!("Using Telegram token from {TOKEN_ENV_VAR}");
        config.telegram.token = SecretString::from(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_types::chat::TrimPolicy;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    const VALID: &str = r#"
[telegram]
token = "from-file"
username = "mathbot"

[ollama]
base_url = "http://localhost:11434"
model = "qwen2.5:7b"

[history]
max_messages = 6
trim_policy = "fifo"
"#;

    async fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("relaybot.toml");
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[test]
    fn search_paths_explicit_only() {
        let paths = config_search_paths(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(paths, vec![PathBuf::from("/tmp/custom.toml")]);
    }

    #[test]
    fn search_paths_default_order() {
        let paths = config_search_paths(None);
        assert_eq!(paths[0], PathBuf::from(LOCAL_CONFIG_FILE));
        if paths.len() > 1 {
            assert!(paths[1].ends_with("relaybot/config.toml"));
        }
    }

    #[tokio::test]
    async fn load_valid_config() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, VALID).await;

        let config = load_bot_config(Some(&path)).await.unwrap();
        assert_eq!(config.ollama.model, "qwen2.5:7b");
        assert_eq!(config.ollama.request_timeout_secs, 120);
        assert_eq!(config.history.max_messages, 6);
        assert_eq!(config.history.trim_policy, TrimPolicy::Fifo);
        assert_eq!(config.telegram.username, "mathbot");
    }

    #[tokio::test]
    async fn load_missing_explicit_path_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");

        let err = load_bot_config(Some(&path)).await.unwrap_err();
        match err {
            ConfigError::NotFound(paths) => assert_eq!(paths, vec![path]),
            other => panic!("Expected NotFound, got: {other}"),
        }
    }

    #[tokio::test]
    async fn load_invalid_toml_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "this is not { valid toml !!!").await;

        let err = load_bot_config(Some(&path)).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("relaybot.toml"));
    }

    #[tokio::test]
    async fn load_rejects_small_history_bound() {
        let tmp = TempDir::new().unwrap();
        let content = VALID.replace("max_messages = 6", "max_messages = 1");
        let path = write_config(&tmp, &content).await;

        let err = load_bot_config(Some(&path)).await.unwrap_err();
        assert!(matches!(err, ConfigError::HistoryBoundTooSmall(1)));
    }

    #[tokio::test]
    async fn load_without_telegram_section_still_succeeds() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "[ollama]\nbase_url = \"http://localhost:11434\"\nmodel = \"llama3.1\"\n",
        )
        .await;

        let config = load_bot_config_from(&path).await.unwrap();
        config.validate().unwrap();
        assert!(config.telegram.validate().is_err());
    }

    #[tokio::test]
    async fn env_token_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, VALID).await;
        let mut config = load_bot_config_from(&path).await.unwrap();

        apply_env_overrides(&mut config, Some("from-env".to_string()));
        assert_eq!(config.telegram.token.expose_secret(), "from-env");
    }

    #[tokio::test]
    async fn blank_env_token_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, VALID).await;
        let mut config = load_bot_config_from(&path).await.unwrap();

        apply_env_overrides(&mut config, Some("   ".to_string()));
        apply_env_overrides(&mut config, None);
        assert_eq!(config.telegram.token.expose_secret(), "from-file");
    }
}

mod defaults;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RajniError;
use defaults::*;

/// Environment variable holding the completion-provider API key.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the keyed-record service URL.
pub const ENV_STORE_URL: &str = "RECORD_STORE_URL";
/// Environment variable holding the keyed-record service access key.
pub const ENV_STORE_KEY: &str = "RECORD_STORE_KEY";

/// Top-level RajniAI configuration (tunables only; secrets live in [`Secrets`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rajni: RajniConfig,
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub store: StoreConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RajniConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RajniConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Completion and speech provider tunables.
///
/// Temperature stays in the 0.6–0.8 band and penalties stay light; the exact
/// values are tuning, not contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,
    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,
    #[serde(default = "default_transcribe_model")]
    pub transcribe_model: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            chat_model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            presence_penalty: default_penalty(),
            frequency_penalty: default_penalty(),
            transcribe_model: default_transcribe_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
        }
    }
}

/// Keyed-record store tunables (table names; URL and key come from env).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_preferences_table")]
    pub preferences_table: String,
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            preferences_table: default_preferences_table(),
            profiles_table: default_profiles_table(),
        }
    }
}

/// Required secrets, read from the environment at startup.
///
/// Absence of any is fatal: the process refuses to serve rather than run
/// degraded.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub openai_api_key: String,
    pub store_url: String,
    pub store_key: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self, RajniError> {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let secrets = Self {
            openai_api_key: read(ENV_OPENAI_API_KEY),
            store_url: read(ENV_STORE_URL),
            store_key: read(ENV_STORE_KEY),
        };

        if missing.is_empty() {
            Ok(secrets)
        } else {
            Err(RajniError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, RajniError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| RajniError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| RajniError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_file_missing() {
        let cfg = load("/nonexistent/rajni.toml").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.openai.chat_model, "gpt-3.5-turbo");
        assert_eq!(cfg.store.preferences_table, "user_preferences");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "[server]\nport = 9000\n\n[openai]\ntemperature = 0.65\n"
        )
        .unwrap();
        let cfg = load(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert!((cfg.openai.temperature - 0.65).abs() < f32::EPSILON);
        assert_eq!(cfg.openai.max_tokens, 500);
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "this is not toml [").unwrap();
        let err = load(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, RajniError::Config(_)));
    }

    #[test]
    fn test_secrets_missing_env_lists_all_names() {
        // Serialize env access: each var is cleared for the duration.
        let vars = [ENV_OPENAI_API_KEY, ENV_STORE_URL, ENV_STORE_KEY];
        let saved: Vec<_> = vars.iter().map(|v| std::env::var(v).ok()).collect();
        for v in vars {
            std::env::remove_var(v);
        }

        let err = Secrets::from_env().unwrap_err();
        let msg = err.to_string();
        for v in vars {
            assert!(msg.contains(v), "expected {v} in {msg}");
        }

        for (v, old) in vars.iter().zip(saved) {
            if let Some(val) = old {
                std::env::set_var(v, val);
            }
        }
    }
}

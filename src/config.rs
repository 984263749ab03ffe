//! Configuration types.
//!
//! Everything is read once at startup from environment variables and passed
//! into component constructors. Lookups go through an `Env` function so tests
//! can supply a map instead of touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::channels::email::EmailConfig;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Variable lookup: returns `None` for unset or blank values.
pub type Env<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read from the process environment, treating blank values as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn required(env: Env<'_>, key: &str, hint: &str) -> Result<String, ConfigError> {
    env(key).ok_or_else(|| ConfigError::MissingRequired {
        key: key.to_string(),
        hint: hint.to_string(),
    })
}

pub(crate) fn parsed<T: std::str::FromStr>(
    env: Env<'_>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse '{raw}'"),
        }),
    }
}

fn flag(env: Env<'_>, key: &str) -> Result<bool, ConfigError> {
    match env(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{v}'"),
        }),
    }
}

// ── LLM credentials ─────────────────────────────────────────────────

/// Resolve the model settings for one component.
///
/// `<PREFIX>_BACKEND`, `<PREFIX>_API_KEY`, `<PREFIX>_MODEL` and
/// `<PREFIX>_BASE_URL` override the shared `LLM_*` values.
pub fn llm_config(env: Env<'_>, prefix: &str) -> Result<LlmConfig, ConfigError> {
    let scoped = |suffix: &str| env(&format!("{prefix}_{suffix}")).or_else(|| env(&format!("LLM_{suffix}")));

    let backend = match scoped("BACKEND") {
        Some(raw) => raw.parse::<LlmBackend>()?,
        None => LlmBackend::Groq,
    };

    let api_key = scoped("API_KEY").ok_or_else(|| ConfigError::MissingRequired {
        key: format!("{prefix}_API_KEY"),
        hint: "Set it, or set LLM_API_KEY to share one key across components.".into(),
    })?;

    let base_url = scoped("BASE_URL");
    if backend == LlmBackend::Compatible && base_url.is_none() {
        return Err(ConfigError::MissingRequired {
            key: format!("{prefix}_BASE_URL"),
            hint: "The 'compatible' backend needs an explicit base URL.".into(),
        });
    }

    let model = scoped("MODEL")
        .or_else(|| backend.default_model().map(str::to_string))
        .ok_or_else(|| ConfigError::MissingRequired {
            key: format!("{prefix}_MODEL"),
            hint: format!("No default model for backend '{}'.", backend.as_str()),
        })?;

    Ok(LlmConfig {
        backend,
        api_key: SecretString::from(api_key),
        model,
        base_url,
    })
}

// ── Data service ────────────────────────────────────────────────────

const DEFAULT_MCP_ENDPOINT: &str = "http://localhost:8080/mcp/stream";

/// Local data-aggregation service (JSON-RPC over HTTP).
#[derive(Debug, Clone)]
pub struct DataServiceConfig {
    pub endpoint: String,
    pub session_id: SecretString,
    /// `None` leaves the HTTP client's default in place.
    pub timeout: Option<Duration>,
}

impl DataServiceConfig {
    pub fn from_env(env: Env<'_>) -> Result<Self, ConfigError> {
        let endpoint = env("MCP_ENDPOINT").unwrap_or_else(|| DEFAULT_MCP_ENDPOINT.to_string());
        let session_id = required(
            env,
            "MCP_SESSION_ID",
            "The data service identifies the session by the Mcp-Session-Id header.",
        )?;
        let timeout = match env("MCP_TIMEOUT_SECS") {
            None => None,
            Some(_) => Some(Duration::from_secs(parsed(env, "MCP_TIMEOUT_SECS", 0u64)?)),
        };

        Ok(Self {
            endpoint,
            session_id: SecretString::from(session_id),
            timeout,
        })
    }
}

// ── Advisors ────────────────────────────────────────────────────────

const DEFAULT_MFAPI_URL: &str = "https://api.mfapi.in/mf";
const DEFAULT_FUND_COUNT: usize = 15;

/// Public mutual fund catalog used by the SIP advisor.
#[derive(Debug, Clone)]
pub struct FundCatalogConfig {
    pub url: String,
    pub fund_count: usize,
}

impl Default for FundCatalogConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MFAPI_URL.to_string(),
            fund_count: DEFAULT_FUND_COUNT,
        }
    }
}

/// One `LlmConfig` per advisor, plus advisor-specific inputs.
#[derive(Debug, Clone)]
pub struct AdvisorsConfig {
    pub finance: LlmConfig,
    pub goal_planner: LlmConfig,
    pub sip_advisor: LlmConfig,
    pub fi_qa: LlmConfig,
    pub trade_executor: LlmConfig,
    pub knowledge_base_path: Option<PathBuf>,
    pub fund_catalog: FundCatalogConfig,
}

impl AdvisorsConfig {
    pub fn from_env(env: Env<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            finance: llm_config(env, "FINANCE")?,
            goal_planner: llm_config(env, "GOAL_PLANNER")?,
            sip_advisor: llm_config(env, "SIP_ADVISOR")?,
            fi_qa: llm_config(env, "FI_QA")?,
            trade_executor: llm_config(env, "TRADE_EXECUTOR")?,
            knowledge_base_path: env("FI_QA_KNOWLEDGE_BASE").map(PathBuf::from),
            fund_catalog: FundCatalogConfig {
                url: env("MFAPI_URL").unwrap_or_else(|| DEFAULT_MFAPI_URL.to_string()),
                fund_count: parsed(env, "MFAPI_FUND_COUNT", DEFAULT_FUND_COUNT)?,
            },
        })
    }
}

// ── Application ─────────────────────────────────────────────────────

const DEFAULT_HANDOFF_PATH: &str = "temp_email.json";

/// Full configuration for one `run`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub email: EmailConfig,
    pub data_service: DataServiceConfig,
    pub categorizer: LlmConfig,
    pub advisors: AdvisorsConfig,
    /// Set when replies should be rewritten by a model before sending.
    pub reply_drafting: Option<LlmConfig>,
    pub handoff_path: PathBuf,
}

impl AppConfig {
    /// Build from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(&process_env)
    }

    pub fn from_env(env: Env<'_>) -> Result<Self, ConfigError> {
        let reply_drafting = if flag(env, "REPLY_DRAFTING")? {
            Some(llm_config(env, "REPLY")?)
        } else {
            None
        };

        Ok(Self {
            email: EmailConfig::from_env(env)?,
            data_service: DataServiceConfig::from_env(env)?,
            categorizer: llm_config(env, "CATEGORIZER")?,
            advisors: AdvisorsConfig::from_env(env)?,
            reply_drafting,
            handoff_path: handoff_path(env),
        })
    }
}

/// Location of the intermediate handoff file.
pub fn handoff_path(env: Env<'_>) -> PathBuf {
    env("MAIL_ADVISOR_HANDOFF_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HANDOFF_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned().filter(|v| !v.trim().is_empty())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("LLM_API_KEY", "shared-key"),
            ("EMAIL_IMAP_HOST", "imap.example.com"),
            ("EMAIL_USERNAME", "advisor@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
            ("MCP_SESSION_ID", "mcp-session-1"),
        ]
    }

    #[test]
    fn minimal_environment_loads_with_defaults() {
        let env = env_from(&minimal());
        let config = AppConfig::from_env(&env).unwrap();

        assert_eq!(config.categorizer.backend, LlmBackend::Groq);
        assert_eq!(config.categorizer.model, "llama-3.3-70b-versatile");
        assert_eq!(config.categorizer.api_key.expose_secret(), "shared-key");
        assert_eq!(config.data_service.endpoint, "http://localhost:8080/mcp/stream");
        assert!(config.data_service.timeout.is_none());
        assert_eq!(config.handoff_path, PathBuf::from("temp_email.json"));
        assert!(config.reply_drafting.is_none());
        assert_eq!(config.advisors.fund_catalog.fund_count, 15);
        assert_eq!(config.email.smtp_host, "smtp.example.com");
    }

    #[test]
    fn component_overrides_win_over_shared_values() {
        let mut pairs = minimal();
        pairs.extend([
            ("SIP_ADVISOR_BACKEND", "gemini"),
            ("SIP_ADVISOR_API_KEY", "gemini-key"),
            ("FINANCE_MODEL", "llama3-70b-8192"),
        ]);
        let env = env_from(&pairs);
        let config = AppConfig::from_env(&env).unwrap();

        let sip = &config.advisors.sip_advisor;
        assert_eq!(sip.backend, LlmBackend::Gemini);
        assert_eq!(sip.model, "gemini-2.0-flash");
        assert_eq!(sip.api_key.expose_secret(), "gemini-key");

        assert_eq!(config.advisors.finance.model, "llama3-70b-8192");
        assert_eq!(config.advisors.goal_planner.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let pairs: Vec<_> = minimal()
            .into_iter()
            .filter(|(k, _)| *k != "LLM_API_KEY")
            .collect();
        let env = env_from(&pairs);
        let err = AppConfig::from_env(&env).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "CATEGORIZER_API_KEY")
        );
    }

    #[test]
    fn missing_session_id_fails_fast() {
        let pairs: Vec<_> = minimal()
            .into_iter()
            .filter(|(k, _)| *k != "MCP_SESSION_ID")
            .collect();
        let env = env_from(&pairs);
        assert!(matches!(
            AppConfig::from_env(&env),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn compatible_backend_requires_base_url() {
        let env = env_from(&[("LLM_API_KEY", "k"), ("LLM_BACKEND", "compatible")]);
        let err = llm_config(&env, "CATEGORIZER").unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "CATEGORIZER_BASE_URL")
        );
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let mut pairs = minimal();
        pairs.push(("MCP_TIMEOUT_SECS", "soon"));
        let env = env_from(&pairs);
        assert!(matches!(
            AppConfig::from_env(&env),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn reply_drafting_flag_enables_reply_model() {
        let mut pairs = minimal();
        pairs.extend([("REPLY_DRAFTING", "true"), ("REPLY_MODEL", "llama3-8b")]);
        let env = env_from(&pairs);
        let config = AppConfig::from_env(&env).unwrap();
        assert_eq!(config.reply_drafting.unwrap().model, "llama3-8b");
    }

    #[test]
    fn bad_flag_is_rejected() {
        let env = env_from(&[("REPLY_DRAFTING", "maybe")]);
        assert!(flag(&env, "REPLY_DRAFTING").is_err());
    }
}

use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_optional_env, Environment};
use service_core::error::AppError;

/// Chat model used when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI-compatible API root used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct NotesConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub cors_allowed_origins: Vec<String>,
    pub database: DatabaseConfig,
    pub openai: OpenAiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// Validated per call by the generation gateway, so it may be absent here.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Hosted,
    Dev,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Mode requested by `AUTH_MODE`; see [`AuthConfig::effective_mode`].
    pub mode: AuthMode,
    pub publishable_key: Option<String>,
    pub secret_key: Option<String>,
    /// PEM file with the hosted provider's RS256 session-token public key.
    pub jwt_public_key_path: Option<String>,
    pub jwt_issuer: Option<String>,
    pub webhook_secret: Option<String>,
}

impl NotesConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment = Environment::from_env();
        let is_prod = environment.is_prod();

        let mode = match get_env("AUTH_MODE", Some("hosted"), is_prod)?.as_str() {
            "dev" => AuthMode::Dev,
            "hosted" => AuthMode::Hosted,
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "AUTH_MODE must be 'hosted' or 'dev', got '{}'",
                    other
                )))
            }
        };

        Ok(NotesConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("notes-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            cors_allowed_origins: get_env(
                "CORS_ALLOWED_ORIGINS",
                Some("http://localhost:3000"),
                false,
            )?
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect(),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 1)?,
            },
            openai: OpenAiConfig {
                api_key: get_optional_env("OPENAI_API_KEY"),
                model: get_env("OPENAI_MODEL", Some(DEFAULT_MODEL), false)?,
                base_url: get_env("OPENAI_BASE_URL", Some(DEFAULT_OPENAI_BASE_URL), false)?,
            },
            auth: AuthConfig {
                mode,
                publishable_key: get_optional_env("AUTH_PUBLISHABLE_KEY"),
                secret_key: get_optional_env("AUTH_SECRET_KEY"),
                jwt_public_key_path: get_optional_env("AUTH_JWT_PUBLIC_KEY_PATH"),
                jwt_issuer: get_optional_env("AUTH_JWT_ISSUER"),
                webhook_secret: get_optional_env("AUTH_WEBHOOK_SECRET"),
            },
        })
    }
}

impl AuthConfig {
    /// Hosted keys are only trusted when both look like real keys rather than
    /// template placeholders.
    pub fn hosted_keys_look_valid(&self) -> bool {
        fn looks_valid(key: Option<&str>, prefix: &str) -> bool {
            key.is_some_and(|k| k.starts_with(prefix) && k.len() > 20 && !k.contains("your"))
        }

        looks_valid(self.publishable_key.as_deref(), "pk_")
            && looks_valid(self.secret_key.as_deref(), "sk_")
    }

    /// Mode actually used at startup: hosted auth needs plausible keys and a
    /// verification key, otherwise the development identity is used.
    pub fn effective_mode(&self) -> AuthMode {
        match self.mode {
            AuthMode::Hosted if self.hosted_keys_look_valid() && self.jwt_public_key_path.is_some() => {
                AuthMode::Hosted
            }
            _ => AuthMode::Dev,
        }
    }
}

fn parse_env(key: &str, default: u32) -> Result<u32, AppError> {
    match get_optional_env(key) {
        Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
            AppError::ConfigError(anyhow::anyhow!("{} must be a number: {}", key, e))
        }),
        None => Ok(default),
    }
}

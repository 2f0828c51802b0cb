use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_RECREATE_API_BASE: &str = "https://api.recreate.video";
pub const DEFAULT_RECREATE_VIDEO_HOST: &str = "https://videos.rekreate.ai";
pub const ENV_AZURE_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_AZURE_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_AZURE_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_AZURE_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const ENV_RECREATE_API_BASE: &str = "RECREATE_API_BASE";
pub const ENV_RECREATE_VIDEO_HOST: &str = "RECREATE_VIDEO_HOST";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Base URL of an Azure OpenAI resource, stored without a trailing slash.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        let trimmed = v.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentName(String);

impl DeploymentName {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::MissingDeployment);
        }
        Ok(Self(v.trim().to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything the vision client needs to reach a chat-completions deployment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzureConfig {
    pub endpoint: Endpoint,
    pub api_key: ApiKey,
    pub api_version: String,
    pub deployment: DeploymentName,
}

impl AzureConfig {
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.as_str(),
            self.deployment.as_str(),
            self.api_version
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecreateConfig {
    pub api_base: String,
    pub video_host: String,
}

impl Default for RecreateConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_RECREATE_API_BASE.to_owned(),
            video_host: DEFAULT_RECREATE_VIDEO_HOST.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub azure: AzureConfig,
    pub recreate: RecreateConfig,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("endpoint must not be empty")]
    EmptyEndpoint,
    #[error("endpoint must be an http(s) url, got {0:?}")]
    InvalidEndpoint(String),
    #[error("missing deployment name; pass --deployment or set AZURE_OPENAI_DEPLOYMENT")]
    MissingDeployment,
    #[error("missing Azure OpenAI credentials; set AZURE_OPENAI_API_KEY and AZURE_OPENAI_ENDPOINT")]
    MissingCredentials,
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

/// Raw, possibly-missing Azure settings as collected from flags.
#[derive(Clone, Debug, Default)]
pub struct AzureOverrides {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub deployment: Option<String>,
}

pub fn resolve_azure_config(
    overrides: AzureOverrides,
    env: &impl Env,
) -> Result<AzureConfig, ConfigError> {
    let deployment = resolve_optional_string(overrides.deployment, ENV_AZURE_DEPLOYMENT, env)
        .ok_or(ConfigError::MissingDeployment)?;
    let deployment = DeploymentName::new(deployment)?;

    let api_key = resolve_api_key(overrides.api_key, ENV_AZURE_API_KEY, env)?
        .ok_or(ConfigError::MissingCredentials)?;
    let endpoint = resolve_optional_string(overrides.endpoint, ENV_AZURE_ENDPOINT, env)
        .ok_or(ConfigError::MissingCredentials)?;

    Ok(AzureConfig {
        endpoint: Endpoint::new(endpoint)?,
        api_key,
        api_version: resolve_string_with_default(
            overrides.api_version,
            ENV_AZURE_API_VERSION,
            env,
            DEFAULT_API_VERSION,
        ),
        deployment,
    })
}

pub fn resolve_recreate_config(
    api_base: Option<String>,
    video_host: Option<String>,
    env: &impl Env,
) -> RecreateConfig {
    RecreateConfig {
        api_base: resolve_string_with_default(
            api_base,
            ENV_RECREATE_API_BASE,
            env,
            DEFAULT_RECREATE_API_BASE,
        )
        .trim_end_matches('/')
        .to_owned(),
        video_host: resolve_string_with_default(
            video_host,
            ENV_RECREATE_VIDEO_HOST,
            env,
            DEFAULT_RECREATE_VIDEO_HOST,
        )
        .trim_end_matches('/')
        .to_owned(),
    }
}

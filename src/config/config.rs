use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://ashraf-ai-backend.vercel.app/api";
pub const DEFAULT_IDENTITY_KEY: &str = "convo_user_id";
pub const DEFAULT_TICK_MS: u64 = 8;

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Storage file; falls back to the platform config dir when unset.
    pub path: Option<String>,
    pub key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RevealConfig {
    pub enabled: bool,
    pub tick_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub identity: IdentityConfig,
    pub reveal: RevealConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("identity.key", DEFAULT_IDENTITY_KEY)?
            .set_default("reveal.enabled", true)?
            .set_default("reveal.tick_ms", DEFAULT_TICK_MS)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("CONVO").separator("__"))
            .build()?;

        let mut app_config: AppConfig = settings.try_deserialize()?;

        app_config.api.base_url = expand_env(&app_config.api.base_url)
            .trim_end_matches('/')
            .to_string();
        if app_config.api.base_url.is_empty() {
            return Err(config::ConfigError::Message(
                "api.base_url must not be empty".to_string(),
            ));
        }
        app_config.identity.path = app_config.identity.path.as_deref().map(expand_env);

        Ok(app_config)
    }

    /// Where the anonymous identity lives on disk.
    pub fn identity_path(&self) -> PathBuf {
        match &self.identity.path {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("convo")
                .join("storage.json"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            identity: IdentityConfig {
                path: None,
                key: DEFAULT_IDENTITY_KEY.to_string(),
            },
            reveal: RevealConfig {
                enabled: true,
                tick_ms: DEFAULT_TICK_MS,
            },
        }
    }
}

fn expand_env(val: &str) -> String {
    if val.starts_with("${") && val.ends_with('}') {
        let var_name = &val[2..val.len() - 1];
        std::env::var(var_name).unwrap_or_default()
    } else {
        val.to_string()
    }
}

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
const DEFAULT_QUOTE_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub image_model: String,
    pub quote_model: String,
    pub data_dir: PathBuf,
    pub generation_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let openai_api_key = non_empty_var("OPENAI_API_KEY");
        if openai_api_key.is_none() {
            warn!("OPENAI_API_KEY not set, generation and quotes will report a configuration error");
        }
        Self {
            port: try_load("PORT", DEFAULT_PORT),
            openai_api_key,
            openai_base_url: non_empty_var("OPENAI_BASE_URL")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            image_model: non_empty_var("IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            quote_model: non_empty_var("QUOTE_MODEL")
                .unwrap_or_else(|| DEFAULT_QUOTE_MODEL.to_string()),
            data_dir: resolve_data_dir(),
            generation_timeout: Duration::from_secs(try_load(
                "GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )),
            fetch_timeout: Duration::from_secs(try_load(
                "FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )),
        }
    }

    /// Defaults aimed at `base_url` instead of the environment. Only the
    /// integration tests build configuration this way.
    pub fn for_provider(base_url: &str, api_key: Option<&str>, data_dir: PathBuf) -> Self {
        Self {
            port: 0,
            openai_api_key: api_key.map(str::to_string),
            openai_base_url: base_url.trim_end_matches('/').to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            quote_model: DEFAULT_QUOTE_MODEL.to_string(),
            data_dir,
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            warn!("Invalid {key} value {raw:?}: {err}, using default: {default}");
            default
        }),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = non_empty_var("DATA_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::data_dir() {
        Some(mut base) => {
            base.push("inspire-studio");
            base
        }
        None => PathBuf::from("./inspire-studio-data"),
    }
}

use std::env;
use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::info;

/// Secrets that ship in examples and docs and must never run in production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub auth_secret: String,
    pub attachments_dir: PathBuf,
    pub board_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = var_or("AGORA_PORT", "3000");
        let config = Self {
            host: var_or("AGORA_HOST", "0.0.0.0"),
            port: port.parse()?,
            db_path: var_or("AGORA_DB_PATH", "agora.db").into(),
            jwt_secret: secret("AGORA_JWT_SECRET")?,
            auth_secret: secret("AGORA_AUTH_SECRET")?,
            attachments_dir: var_or("AGORA_ATTACHMENTS_DIR", "./attachments").into(),
            board_url: var_or("AGORA_BOARD_URL", &format!("http://localhost:{}/index.php", port)),
        };
        Ok(config)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}

fn secret(key: &str) -> Result<String> {
    check_secret(key, env::var(key).unwrap_or_default())
}

fn check_secret(key: &str, value: String) -> Result<String> {
    if value.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
        bail!("{} is unset or still a placeholder; set it in your .env file and restart", key);
    }
    Ok(value)
}

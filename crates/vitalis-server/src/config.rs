use std::path::PathBuf;

use anyhow::{Context, bail};

use vitalis_api::voice::LiveKitConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub livekit: Option<LiveKitConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("VITALIS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("VITALIS_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let host = get("VITALIS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = match get("VITALIS_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("VITALIS_PORT is not a valid port: {raw}"))?,
            None => 3000,
        };
        let db_path = get("VITALIS_DB_PATH").unwrap_or_else(|| "vitalis.db".into()).into();
        let upload_dir = get("VITALIS_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into();
        let public_url =
            get("VITALIS_PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        // All three or nothing
        let livekit = match (get("LIVEKIT_URL"), get("LIVEKIT_API_KEY"), get("LIVEKIT_API_SECRET")) {
            (Some(url), Some(api_key), Some(api_secret)) => Some(LiveKitConfig {
                url,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            upload_dir,
            public_url,
            livekit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = load(&[("VITALIS_JWT_SECRET", "s3cr3t-value")]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("vitalis.db"));
        assert_eq!(cfg.public_url, "http://localhost:3000");
        assert!(cfg.livekit.is_none());
    }

    #[test]
    fn test_rejects_placeholder_secret() {
        assert!(load(&[]).is_err());
        assert!(load(&[("VITALIS_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn test_livekit_requires_all_settings() {
        let partial = load(&[
            ("VITALIS_JWT_SECRET", "s3cr3t-value"),
            ("LIVEKIT_URL", "wss://lk.example.com"),
        ])
        .unwrap();
        assert!(partial.livekit.is_none());

        let full = load(&[
            ("VITALIS_JWT_SECRET", "s3cr3t-value"),
            ("VITALIS_PORT", "8080"),
            ("LIVEKIT_URL", "wss://lk.example.com"),
            ("LIVEKIT_API_KEY", "key"),
            ("LIVEKIT_API_SECRET", "secret"),
        ])
        .unwrap();
        assert_eq!(full.public_url, "http://localhost:8080");
        assert_eq!(full.livekit.unwrap().api_key, "key");
    }
}

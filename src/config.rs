use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Which backing service implementation to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Mock,
    Http,
}

impl BackendMode {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "http" => Ok(Self::Http),
            other => bail!("BACKEND_MODE must be 'mock' or 'http', got '{}'", other),
        }
    }
}

/// One accepted API token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiToken {
    pub label: String,
    pub secret: String,
}

impl ApiToken {
    /// Parses `label:secret`; a bare secret gets the label `api`.
    fn parse(entry: &str) -> Self {
        match entry.split_once(':') {
            Some((label, secret)) if !label.trim().is_empty() => Self {
                label: label.trim().to_string(),
                secret: secret.trim().to_string(),
            },
            Some((_, secret)) => Self {
                label: "api".to_string(),
                secret: secret.trim().to_string(),
            },
            None => Self {
                label: "api".to_string(),
                secret: entry.trim().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Backing service
    pub backend_mode: BackendMode,
    pub backend_url: Option<String>,
    pub backend_token: Option<String>,
    pub backend_timeout_seconds: u64,
    pub backend_retry_max_elapsed_seconds: u64,
    pub backend_poll_interval_seconds: u64,
    pub mock_latency: bool,

    // Auth
    pub api_tokens: Vec<ApiToken>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: u64| -> Result<u64> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a non-negative integer", key)),
                None => Ok(default),
            }
        };

        let env = Environment::from_str(&var("ENV").unwrap_or_else(|| "dev".to_string()));
        let server_addr = var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Backing service
        let backend_mode = match var("BACKEND_MODE") {
            Some(raw) => BackendMode::parse(&raw)?,
            None => BackendMode::Mock,
        };
        let backend_url = var("BACKEND_URL");
        if backend_mode == BackendMode::Http {
            let raw = backend_url
                .as_deref()
                .context("BACKEND_URL must be set when BACKEND_MODE=http")?;
            url::Url::parse(raw).context("BACKEND_URL is not a valid URL")?;
        }
        let backend_token = var("BACKEND_TOKEN");
        let backend_timeout_seconds = number("BACKEND_TIMEOUT_SECONDS", 30)?;
        let backend_retry_max_elapsed_seconds = number("BACKEND_RETRY_MAX_ELAPSED_SECONDS", 10)?;
        let backend_poll_interval_seconds = number("BACKEND_POLL_INTERVAL_SECONDS", 5)?;
        let mock_latency = var("MOCK_LATENCY")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);

        // Auth
        let api_tokens = var("API_TOKENS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ApiToken::parse)
            .filter(|t| !t.secret.is_empty())
            .collect();

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            backend_mode,
            backend_url,
            backend_token,
            backend_timeout_seconds,
            backend_retry_max_elapsed_seconds,
            backend_poll_interval_seconds,
            mock_latency,
            api_tokens,
        })
    }

    /// `None` disables change polling.
    pub fn backend_poll_interval(&self) -> Option<Duration> {
        (self.backend_poll_interval_seconds > 0)
            .then(|| Duration::from_secs(self.backend_poll_interval_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_run_against_the_mock() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.env, Environment::Dev);
        assert_eq!(s.server_addr, "0.0.0.0:8080");
        assert_eq!(s.backend_mode, BackendMode::Mock);
        assert!(s.mock_latency);
        assert!(s.api_tokens.is_empty());
        assert_eq!(s.backend_poll_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn http_mode_requires_a_valid_url() {
        assert!(settings(&[("BACKEND_MODE", "http")]).is_err());
        assert!(settings(&[("BACKEND_MODE", "http"), ("BACKEND_URL", "::nope")]).is_err());

        let s = settings(&[
            ("BACKEND_MODE", "HTTP"),
            ("BACKEND_URL", "https://svc.example.com/rest"),
            ("BACKEND_POLL_INTERVAL_SECONDS", "0"),
        ])
        .unwrap();
        assert_eq!(s.backend_mode, BackendMode::Http);
        assert_eq!(s.backend_poll_interval(), None);
    }

    #[test]
    fn rejects_unknown_mode_and_bad_numbers() {
        assert!(settings(&[("BACKEND_MODE", "sqlite")]).is_err());
        assert!(settings(&[("BACKEND_TIMEOUT_SECONDS", "soon")]).is_err());
    }

    #[test]
    fn parses_api_tokens() {
        let s = settings(&[("API_TOKENS", "ops:s3cret, bare ,:anon,,")]).unwrap();
        assert_eq!(
            s.api_tokens,
            vec![
                ApiToken {
                    label: "ops".into(),
                    secret: "s3cret".into()
                },
                ApiToken {
                    label: "api".into(),
                    secret: "bare".into()
                },
                ApiToken {
                    label: "api".into(),
                    secret: "anon".into()
                },
            ]
        );
    }

    #[test]
    fn latency_can_be_switched_off() {
        let s = settings(&[("MOCK_LATENCY", "false"), ("ENV", "production")]).unwrap();
        assert!(!s.mock_latency);
        assert!(s.env.is_prod());
    }
}

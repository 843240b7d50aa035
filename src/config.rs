use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub profile: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub path_style: bool,
    pub request_timeout_secs: Option<u64>,
}

impl StorageConfig {
    /// Settings for `bucket` that rely entirely on the ambient profile chain
    pub fn for_bucket(bucket: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            profile: profile.into(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            path_style: false,
            request_timeout_secs: None,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Static credentials, only when both halves are present
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(secret)) => Some((key.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; stderr only when unset
    pub directory: Option<PathBuf>,
}

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_REGION: &str = "us-east-1";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            storage: StorageConfig {
                bucket: non_empty("S3_BUCKET")
                    .ok_or_else(|| anyhow!("S3_BUCKET must be set"))?,
                profile: non_empty("AWS_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
                region: non_empty("S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                endpoint: non_empty("S3_ENDPOINT"),
                access_key_id: non_empty("AWS_ACCESS_KEY_ID"),
                secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY"),
                path_style: non_empty("S3_PATH_STYLE")
                    .unwrap_or_else(|| "false".to_string())
                    .parse::<bool>()
                    .context("S3_PATH_STYLE must be true or false")?,
                request_timeout_secs: non_empty("S3_REQUEST_TIMEOUT_SECS")
                    .map(|v| v.parse::<u64>())
                    .transpose()
                    .context("S3_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            },
            logging: LoggingConfig {
                directory: non_empty("LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("S3_BUCKET", "s3-payments-sb")])).unwrap();

        assert_eq!(config.storage.bucket, "s3-payments-sb");
        assert_eq!(config.storage.profile, DEFAULT_PROFILE);
        assert_eq!(config.storage.region, DEFAULT_REGION);
        assert!(config.storage.endpoint.is_none());
        assert!(!config.storage.path_style);
        assert!(config.storage.request_timeout().is_none());
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn test_full_configuration() {
        let config = Config::from_lookup(lookup(&[
            ("S3_BUCKET", "artifacts"),
            ("AWS_PROFILE", "conektasb"),
            ("S3_REGION", "eu-west-1"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("AWS_ACCESS_KEY_ID", "minioadmin"),
            ("AWS_SECRET_ACCESS_KEY", "miniosecret"),
            ("S3_PATH_STYLE", "true"),
            ("S3_REQUEST_TIMEOUT_SECS", "30"),
            ("LOG_DIR", "/var/log/bucket-store"),
        ]))
        .unwrap();

        assert_eq!(config.storage.profile, "conektasb");
        assert_eq!(config.storage.region, "eu-west-1");
        assert_eq!(config.storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(
            config.storage.static_credentials(),
            Some(("minioadmin", "miniosecret"))
        );
        assert!(config.storage.path_style);
        assert_eq!(config.storage.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.logging.directory,
            Some(PathBuf::from("/var/log/bucket-store"))
        );
    }

    #[test]
    fn test_missing_bucket_is_an_error() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("S3_BUCKET", "  ")])).is_err());
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[
            ("S3_BUCKET", "b"),
            ("S3_PATH_STYLE", "sometimes"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("S3_BUCKET", "b"),
            ("S3_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .is_err());
    }

    #[test]
    fn test_half_static_credentials_ignored() {
        let config = Config::from_lookup(lookup(&[
            ("S3_BUCKET", "b"),
            ("AWS_ACCESS_KEY_ID", "only-the-key"),
        ]))
        .unwrap();
        assert!(config.storage.static_credentials().is_none());
    }
}

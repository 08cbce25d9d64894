//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! server, media-account, metadata-store and teardown settings. Every section
//! defaults sensibly so a completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::model::AccountScope;
use crate::Error;

/// Environment variable overriding `media.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "LIVEOPS_ACCESS_TOKEN";
/// Environment variable overriding `store.cosmos.key`.
pub const COSMOS_KEY_ENV: &str = "LIVEOPS_COSMOS_KEY";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub store: StoreConfig,
    pub teardown: TeardownConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Fill secrets from the environment when they are not set in the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                self.media.access_token = Some(token);
            }
        }
        if let Ok(key) = std::env::var(COSMOS_KEY_ENV) {
            if !key.is_empty() {
                self.store.cosmos.key = Some(key);
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.media.subscription_id.is_empty() {
            warnings.push("media.subscription_id is empty".into());
        }
        if self.media.resource_group.is_empty() {
            warnings.push("media.resource_group is empty".into());
        }
        if self.media.account_name.is_empty() {
            warnings.push("media.account_name is empty".into());
        }
        if self.media.access_token.is_none() {
            warnings.push(format!(
                "media.access_token is not set (set it in the file or via {ACCESS_TOKEN_ENV})"
            ));
        }

        match self.store.backend {
            StoreBackend::Disabled => {
                warnings.push(
                    "store.backend is disabled; channel metadata will not be reconciled".into(),
                );
            }
            StoreBackend::Cosmos => {
                let cosmos = &self.store.cosmos;
                if cosmos.endpoint.as_deref().unwrap_or("").is_empty() {
                    warnings.push("store.cosmos.endpoint is empty".into());
                }
                if cosmos.key.as_deref().unwrap_or("").is_empty() {
                    warnings.push(format!(
                        "store.cosmos.key is not set (set it in the file or via {COSMOS_KEY_ENV})"
                    ));
                }
            }
            StoreBackend::Sqlite => {}
        }

        if self.teardown.stop_poll_interval_ms == 0 {
            warnings.push("teardown.stop_poll_interval_ms is 0; polling will spin".into());
        }
        if self.teardown.stop_max_wait_secs == 0 {
            warnings.push(
                "teardown.stop_max_wait_secs is 0; waiting for a stopping channel is unbounded"
                    .into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When set, requests must present this key (`x-functions-key` header,
    /// `code` query parameter, or `Authorization: Bearer`).
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 7071,
            api_key: None,
        }
    }
}

/// Media-services account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub arm_endpoint: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
    /// When non-empty, used verbatim as the resource group even if a region
    /// selector is supplied.
    pub resource_group_final_name: Option<String>,
    /// Bearer token for the management API.
    pub access_token: Option<String>,
    pub api_version: String,
    pub request_timeout_secs: u64,
    /// Poll interval for long-running operations.
    pub lro_poll_interval_ms: u64,
    /// Upper bound on a single long-running operation.
    pub lro_max_wait_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            arm_endpoint: "https://management.azure.com".into(),
            subscription_id: String::new(),
            resource_group: String::new(),
            account_name: String::new(),
            resource_group_final_name: None,
            access_token: None,
            api_version: "2018-07-01".into(),
            request_timeout_secs: 30,
            lro_poll_interval_ms: 2000,
            lro_max_wait_secs: 600,
        }
    }
}

impl MediaConfig {
    /// Resolve the account scope for an optional region selector.
    ///
    /// The region is appended to the account name and, unless
    /// `resource_group_final_name` is set, to the resource group.
    pub fn scope_for(&self, region: Option<&str>) -> AccountScope {
        let region = region.map(str::trim).filter(|r| !r.is_empty());
        let final_group = self
            .resource_group_final_name
            .as_deref()
            .filter(|g| !g.is_empty());

        let (resource_group, account_name) = match region {
            Some(region) => (
                final_group
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}{}", self.resource_group, region)),
                format!("{}{}", self.account_name, region),
            ),
            None => (
                final_group
                    .map(str::to_string)
                    .unwrap_or_else(|| self.resource_group.clone()),
                self.account_name.clone(),
            ),
        };

        AccountScope {
            subscription_id: self.subscription_id.clone(),
            resource_group,
            account_name,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn lro_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lro_poll_interval_ms)
    }

    pub fn lro_max_wait(&self) -> Duration {
        Duration::from_secs(self.lro_max_wait_secs)
    }
}

/// Which metadata store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Disabled,
    Cosmos,
    Sqlite,
}

/// Metadata store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub cosmos: CosmosConfig,
    pub sqlite: SqliteConfig,
}

/// Cosmos DB (SQL API) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmosConfig {
    pub endpoint: Option<String>,
    /// Base64 master key.
    pub key: Option<String>,
    pub database: String,
    pub collection: String,
    pub request_timeout_secs: u64,
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            database: "liveDRMStreaming".into(),
            collection: "liveEventOutputInfo".into(),
            request_timeout_secs: 10,
        }
    }
}

/// Embedded SQLite store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/liveops.db"),
        }
    }
}

/// Teardown behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    /// Interval between state queries while a channel is stopping.
    pub stop_poll_interval_ms: u64,
    /// Maximum time to wait for a stopping channel; `0` waits forever.
    pub stop_max_wait_secs: u64,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            stop_poll_interval_ms: 2000,
            stop_max_wait_secs: 600,
        }
    }
}

impl TeardownConfig {
    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }

    pub fn stop_max_wait(&self) -> Option<Duration> {
        (self.stop_max_wait_secs > 0).then(|| Duration::from_secs(self.stop_max_wait_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media() -> MediaConfig {
        MediaConfig {
            subscription_id: "sub".into(),
            resource_group: "liveRG".into(),
            account_name: "liveams".into(),
            ..MediaConfig::default()
        }
    }

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 7071);
        assert_eq!(cfg.media.api_version, "2018-07-01");
        assert_eq!(cfg.media.lro_poll_interval_ms, 2000);
        assert_eq!(cfg.store.backend, StoreBackend::Disabled);
        assert_eq!(cfg.teardown.stop_poll_interval(), Duration::from_secs(2));
        assert_eq!(cfg.teardown.stop_max_wait(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.server.port, 7071);
        assert_eq!(cfg.store.cosmos.database, "liveDRMStreaming");
    }

    #[test]
    fn parse_toml_sections() {
        let toml = r#"
            [server]
            port = 9090

            [media]
            subscription_id = "sub"
            resource_group = "rg"
            account_name = "acct"

            [store]
            backend = "sqlite"

            [store.sqlite]
            path = "/tmp/liveops.db"

            [teardown]
            stop_max_wait_secs = 0
        "#;
        let cfg = Config::from_toml(toml).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.media.account_name, "acct");
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.store.sqlite.path, PathBuf::from("/tmp/liveops.db"));
        assert_eq!(cfg.teardown.stop_max_wait(), None);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml("[server\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn scope_without_region() {
        let scope = media().scope_for(None);
        assert_eq!(scope.resource_group, "liveRG");
        assert_eq!(scope.account_name, "liveams");
        assert_eq!(scope.subscription_id, "sub");
    }

    #[test]
    fn scope_with_region_appends_to_both() {
        let scope = media().scope_for(Some("euwe"));
        assert_eq!(scope.resource_group, "liveRGeuwe");
        assert_eq!(scope.account_name, "liveamseuwe");
    }

    #[test]
    fn scope_with_final_group_keeps_group() {
        let mut m = media();
        m.resource_group_final_name = Some("sharedRG".into());
        let scope = m.scope_for(Some("no"));
        assert_eq!(scope.resource_group, "sharedRG");
        assert_eq!(scope.account_name, "liveamsno");
    }

    #[test]
    fn blank_region_is_ignored() {
        let scope = media().scope_for(Some("  "));
        assert_eq!(scope.account_name, "liveams");
    }

    #[test]
    fn disabled_store_warns() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("store.backend")));
        assert!(warnings.iter().any(|w| w.contains("access_token")));
    }

    #[test]
    fn cosmos_without_key_warns() {
        let mut cfg = Config::default();
        cfg.store.backend = StoreBackend::Cosmos;
        cfg.store.cosmos.endpoint = Some("https://acct.documents.azure.com".into());
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("store.cosmos.key")));
        assert!(!warnings.iter().any(|w| w.contains("store.cosmos.endpoint")));
    }

    #[test]
    fn unbounded_stop_wait_warns() {
        let mut cfg = Config::default();
        cfg.teardown.stop_max_wait_secs = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("unbounded")));
    }
}

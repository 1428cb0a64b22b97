//! Catalog configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use schemata_core::{DEFAULT_TENANT, Error, LogFormat, Result};

/// Default per-call store deadline.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 60_000;

/// Default page size when a search does not specify `maxItems`.
pub const DEFAULT_ITEMS_QUERY_COUNT: usize = 100;

/// Default role that grants tenant-wide visibility.
pub const DEFAULT_ADMIN_ROLE: &str = "all_access";

/// Runtime configuration for the catalog service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct CatalogConfig {
    /// Deadline applied to every store call, in milliseconds.
    pub operation_timeout_ms: u64,
    /// Page size used when a search does not specify one.
    pub default_items_query_count: usize,
    /// Whether visibility is scoped by backend roles.
    pub filter_by_backend_roles: bool,
    /// Role that bypasses access-list checks within its tenant.
    pub admin_role: String,
    /// Tenant used when a caller requests none.
    pub default_tenant: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            default_items_query_count: DEFAULT_ITEMS_QUERY_COUNT,
            filter_by_backend_roles: false,
            admin_role: DEFAULT_ADMIN_ROLE.to_string(),
            default_tenant: DEFAULT_TENANT.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl CatalogConfig {
    /// Loads configuration from environment variables.
    ///
    /// Supported variables:
    /// - `SCHEMATA_OPERATION_TIMEOUT_MS`
    /// - `SCHEMATA_DEFAULT_ITEMS_QUERY_COUNT`
    /// - `SCHEMATA_FILTER_BY_BACKEND_ROLES`
    /// - `SCHEMATA_ADMIN_ROLE`
    /// - `SCHEMATA_DEFAULT_TENANT`
    /// - `SCHEMATA_LOG_FORMAT` (`json` or `pretty`)
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(timeout) = env_u64("SCHEMATA_OPERATION_TIMEOUT_MS")? {
            config.operation_timeout_ms = timeout;
        }
        if let Some(count) = env_usize("SCHEMATA_DEFAULT_ITEMS_QUERY_COUNT")? {
            config.default_items_query_count = count;
        }
        if let Some(filter) = env_bool("SCHEMATA_FILTER_BY_BACKEND_ROLES")? {
            config.filter_by_backend_roles = filter;
        }
        if let Some(role) = env_string("SCHEMATA_ADMIN_ROLE") {
            config.admin_role = role;
        }
        if let Some(tenant) = env_string("SCHEMATA_DEFAULT_TENANT") {
            config.default_tenant = tenant;
        }
        if let Some(format) = env_string("SCHEMATA_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a zero timeout or page size.
    pub fn validate(&self) -> Result<()> {
        if self.operation_timeout_ms == 0 {
            return Err(Error::InvalidInput(
                "SCHEMATA_OPERATION_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        if self.default_items_query_count == 0 {
            return Err(Error::InvalidInput(
                "SCHEMATA_DEFAULT_ITEMS_QUERY_COUNT must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the store call deadline.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<usize>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a usize: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

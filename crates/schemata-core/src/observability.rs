//! Observability infrastructure for schemata.
//!
//! Structured logging with consistent spans. Every catalog operation runs
//! inside a [`catalog_span`] so log lines carry the operation and tenant.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::Error;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(Error::InvalidInput(format!(
                "log format must be one of: json, pretty (got {other})"
            ))),
        }
    }
}

/// Filter used when `RUST_LOG` is unset: the schemata crates at `info`,
/// everything else at `warn`.
pub const DEFAULT_FILTER: &str = "warn,schemata_core=info,schemata_catalog=info";

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Returns `false` if a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };
    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .is_ok()
}

/// Span wrapping one catalog operation, tagged with the caller's tenant.
///
/// ```rust
/// use schemata_core::observability::catalog_span;
///
/// catalog_span("search", "acme-corp").in_scope(|| tracing::debug!("planning query"));
/// ```
#[must_use]
pub fn catalog_span(operation: &str, tenant: &str) -> Span {
    tracing::info_span!("catalog", op = operation, tenant = tenant)
}

/// Span wrapping a domain operation; carries the domain name as well.
#[must_use]
pub fn domain_span(operation: &str, domain: &str, tenant: &str) -> Span {
    tracing::info_span!("domain", op = operation, domain = domain, tenant = tenant)
}

//! Configuration loading and management

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::entities::{Contractor, StandardRate};

/// Longest accepted response link lifetime (30 days)
pub const MAX_LINK_EXPIRY_MINUTES: i64 = 30 * 24 * 60;

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Outbound notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Upper bound for a single delivery attempt
    pub timeout_ms: u64,

    /// Target of the webhook notifier (`push` feature)
    pub webhook_url: Option<String>,

    /// Base URL used to build the contractor response link
    pub response_base_url: String,

    /// Recipient of "response recorded" messages
    pub operator_email: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            webhook_url: None,
            response_base_url: "http://localhost:3000".to_string(),
            operator_email: "dispatch@localhost".to_string(),
        }
    }
}

impl NotificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Assignment workflow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    /// How many contractors auto assignment tries per work order
    pub max_auto_attempts: u32,

    /// Lifetime of a contractor response link
    pub default_link_expiry_minutes: i64,

    /// Per-area override of the link lifetime (area name -> minutes)
    pub link_expiry_minutes: HashMap<String, i64>,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            max_auto_attempts: 5,
            default_link_expiry_minutes: 60,
            link_expiry_minutes: HashMap::new(),
        }
    }
}

impl AssignmentConfig {
    /// Link lifetime for `area`, matched case-insensitively
    ///
    /// Clamped to `1..=MAX_LINK_EXPIRY_MINUTES` for configs that skipped
    /// [`DispatchConfig::validate`].
    pub fn link_expiry(&self, area: &str) -> chrono::Duration {
        let minutes = self
            .link_expiry_minutes
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(area.trim()))
            .map(|(_, minutes)| *minutes)
            .unwrap_or(self.default_link_expiry_minutes);
        chrono::Duration::minutes(minutes.clamp(1, MAX_LINK_EXPIRY_MINUTES))
    }
}

/// Catalog settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Reject work orders whose types or area are not active catalog entries
    pub strict: bool,
}

/// Complete configuration of the dispatch service
///
/// Every section has defaults, so an empty document is a valid config.
///
/// ```yaml
/// server:
///   bind: 0.0.0.0:8080
/// notification:
///   timeout_ms: 2000
/// assignment:
///   link_expiry_minutes:
///     harbour: 30
/// contractors:
///   - id: c-1
///     name: Acme Services
///     email: ops@acme.test
///     rate: 120
///     service_locations: north, harbour
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub server: ServerConfig,
    pub notification: NotificationConfig,
    pub assignment: AssignmentConfig,
    pub catalog: CatalogConfig,
    /// Seed of the in-memory contractor directory
    pub contractors: Vec<Contractor>,
    /// Client and area specific prices
    pub standard_rates: Vec<StandardRate>,
}

impl DispatchConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.notification.timeout_ms == 0 {
            bail!("notification.timeout_ms must be greater than 0");
        }
        if self.assignment.max_auto_attempts == 0 {
            bail!("assignment.max_auto_attempts must be greater than 0");
        }
        let expiry_range = 1..=MAX_LINK_EXPIRY_MINUTES;
        if !expiry_range.contains(&self.assignment.default_link_expiry_minutes) {
            bail!(
                "assignment.default_link_expiry_minutes must be between 1 and {}",
                MAX_LINK_EXPIRY_MINUTES
            );
        }
        if let Some((area, _)) = self
            .assignment
            .link_expiry_minutes
            .iter()
            .find(|(_, minutes)| !expiry_range.contains(*minutes))
        {
            bail!(
                "assignment.link_expiry_minutes.{} must be between 1 and {}",
                area,
                MAX_LINK_EXPIRY_MINUTES
            );
        }
        if let Err(e) = url::Url::parse(&self.notification.response_base_url) {
            bail!("notification.response_base_url is not a valid URL: {}", e);
        }
        for contractor in &self.contractors {
            if contractor.id.trim().is_empty() {
                bail!("contractor ids must not be blank");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = DispatchConfig::from_yaml_str("").unwrap();
        assert_eq!(config.notification.timeout_ms, 5000);
        assert_eq!(config.assignment.max_auto_attempts, 5);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert!(!config.catalog.strict);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = DispatchConfig::from_yaml_str(
            "assignment:\n  link_expiry_minutes:\n    Harbour: 30\n",
        )
        .unwrap();
        assert_eq!(config.assignment.max_auto_attempts, 5);
        assert_eq!(
            config.assignment.link_expiry("harbour"),
            chrono::Duration::minutes(30)
        );
        assert_eq!(
            config.assignment.link_expiry("north"),
            chrono::Duration::minutes(60)
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = DispatchConfig::from_yaml_str("notification:\n  timeout_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = DispatchConfig::default();
        config.assignment.max_auto_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_link_expiry_is_capped() {
        let err = DispatchConfig::from_yaml_str(
            "assignment:\n  default_link_expiry_minutes: 100000000000000\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("default_link_expiry_minutes"));

        let err = DispatchConfig::from_yaml_str(
            "assignment:\n  link_expiry_minutes:\n    harbour: 43201\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("link_expiry_minutes.harbour"));

        let config = DispatchConfig::from_yaml_str(
            "assignment:\n  default_link_expiry_minutes: 43200\n",
        )
        .unwrap();
        assert_eq!(config.assignment.link_expiry("north"), chrono::Duration::days(30));
    }

    #[test]
    fn test_unvalidated_expiry_is_clamped() {
        let assignment = AssignmentConfig {
            default_link_expiry_minutes: i64::MAX,
            ..Default::default()
        };
        assert_eq!(
            assignment.link_expiry("north"),
            chrono::Duration::minutes(MAX_LINK_EXPIRY_MINUTES)
        );
    }

    #[test]
    fn test_response_base_url_must_parse() {
        let err = DispatchConfig::from_yaml_str("notification:\n  response_base_url: not a url\n")
            .unwrap_err();
        assert!(err.to_string().contains("response_base_url"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = DispatchConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = DispatchConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.assignment.max_auto_attempts, 5);
    }
}

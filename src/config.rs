use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HarvestError;

pub const DEFAULT_USER: &str = "harvest";
pub const DEFAULT_MAINTAINER: &str = "Guido Sautter";
pub const DEFAULT_MAINTAINER_EMAIL: &str = "sautter@ipd.uka.de";

/// Raw per-source configuration as stored alongside the harvest source.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub maintainer: Option<String>,
    #[serde(default)]
    pub maintainer_email: Option<String>,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestConfig {
    pub user: String,
    pub maintainer: String,
    pub maintainer_email: String,
    pub groups: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(SourceConfig::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves the stored config blob of a source. Called once per stage.
    pub fn resolve(raw: Option<&str>) -> Result<HarvestConfig, HarvestError> {
        let config = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str::<Option<SourceConfig>>(raw)
                .map_err(|err| HarvestError::ConfigParse(err.to_string()))?
                .unwrap_or_default(),
            _ => SourceConfig::default(),
        };

        let resolved = Self::resolve_config(config);
        debug!(?resolved, "using config");
        Ok(resolved)
    }

    pub fn resolve_config(config: SourceConfig) -> HarvestConfig {
        HarvestConfig {
            user: config.user.unwrap_or_else(|| DEFAULT_USER.to_string()),
            maintainer: config
                .maintainer
                .unwrap_or_else(|| DEFAULT_MAINTAINER.to_string()),
            maintainer_email: config
                .maintainer_email
                .unwrap_or_else(|| DEFAULT_MAINTAINER_EMAIL.to_string()),
            groups: config.groups.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_blob_uses_defaults() {
        for raw in [None, Some(""), Some("   "), Some("null")] {
            let config = ConfigLoader::resolve(raw).unwrap();
            assert_eq!(config.user, "harvest");
            assert_eq!(config.maintainer, DEFAULT_MAINTAINER);
            assert_eq!(config.maintainer_email, DEFAULT_MAINTAINER_EMAIL);
            assert!(config.groups.is_empty());
        }
    }

    #[test]
    fn invalid_blob_is_rejected() {
        let err = ConfigLoader::resolve(Some("{not json")).unwrap_err();
        assert_matches!(err, HarvestError::ConfigParse(_));
    }
}

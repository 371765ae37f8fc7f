use serde::{Deserialize, Serialize};

use crate::machine::{AnalysisOptions, DEFAULT_FRAMEWORK_PACKAGE, DEFAULT_MAX_CONDITION_LEN};

pub fn default_framework_package() -> String {
    DEFAULT_FRAMEWORK_PACKAGE.to_string()
}

pub fn default_diagram_extension() -> String {
    ".plantuml".to_string()
}

pub fn default_max_condition_len() -> usize {
    DEFAULT_MAX_CONDITION_LEN
}

/// Root configuration structure for stepmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepmapConfig {
    /// Import path of the state machine framework whose steps are analyzed
    #[serde(default = "default_framework_package")]
    pub framework_package: String,

    /// Suffix appended to the output group when writing diagram files
    #[serde(default = "default_diagram_extension")]
    pub diagram_extension: String,

    /// Target length of guard condition labels
    #[serde(default = "default_max_condition_len")]
    pub max_condition_len: usize,
}

impl Default for StepmapConfig {
    fn default() -> Self {
        Self {
            framework_package: default_framework_package(),
            diagram_extension: default_diagram_extension(),
            max_condition_len: default_max_condition_len(),
        }
    }
}

impl StepmapConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.framework_package.trim().is_empty() {
            return Err("framework_package must not be empty".to_string());
        }
        if self.max_condition_len < 4 {
            return Err(format!(
                "max_condition_len must be at least 4, got {}",
                self.max_condition_len
            ));
        }
        Ok(())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            framework_package: self.framework_package.clone(),
            max_condition_len: self.max_condition_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StepmapConfig::default();
        assert_eq!(config.diagram_extension, ".plantuml");
        assert_eq!(config.max_condition_len, 30);
        assert!(config.framework_package.ends_with("/smachine"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: StepmapConfig = toml::from_str("max_condition_len = 40").unwrap();
        assert_eq!(config.max_condition_len, 40);
        assert_eq!(config.diagram_extension, ".plantuml");
    }

    #[test]
    fn test_validate_rejects_tiny_condition_len() {
        let config = StepmapConfig {
            max_condition_len: 2,
            ..StepmapConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

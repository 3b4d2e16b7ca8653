use crate::config::Config;
use crate::error::{HarvestError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_identity(config, &mut errors);
        Self::validate_discovery(config, &mut errors);
        Self::validate_hypervisor(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(HarvestError::ConfigValidation { errors })
        }
    }

    fn validate_identity(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.identity.dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "identity.dir",
                "Identity directory cannot be empty",
            ));
        }
    }

    fn validate_discovery(config: &Config, errors: &mut Vec<ValidationError>) {
        // Discovery matches on plain file names; a path separator would
        // never match anything the walk yields.
        for (key, name) in [
            ("discovery.flow_file", &config.discovery.flow_file),
            ("discovery.capture_file", &config.discovery.capture_file),
        ] {
            if name.is_empty() {
                errors.push(ValidationError::new(key, "File name cannot be empty"));
            } else if name.contains('/') {
                errors.push(ValidationError::new(
                    key,
                    format!("Expected a bare file name, got a path: {}", name),
                ));
            }
        }
    }

    fn validate_hypervisor(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.hypervisor.list_command.is_empty() {
            errors.push(ValidationError::new(
                "hypervisor.list_command",
                "Listing command cannot be empty",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_path_as_file_name() {
        let mut config = Config::default();
        config.discovery.flow_file = "traffic/flows.csv".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(matches!(
            result,
            Err(HarvestError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_list_command() {
        let mut config = Config::default();
        config.hypervisor.list_command.clear();

        assert!(ConfigValidator::validate(&config).is_err());
    }
}

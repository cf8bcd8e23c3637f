use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Vault URL is an http(s) URL
/// - Background renewal has a non-zero check interval
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let url = config.vault.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "vault.url must be an http(s) URL, got '{}'",
            config.vault.url
        )));
    }

    if config.renewal.enabled && config.renewal.check_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "renewal.check_interval_secs cannot be 0 when renewal is enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config() -> Config {
        load_config_from_str(
            r#"
[vault]
url = "http://localhost:9400"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_vault_url_scheme() {
        let mut config = config();
        config.vault.url = "localhost:9400".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_interval_only_when_enabled() {
        let mut config = config();
        config.renewal.check_interval_secs = 0;
        assert!(validate_config(&config).is_ok());

        config.renewal.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}

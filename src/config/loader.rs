//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::HarborConfig;
use crate::config::secret_string;
use crate::domain::errors::HarborError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`HarborConfig`]
/// 4. Applies environment variable overrides (`HARBOR_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use harbor::config::loader::load_config;
///
/// let config = load_config("harbor.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<HarborConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(HarborError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HarborError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Loads configuration from TOML content (substitution + overrides + validation)
pub fn load_config_from_str(contents: &str) -> Result<HarborConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: HarborConfig = toml::from_str(&contents)
        .map_err(|e| HarborError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        HarborError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched so documentation examples in the config
/// file don't trigger missing-variable errors.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(HarborError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the HARBOR_* prefix
///
/// Environment variables follow the pattern: HARBOR_<SECTION>_<KEY>
/// For example: HARBOR_NLP_BASE_URL, HARBOR_BATCH_MAX_CONCURRENCY
fn apply_env_overrides(config: &mut HarborConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("HARBOR_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("HARBOR_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // PHI overrides
    if let Ok(val) = std::env::var("HARBOR_PHI_DETECTION_ENABLED") {
        config.phi.detection_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("HARBOR_PHI_REDACTION_ENABLED") {
        config.phi.redaction_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("HARBOR_PHI_REDACTION_LEVEL") {
        if let Ok(level) = val.parse() {
            config.phi.redaction_level = level;
        }
    }
    if let Ok(val) = std::env::var("HARBOR_PHI_PREFER_ADVANCED") {
        config.phi.prefer_advanced = val.parse().unwrap_or(false);
    }

    // NLP overrides
    if let Ok(val) = std::env::var("HARBOR_NLP_BASE_URL") {
        config.nlp.base_url = val;
    }
    if let Ok(val) = std::env::var("HARBOR_NLP_API_KEY") {
        config.nlp.api_key = Some(secret_string(val));
    }

    // Storage overrides (only when a storage section is configured)
    if let Some(ref mut storage) = config.storage {
        if let Ok(val) = std::env::var("HARBOR_STORAGE_CONNECTION_STRING") {
            storage.connection_string = val;
        }
        if let Ok(val) = std::env::var("HARBOR_STORAGE_MAX_CONNECTIONS") {
            if let Ok(parsed) = val.parse() {
                storage.max_connections = parsed;
            }
        }
    }

    // Batch overrides
    if let Ok(val) = std::env::var("HARBOR_BATCH_MAX_CONCURRENCY") {
        if let Ok(parsed) = val.parse() {
            config.batch.max_concurrency = parsed;
        }
    }
    if let Ok(val) = std::env::var("HARBOR_BATCH_ITEM_TIMEOUT_SECONDS") {
        if let Ok(parsed) = val.parse() {
            config.batch.item_timeout_seconds = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[nlp]
base_url = "http://localhost:9000"
"#;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(MINIMAL_TOML).unwrap();
        assert_eq!(config.nlp.base_url, "http://localhost:9000");
        assert!(config.phi.detection_enabled);
        assert!(config.storage.is_none());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = load_config("/nonexistent/harbor.toml").unwrap_err();
        assert!(matches!(err, HarborError::Configuration(_)));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HARBOR_TEST_NLP_URL", "http://nlp.internal:9000");
        let toml = r#"
[nlp]
base_url = "${HARBOR_TEST_NLP_URL}"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.nlp.base_url, "http://nlp.internal:9000");
        std::env::remove_var("HARBOR_TEST_NLP_URL");
    }

    #[test]
    fn test_missing_env_var_is_error() {
        let toml = r#"
[nlp]
base_url = "${HARBOR_TEST_UNSET_VARIABLE}"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("HARBOR_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn test_env_vars_in_comments_ignored() {
        let toml = r#"
# Set base_url to ${HARBOR_TEST_COMMENTED_VARIABLE} if needed
[nlp]
base_url = "http://localhost:9000"
"#;
        assert!(load_config_from_str(toml).is_ok());
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = load_config_from_str("nlp = base_url =").unwrap_err();
        assert!(matches!(err, HarborError::Configuration(_)));
    }
}

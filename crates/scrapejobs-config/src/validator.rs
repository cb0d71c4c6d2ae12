//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Attempt counts above this make a busy store stall callers for minutes.
const HIGH_MAX_ATTEMPTS: u32 = 50;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_store(config, &mut result);
        Self::validate_retry(config, &mut result);
        Self::validate_export(config, &mut result);
        Self::validate_runner(config, &mut result);

        Ok(result)
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.path.trim().is_empty() {
            result.add_error(ValidationError::new("store.path", "Database path cannot be empty"));
        }

        if config.store.busy_timeout_ms > config.retry.max_backoff_ms {
            result.add_warning(ValidationWarning::new(
                "store.busy_timeout_ms",
                "busy_timeout_ms exceeds retry.max_backoff_ms, SQLite will wait longer than the retry backoff",
            ));
        }
    }

    fn validate_retry(config: &Config, result: &mut ValidationResult) {
        let retry = &config.retry;

        if retry.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "retry.max_attempts",
                "max_attempts must be greater than 0",
            ));
        }

        if retry.max_attempts > HIGH_MAX_ATTEMPTS {
            result.add_warning(ValidationWarning::new(
                "retry.max_attempts",
                format!("max_attempts is very high (>{})", HIGH_MAX_ATTEMPTS),
            ));
        }

        if retry.initial_backoff_ms == 0 {
            result.add_error(ValidationError::new(
                "retry.initial_backoff_ms",
                "initial_backoff_ms must be greater than 0",
            ));
        }

        if retry.initial_backoff_ms > retry.max_backoff_ms {
            result.add_error(ValidationError::new(
                "retry.max_backoff_ms",
                "max_backoff_ms must not be lower than initial_backoff_ms",
            ));
        }
    }

    fn validate_export(config: &Config, result: &mut ValidationResult) {
        if config.export.data_folder.trim().is_empty() {
            result.add_error(ValidationError::new(
                "export.data_folder",
                "Data folder cannot be empty",
            ));
        }
    }

    fn validate_runner(config: &Config, result: &mut ValidationResult) {
        if config.runner.channel_capacity == 0 {
            result.add_error(ValidationError::new(
                "runner.channel_capacity",
                "channel_capacity must be greater than 0",
            ));
        }

        if config.runner.poll_interval_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "runner.poll_interval_ms",
                "poll_interval_ms is 0, an idle runner will poll the database continuously",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

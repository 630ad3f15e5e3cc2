//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key for error reporting.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

/// Expand every element of a command vector, naming elements `field[i]`.
pub(crate) fn expand_env_all(values: &[String], field: &str) -> Result<Vec<String>, ConfigError> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| expand_env(value, &format!("{field}[{i}]")))
        .collect()
}

//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(expand_env("/opt/drawio", "f").unwrap(), "/opt/drawio");
    }

    #[test]
    fn test_default_used_when_unset() {
        assert_eq!(
            expand_env("${DRAWX_TEST_SURELY_UNSET:-/opt/drawio}", "f").unwrap(),
            "/opt/drawio"
        );
    }

    #[test]
    fn test_unset_variable_is_error() {
        let err = expand_env("${DRAWX_TEST_SURELY_UNSET}/bin", "drawio.executable").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("drawio.executable"), "{msg}");
        assert!(msg.contains("DRAWX_TEST_SURELY_UNSET"), "{msg}");
    }
}

//! `${VAR}` and `${VAR:-default}` expansion for string settings.

use crate::ConfigError;

/// Variable named in `${...}` that is not set and has no default.
struct MissingVar {
    name: String,
}

/// Expand environment variable references in `value`.
///
/// Values without a `${` are returned as written, so plain link targets and
/// prefixes containing `$` need no escaping.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, MissingVar> {
        std::env::var(var).map(Some).map_err(|_| MissingVar {
            name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.name),
    })
}

/// Expand an optional setting in place.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(raw) = value.as_deref() {
        *value = Some(expand_env(raw, field)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_set_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("SNUDOWN_TEST_DOMAIN", "example.org");
        }
        let result = expand_env("${SNUDOWN_TEST_DOMAIN}", "render.domain").unwrap();
        assert_eq!(result, "example.org");
        unsafe {
            std::env::remove_var("SNUDOWN_TEST_DOMAIN");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("SNUDOWN_TEST_UNSET_TARGET");
        }
        let result = expand_env("${SNUDOWN_TEST_UNSET_TARGET:-_blank}", "render.target").unwrap();
        assert_eq!(result, "_blank");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("SNUDOWN_TEST_MISSING");
        }
        let err = expand_env("${SNUDOWN_TEST_MISSING}", "render.toc_id_prefix").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let message = err.to_string();
        assert!(message.contains("SNUDOWN_TEST_MISSING"));
        assert!(message.contains("render.toc_id_prefix"));
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("SNUDOWN_TEST_SITE", "mysite");
        }
        let result = expand_env("${SNUDOWN_TEST_SITE}.example", "render.domain").unwrap();
        assert_eq!(result, "mysite.example");
        unsafe {
            std::env::remove_var("SNUDOWN_TEST_SITE");
        }
    }

    #[test]
    fn test_bare_dollar_untouched() {
        assert_eq!(expand_env("$frame", "render.target").unwrap(), "$frame");
    }

    #[test]
    fn test_expand_opt_none_stays_none() {
        let mut value = None;
        expand_opt(&mut value, "render.domain").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_expand_opt_literal() {
        let mut value = Some("md-".to_owned());
        expand_opt(&mut value, "render.toc_id_prefix").unwrap();
        assert_eq!(value.as_deref(), Some("md-"));
    }
}

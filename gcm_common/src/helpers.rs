use std::{env, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads and parses the environment variable `key`.
///
/// Returns `Ok(None)` if the variable is not set, and `Err` with a human-readable reason if it is set but cannot be
/// parsed. Callers decide whether to fall back to a default and how loudly to complain about it.
pub fn parse_env_var<T: FromStr>(key: &str) -> Result<Option<T>, String>
where T::Err: std::fmt::Display {
    match env::var(key) {
        Ok(s) if s.trim().is_empty() => Ok(None),
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|e| format!("{key} has an invalid value '{s}': {e}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{key} could not be read: {e}")),
    }
}

/// Splits a comma-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("Yes".into()), false));
        assert!(!parse_boolean_flag(Some(" off ".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn env_vars() {
        env::set_var("GCM_TEST_PARSE_ENV_OK", " 42 ");
        env::set_var("GCM_TEST_PARSE_ENV_BAD", "forty-two");
        assert_eq!(parse_env_var::<u64>("GCM_TEST_PARSE_ENV_OK"), Ok(Some(42)));
        assert!(parse_env_var::<u64>("GCM_TEST_PARSE_ENV_BAD").unwrap_err().contains("forty-two"));
        assert_eq!(parse_env_var::<u64>("GCM_TEST_PARSE_ENV_MISSING"), Ok(None));
    }

    #[test]
    fn lists() {
        assert_eq!(split_list("10.0.0.1, ,10.0.0.2,"), vec!["10.0.0.1", "10.0.0.2"]);
        assert!(split_list("").is_empty());
    }
}

//! Utility functions for stubattr

use std::env;

/// Check if an environment variable is set to a truthy value
/// Accepts: "1", "true", "on", "yes", "t" (case insensitive)
pub fn is_env_true(key: &str) -> bool {
    match env::var(key) {
        Ok(val) => is_truthy(&val),
        Err(_) => false,
    }
}

fn is_truthy(val: &str) -> bool {
    let val_lower = val.to_lowercase();
    matches!(val_lower.as_str(), "1" | "true" | "on" | "yes" | "t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_truthy() {
        for val in ["1", "true", "TRUE", "On", "yes", "t"] {
            assert!(is_truthy(val), "{val} should be truthy");
        }
        for val in ["", "0", "false", "no", "nope"] {
            assert!(!is_truthy(val), "{val} should not be truthy");
        }
    }

    #[test]
    fn test_unset_variable_is_false() {
        assert!(!is_env_true("STUBATTR_TEST_SURELY_UNSET_VARIABLE"));
    }
}

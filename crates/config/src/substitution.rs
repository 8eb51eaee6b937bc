use anyhow::{Context, Result};
use regex::Regex;
use std::env;
use tracing::{debug, warn};

const PLACEHOLDER_PATTERN: &str = r"\$\{(\w+)(?::-([^}]*))?\}|\$(\w+)";

/// Substitute environment variables written as `${VAR}`, `${VAR:-default}` or `$VAR`
///
/// Unset variables without a default keep their placeholder so the
/// validator can report them.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(PLACEHOLDER_PATTERN).context("invalid placeholder pattern")?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
        let placeholder = &caps[0];
        let Some(var_name) = caps.get(1).or_else(|| caps.get(3)).map(|m| m.as_str()) else {
            return placeholder.to_string();
        };

        match env::var(var_name) {
            Ok(value) => {
                debug!(var = var_name, "Substituting environment variable");
                value
            }
            Err(_) => match caps.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    warn!("Environment variable '{}' not set", var_name);
                    missing_vars.push(var_name.to_string());
                    placeholder.to_string()
                }
            },
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (may fail validation): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    Regex::new(PLACEHOLDER_PATTERN)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

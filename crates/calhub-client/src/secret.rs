//! Secret reference resolver.
//!
//! Values in `config.toml` that hold credentials can point outside the file:
//!
//! - `env::VAR_NAME` reads `$VAR_NAME` from the environment
//! - anything else is used as-is (plain text)

use thiserror::Error;

/// Prefix marking an environment variable reference.
pub const ENV_PREFIX: &str = "env::";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),

    #[error("environment variable `{0}` is empty")]
    EmptyEnv(String),

    #[error("empty environment variable name after `env::`")]
    EmptyName,
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    match value.strip_prefix(ENV_PREFIX) {
        Some(var) => resolve_env(var.trim()),
        None => Ok(value.to_string()),
    }
}

/// Returns true if the value is a reference rather than the secret itself.
pub fn is_reference(value: &str) -> bool {
    value.starts_with(ENV_PREFIX)
}

fn resolve_env(var: &str) -> Result<String, SecretError> {
    if var.is_empty() {
        return Err(SecretError::EmptyName);
    }
    match std::env::var(var) {
        Ok(value) if value.trim().is_empty() => Err(SecretError::EmptyEnv(var.to_string())),
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => Err(SecretError::MissingEnv(var.to_string())),
    }
}

//! Credential resolution: explicit values first, then the environment

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "NEOCITIES_API_KEY";
/// Environment variable holding the account user name.
pub const ENV_USERNAME: &str = "NEOCITIES_USERNAME";
/// Environment variable holding the account password.
pub const ENV_PASSWORD: &str = "NEOCITIES_PASSWORD";

/// Resolved credentials for the Neocities API.
///
/// An API key is preferred; it is available on the site's settings page and
/// can be fetched once with the `key` operation.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    ApiKey(String),
    Password { username: String, password: String },
}

// Secrets stay out of logs and error chains.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "Credentials::ApiKey(..)"),
            Self::Password { username, .. } => {
                write!(f, "Credentials::Password {{ username: {username:?}, .. }}")
            }
        }
    }
}

impl Credentials {
    /// Try each credential source in order; the first that yields a usable
    /// value wins. Explicit values always beat the environment, and a key
    /// beats a username/password pair from the same source.
    ///
    /// # Errors
    /// Returns [`Error::Credentials`] when every source comes up empty. No
    /// network activity happens here or afterwards without credentials.
    pub fn resolve(
        key: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        let explicit_key = || key.and_then(non_empty).map(Credentials::ApiKey);
        let explicit_pair = || pair(username.and_then(non_empty), password.and_then(non_empty));
        let env_key = || env_var(ENV_API_KEY).map(Credentials::ApiKey);
        let env_pair = || pair(env_var(ENV_USERNAME), env_var(ENV_PASSWORD));

        let chain: [&dyn Fn() -> Option<Credentials>; 4] =
            [&explicit_key, &explicit_pair, &env_key, &env_pair];

        for resolver in chain {
            if let Some(credentials) = resolver() {
                debug!("resolved {} credentials", credentials.kind());
                return Ok(credentials);
            }
        }
        Err(Error::Credentials)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "API key",
            Self::Password { .. } => "username/password",
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().as_deref().and_then(non_empty)
}

fn pair(username: Option<String>, password: Option<String>) -> Option<Credentials> {
    match (username, password) {
        (Some(username), Some(password)) => Some(Credentials::Password { username, password }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    // The environment is process-global; tests that touch it take this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clean_env() -> MutexGuard<'static, ()> {
        let guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for name in [ENV_API_KEY, ENV_USERNAME, ENV_PASSWORD] {
            std::env::remove_var(name);
        }
        guard
    }

    #[test]
    fn test_explicit_key_wins() {
        let _guard = clean_env();
        std::env::set_var(ENV_API_KEY, "env-key");
        let credentials = Credentials::resolve(Some("flag-key"), None, None).unwrap();
        assert_eq!(credentials, Credentials::ApiKey("flag-key".to_string()));
    }

    #[test]
    fn test_explicit_pair_beats_env_key() {
        let _guard = clean_env();
        std::env::set_var(ENV_API_KEY, "env-key");
        let credentials = Credentials::resolve(None, Some("me"), Some("secret")).unwrap();
        assert_eq!(
            credentials,
            Credentials::Password {
                username: "me".to_string(),
                password: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_env_key_beats_env_pair() {
        let _guard = clean_env();
        std::env::set_var(ENV_API_KEY, "env-key");
        std::env::set_var(ENV_USERNAME, "me");
        std::env::set_var(ENV_PASSWORD, "secret");
        let credentials = Credentials::resolve(None, None, None).unwrap();
        assert_eq!(credentials, Credentials::ApiKey("env-key".to_string()));
    }

    #[test]
    fn test_env_pair_is_last_resort() {
        let _guard = clean_env();
        std::env::set_var(ENV_USERNAME, "me");
        std::env::set_var(ENV_PASSWORD, "secret");
        let credentials = Credentials::resolve(None, None, None).unwrap();
        assert!(matches!(credentials, Credentials::Password { .. }));
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let _guard = clean_env();
        std::env::set_var(ENV_API_KEY, "  ");
        let err = Credentials::resolve(Some(""), None, None).unwrap_err();
        assert!(matches!(err, Error::Credentials));
    }

    #[test]
    fn test_username_without_password_is_not_enough() {
        let _guard = clean_env();
        let err = Credentials::resolve(None, Some("me"), None).unwrap_err();
        assert!(matches!(err, Error::Credentials));
    }

    #[test]
    fn test_no_sources_fails() {
        let _guard = clean_env();
        let err = Credentials::resolve(None, None, None).unwrap_err();
        assert!(matches!(err, Error::Credentials));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let credentials = Credentials::Password {
            username: "me".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("hunter2"), "{debug}");
    }
}

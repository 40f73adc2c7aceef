//! Command line settings
//!
//! Resolution order for each value: explicit flag, then environment
//! (`DUNE_LEDGER_DB`, `DUNE_LEDGER_USER`, `DUNE_LEDGER_ADMINS`, handled by
//! clap), then the fallbacks below.

use std::path::PathBuf;

use crate::error::{Result, RunError};
use crate::ledger::AdminList;
use crate::models::Identity;

pub const DEFAULT_DATABASE: &str = "dune_runs.db";

/// OS variables consulted when no user was given
const USER_FALLBACK_VARS: [&str; 2] = ["USER", "USERNAME"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: PathBuf,
    pub user: Identity,
    pub admins: AdminList,
}

impl Settings {
    pub fn resolve(database: PathBuf, user: Option<String>, admins: Vec<String>) -> Result<Self> {
        Ok(Self {
            database,
            user: resolve_user(user.as_deref(), |key| std::env::var(key).ok())?,
            admins: AdminList::new(admins),
        })
    }
}

/// `tracing` filter directive used when `RUST_LOG` is not set
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose { "info" } else { "warn" }
}

/// Pick the acting identity from an explicit value or the OS user
pub fn resolve_user<F>(explicit: Option<&str>, env: F) -> Result<Identity>
where
    F: Fn(&str) -> Option<String>,
{
    let from_env = || USER_FALLBACK_VARS.into_iter().find_map(|key| env(key));
    explicit
        .map(str::to_string)
        .or_else(from_env)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .map(Identity)
        .ok_or_else(|| RunError::invalid("no user given; pass --user or set DUNE_LEDGER_USER"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AdminCheck;

    #[test]
    fn test_explicit_user_wins() {
        let user = resolve_user(Some(" leto "), |_| Some("os-user".into())).unwrap();
        assert_eq!(user, Identity::from("leto"));
    }

    #[test]
    fn test_user_falls_back_to_os() {
        let user = resolve_user(None, |key| (key == "USERNAME").then(|| "jessica".into())).unwrap();
        assert_eq!(user.as_str(), "jessica");
    }

    #[test]
    fn test_missing_user_is_invalid() {
        let err = resolve_user(None, |_| None).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        assert!(resolve_user(Some("  "), |_| None).is_err());
    }

    #[test]
    fn test_settings_admins() {
        let settings = Settings::resolve(
            DEFAULT_DATABASE.into(),
            Some("leto".into()),
            vec!["stilgar".into(), " ".into()],
        )
        .unwrap();
        assert_eq!(settings.admins.len(), 1);
        assert!(settings.admins.is_admin(&"stilgar".into()));
        assert_eq!(default_log_filter(false), "warn");
        assert_eq!(default_log_filter(true), "info");
    }
}

//! Command-line configuration.

use anyhow::{Context, Result};
use ledger_core::SelectionPolicy;

/// Environment variable consulted when `--policy` is not given.
pub const POLICY_ENV: &str = "LEDGER_POLICY";

/// Settings shared by every subcommand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliConfig {
    /// Settlement policy for `settle`.
    pub policy: SelectionPolicy,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log output format ("text" or "json").
    pub log_format: String,
    /// Pretty-print JSON written to files.
    pub pretty: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            pretty: false,
        }
    }
}

impl CliConfig {
    /// Pick the policy: explicit flag first, then the environment value,
    /// then the default.
    pub fn resolve_policy(
        flag: Option<SelectionPolicy>,
        env_value: Option<&str>,
    ) -> Result<SelectionPolicy> {
        if let Some(policy) = flag {
            return Ok(policy);
        }
        match env_value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("{POLICY_ENV} is invalid")),
            None => Ok(SelectionPolicy::default()),
        }
    }

    /// Read [`POLICY_ENV`] from the process environment.
    pub fn policy_from_env(flag: Option<SelectionPolicy>) -> Result<SelectionPolicy> {
        let env_value = std::env::var(POLICY_ENV).ok();
        Self::resolve_policy(flag, env_value.as_deref())
    }

    /// Serialize `value` as compact or pretty JSON per [`pretty`](Self::pretty).
    pub fn to_json<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        json.context("failed to serialize JSON")
    }
}

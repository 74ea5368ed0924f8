//! Layered configuration loading: a default baseline, an optional TOML
//! file, then environment variables, the last taking final precedence —
//! the same layered-source convention used elsewhere in this codebase's
//! configuration loader (SPEC_FULL.md §6.4), built on the `config` crate
//! rather than hand-rolled parsing.

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;

/// Tunables recognised by `init(config)`, per SPEC_FULL.md §6.4.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub max_concurrent_jobs: usize,
    pub max_queue_size: usize,
    pub retry_delay_base: f64,
    pub retry_delay_cap_secs: u64,
    pub scheduler_check_interval_secs: u64,
    pub scheduler_tolerance_secs: u64,
    pub database_url: String,
    pub log_format: String,
    pub provider_timeout_secs: u64,
}

impl DaemonConfig {
    /// Loads configuration from the default baseline, optionally overlaid
    /// by `file_path` (a TOML file), then by environment variables.
    /// Environment variable substitution (`${VAR}`/`$VAR`) runs on the file
    /// contents before parsing, so a committed config file can defer
    /// secrets to the environment without the `config` crate's own
    /// environment layer.
    pub fn load(file_path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = Cfg::builder()
            .set_default("max_concurrent_jobs", 5)?
            .set_default("max_queue_size", 1000)?
            .set_default("retry_delay_base", 2.0)?
            .set_default("retry_delay_cap_secs", 600)?
            .set_default("scheduler_check_interval_secs", 30)?
            .set_default("scheduler_tolerance_secs", 30)?
            .set_default("database_url", "sqlite::memory:")?
            .set_default("log_format", "pretty")?
            .set_default("provider_timeout_secs", 300)?;

        if let Some(path) = file_path {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading config file {path}: {e}"))?;
            let substituted = substitute_env_vars(&raw);
            builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
        }

        builder = builder.add_source(Environment::default().try_parsing(true));

        let config = builder.build()?;
        let daemon_config: DaemonConfig = config.try_deserialize()?;

        if daemon_config.max_concurrent_jobs == 0 {
            anyhow::bail!("max_concurrent_jobs must be at least 1");
        }

        Ok(daemon_config)
    }
}

/// Replaces `${VAR}` and `$VAR` references with the named environment
/// variable's value, leaving unresolved references untouched.
fn substitute_env_vars(content: &str) -> String {
    let braced = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid");
    let result = braced
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string();

    let bare = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("static regex is valid");
    bare.replace_all(&result, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_with_no_file_and_no_env() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.max_concurrent_jobs, 5);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.log_format, "pretty");
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrent_jobs = 12\ndatabase_url = \"sqlite://taskloom.db\"").unwrap();
        let config = DaemonConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.max_concurrent_jobs, 12);
        assert_eq!(config.database_url, "sqlite://taskloom.db");
    }

    #[test]
    fn env_var_substitution_resolves_braced_references() {
        std::env::set_var("TASKLOOM_TEST_SUBSTITUTION_VAR", "resolved-value");
        let result = substitute_env_vars("database_url = \"${TASKLOOM_TEST_SUBSTITUTION_VAR}\"");
        assert!(result.contains("resolved-value"));
        std::env::remove_var("TASKLOOM_TEST_SUBSTITUTION_VAR");
    }

    #[test]
    fn rejects_zero_workers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrent_jobs = 0").unwrap();
        let err = DaemonConfig::load(Some(file.path().to_str().unwrap())).unwrap_err();
        assert!(err.to_string().contains("max_concurrent_jobs"));
    }
}

//! Implementation of the `carapace check` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub valid: bool,
    pub source: String,
    pub config: Config,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let c = &self.config;
        let ttl = c
            .cache
            .ttl_ms
            .map_or_else(|| "none".to_string(), |ms| format!("{ms} ms"));
        let lines = [
            format!("Configuration OK ({})", self.source),
            format!("  logging: level={} format={}", c.logging.level, c.logging.format),
            format!(
                "  timing:  label={} unit={}",
                c.timing.label.as_deref().unwrap_or("(operation name)"),
                c.timing.unit
            ),
            format!(
                "  retry:   attempts={} delay={}ms backoff={} jitter={}ms",
                c.retry.attempts, c.retry.delay_ms, c.retry.backoff, c.retry.jitter_ms
            ),
            format!("  cache:   ttl={ttl}"),
        ];
        lines.join("\n")
    }
}

/// Print the effective configuration. Loading already validated it.
pub fn execute(config: Config, source: String, json_mode: bool) -> Result<()> {
    let result = CheckOutput {
        valid: true,
        source,
        config,
    };
    output(&result, json_mode);
    Ok(())
}

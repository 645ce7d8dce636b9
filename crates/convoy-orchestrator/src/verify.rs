//! Verification and integration
//!
//! Runs the measurement command before and after the fleet, captures raw
//! output, extracts a headline metric, runs the test suite, and generates
//! the deterministic per-agent integration script. None of this can abort
//! orchestration: measurement and test failures degrade to warnings and
//! partial results.

use convoy_core::{ConvoyConfig, Result};
use regex::Regex;
use tokio::process::Command;
use tracing::{info, warn};

use crate::channel::CommunicationChannel;
use crate::registry::AgentRegistry;

/// Runs measurements, tests, and integration-script generation
pub struct Verifier {
    channel: CommunicationChannel,
    audit_command: String,
    test_command: String,
}

impl Verifier {
    pub fn new(channel: CommunicationChannel, config: &ConvoyConfig) -> Self {
        Self {
            channel,
            audit_command: config.audit_command.clone(),
            test_command: config.test_command.clone(),
        }
    }

    /// Run the audit command and extract the headline metric
    ///
    /// Raw output lands in `<label>-audit.txt`. Audit tools exit non-zero
    /// when they find something, so the metric is parsed regardless of
    /// exit status; only a spawn failure or unparsable output yields
    /// `None`, logged as a warning and never fatal.
    pub async fn measure(&self, label: &str) -> Option<u64> {
        info!("Measuring ({}) via `{}`", label, self.audit_command);

        let output = match Command::new("sh")
            .arg("-c")
            .arg(&self.audit_command)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Audit command failed to run: {}; skipping measurement", e);
                return None;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let capture = self.channel.audit_capture(label);
        if let Err(e) = std::fs::write(&capture, format!("{}{}", stdout, stderr)) {
            warn!("Could not write {:?}: {}", capture, e);
        }

        let metric = parse_metric(&stdout).or_else(|| parse_metric(&stderr));
        match metric {
            Some(value) => info!("{} metric: {}", label, value),
            None => warn!("No metric found in {} audit output", label),
        }
        metric
    }

    /// Delta between two measurements, only when both exist
    ///
    /// A failed measurement omits the delta from the report; it is never
    /// assumed zero.
    pub fn delta(before: Option<u64>, after: Option<u64>) -> Option<i64> {
        Some(after? as i64 - before? as i64)
    }

    /// Run the test suite and capture its summary
    ///
    /// Returns whether the suite passed, or `None` when it could not be
    /// run at all. A failing suite is a reporting concern, not an
    /// orchestration failure.
    pub async fn run_tests(&self) -> Option<bool> {
        info!("Running test suite via `{}`", self.test_command);

        let output = match Command::new("sh")
            .arg("-c")
            .arg(&self.test_command)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Test command failed to run: {}", e);
                return None;
            }
        };

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let tail: Vec<&str> = combined.lines().rev().take(5).collect();
        for line in tail.iter().rev() {
            info!("  {}", line);
        }

        let passed = output.status.success();
        if !passed {
            warn!("Test suite reported failures");
        }
        Some(passed)
    }

    /// Write the deterministic integration script
    ///
    /// One block per agent, in registry order: commit workspace changes,
    /// then merge the agent's branch into main with a fixed message. The
    /// script is written with the executable bit set but never executed
    /// from here.
    pub fn write_merge_script(&self, registry: &AgentRegistry, run_id: &str) -> Result<std::path::PathBuf> {
        let mut script = String::new();
        script.push_str("#!/usr/bin/env bash\n");
        script.push_str("set -euo pipefail\n\n");

        for agent in registry.agents() {
            let workspace = agent.workspace.display();
            script.push_str(&format!("echo \"=== integrating {} ===\"\n", agent.id));
            script.push_str(&format!("git -C \"{}\" add -A\n", workspace));
            script.push_str(&format!(
                "git -C \"{}\" diff --cached --quiet || git -C \"{}\" commit -m \"convoy({}): apply automated fixes\"\n",
                workspace, workspace, agent.id
            ));
            script.push_str(&format!(
                "git merge --no-ff \"agent/{}\" -m \"convoy: merge {} fixes\"\n\n",
                agent.id, agent.id
            ));
        }

        let path = self.channel.merge_script(run_id);
        std::fs::write(&path, script)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }

        info!("Wrote integration script {:?}", path);
        Ok(path)
    }
}

/// Extract the headline metric from audit output
///
/// Prefers a count followed by a finding keyword ("12 vulnerabilities",
/// "3 findings"), falling back to the first integer anywhere.
fn parse_metric(output: &str) -> Option<u64> {
    let keyword = Regex::new(r"(\d+)\s+(?:vulnerabilit|finding|issue)").ok()?;
    if let Some(caps) = keyword.captures(output) {
        return caps[1].parse().ok();
    }

    let any_number = Regex::new(r"\d+").ok()?;
    any_number.find(output)?.as_str().parse().ok()
}

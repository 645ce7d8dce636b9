//! Prompt generation for fleet agents
//!
//! Builds the per-agent instruction document from its task spec:
//! - Reference document to follow
//! - Files the agent is expected to fix
//! - Named patterns to apply
//! - A fixed instruction block keyed by the agent's role
//! - The status protocol the monitor depends on

use convoy_core::{AgentDescriptor, AgentRole, Result, TaskSpec};
use tracing::{info, warn};

use crate::channel::CommunicationChannel;
use crate::registry::AgentRegistry;

/// Build the instruction document for one agent
///
/// Pure function of its inputs; identical inputs always yield an
/// identical document.
pub fn generate(agent: &AgentDescriptor, spec: &TaskSpec) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# AGENT {} ({})\n\n", agent.id, agent.role));

    prompt.push_str("## REFERENCE\n\n");
    if spec.reference.is_empty() {
        prompt.push_str("No reference document for this task.\n\n");
    } else {
        prompt.push_str(&format!(
            "Read {} before touching any file. It defines the fixes you are applying.\n\n",
            spec.reference
        ));
    }

    if !spec.files_to_fix.is_empty() {
        prompt.push_str("## FILES TO FIX\n\n");
        for file in &spec.files_to_fix {
            prompt.push_str(&format!("- {}\n", file));
        }
        prompt.push('\n');
    }

    if !spec.patterns_to_apply.is_empty() {
        prompt.push_str("## PATTERNS TO APPLY\n\n");
        for pattern in &spec.patterns_to_apply {
            prompt.push_str(&format!("- {}\n", pattern));
        }
        prompt.push('\n');
    }

    prompt.push_str("## ROLE INSTRUCTIONS\n\n");
    prompt.push_str(role_instructions(agent.role));
    prompt.push('\n');

    prompt.push_str("## STATUS PROTOCOL\n\n");
    prompt.push_str(&format!(
        "Work only inside your workspace. Report progress by writing\n\
         `progress/{id}/metrics.json` in the communication root:\n\n\
         ```json\n\
         {{ \"completion\": 40, \"status\": \"running\" }}\n\
         ```\n\n\
         Set `status` to `complete` with `completion` 100 when every listed\n\
         file is fixed. Append notable steps to `progress/{id}/progress.md`.\n\
         Record blockers under `blockers/{id}/` and handoff notes under\n\
         `handoffs/{id}/`.\n",
        id = agent.id
    ));

    prompt
}

/// Fixed instruction block for a role
fn role_instructions(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Security => {
            "Replace every weak primitive named in the pattern list with its\n\
             hardened counterpart. Never log key material. Keep public\n\
             function signatures unchanged so callers do not break.\n"
        }
        AgentRole::Services => {
            "Apply the patterns to the service layer only. Preserve existing\n\
             error types and retry behavior; do not change API response\n\
             shapes.\n"
        }
        AgentRole::Interface => {
            "Apply the patterns to the listed screens. Do not alter layout or\n\
             user-visible copy; these are under-the-hood fixes only.\n"
        }
        AgentRole::Testing => {
            "Write regression tests covering each pattern applied by the\n\
             other agents. Tests must fail against the unfixed code and pass\n\
             against the fixed code.\n"
        }
    }
}

/// Generate and write prompts for every agent with a task spec
///
/// Agents whose spec file is missing or malformed are skipped with a
/// warning; this never aborts the run. Returns the number of prompts
/// written.
pub fn write_prompts(channel: &CommunicationChannel, registry: &AgentRegistry) -> Result<usize> {
    let mut written = 0;

    for agent in registry.agents() {
        let Some(spec) = channel.load_task_spec(&agent.task_spec) else {
            warn!("Skipping prompt for {}: no task spec", agent.id);
            continue;
        };

        let document = generate(agent, &spec);
        std::fs::write(channel.prompt_path(&agent.id), document)?;
        info!("Wrote prompt for {}", agent.id);
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::ConvoyConfig;

    fn spec() -> TaskSpec {
        TaskSpec {
            reference: "docs/security-playbook.md".to_string(),
            files_to_fix: vec!["src/crypto/keys.ts".to_string()],
            patterns_to_apply: vec!["sha1-to-sha256".to_string()],
        }
    }

    fn agent() -> AgentDescriptor {
        AgentDescriptor::new("crypto", AgentRole::Security, "/w/crypto", "crypto", 1)
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(&agent(), &spec());
        let b = generate(&agent(), &spec());
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_includes_spec_content() {
        let doc = generate(&agent(), &spec());
        assert!(doc.contains("AGENT crypto (security)"));
        assert!(doc.contains("docs/security-playbook.md"));
        assert!(doc.contains("src/crypto/keys.ts"));
        assert!(doc.contains("sha1-to-sha256"));
        assert!(doc.contains("progress/crypto/metrics.json"));
    }

    #[test]
    fn test_role_blocks_differ() {
        let sec = generate(&agent(), &spec());
        let tester = AgentDescriptor::new("tests", AgentRole::Testing, "/w/tests", "tests", 5);
        let tst = generate(&tester, &spec());
        assert_ne!(sec, tst);
        assert!(tst.contains("regression tests"));
    }

    #[test]
    fn test_write_prompts_soft_skips_missing_specs() {
        let dir = tempfile::tempdir().unwrap();
        let channel = CommunicationChannel::new(dir.path());
        let registry = AgentRegistry::from_config(&ConvoyConfig::default());
        channel.ensure_channels(registry.agents()).unwrap();

        // Only one agent gets a spec; the rest are skipped, not fatal.
        std::fs::write(
            channel.task_path("crypto"),
            serde_json::to_string(&spec()).unwrap(),
        )
        .unwrap();

        let written = write_prompts(&channel, &registry).unwrap();
        assert_eq!(written, 1);
        assert!(channel.prompt_path("crypto").exists());
        assert!(!channel.prompt_path("storage").exists());
    }
}

//! Minimal agent-definition-file loader: front-matter plus four
//! `##` Markdown sections, parsed just deeply enough to construct
//! `AgentConfig` values for a demo run. Not part of the core's tested
//! surface — a real deployment would own a richer loader (skills, templates,
//! validation) outside this crate entirely.

use std::fs;
use std::path::Path;

use quorum_core::AgentConfig;

const DEFAULT_OUTPUT_FORMAT: &str = "## Output Format\n\nReturn findings as Markdown headings.";

/// Reads every `*.md` file directly inside `dir` and parses it into an
/// [`AgentConfig`]. Files that fail to parse are skipped with a warning
/// rather than aborting the whole load — one malformed agent definition
/// should not block a review of the rest.
pub fn load_agents_from_dir(dir: &Path) -> anyhow::Result<Vec<AgentConfig>> {
    let mut agents = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("md"))
        .collect();
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();
        match fs::read_to_string(&path) {
            Ok(raw) => agents.push(parse_agent_definition(&raw)),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping unreadable agent definition");
            }
        }
    }

    Ok(agents)
}

fn parse_agent_definition(raw: &str) -> AgentConfig {
    let (front_matter, body) = split_front_matter(raw);

    let name = front_matter_value(front_matter, "name").unwrap_or_default();
    let display_name = front_matter_value(front_matter, "description").unwrap_or_default();
    let model = front_matter_value(front_matter, "model").unwrap_or_else(|| "gpt-5".to_string());

    let role = section(body, "Role").unwrap_or_else(|| body.trim().to_string());
    let output_format = section(body, "Output Format").unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());
    let focus_areas = section(body, "Focus Areas")
        .map(|block| parse_bullets(&block))
        .filter(|bullets| !bullets.is_empty())
        .unwrap_or_else(|| vec!["General code quality".to_string()]);
    let instruction_template =
        section(body, "Instruction").unwrap_or_else(|| "Review ${repository} and report findings.".to_string());

    AgentConfig {
        name,
        display_name,
        model,
        system_prompt: role,
        instruction_template,
        output_format,
        focus_areas,
        skills: Vec::new(),
    }
}

/// Splits `---\nkey: value\n---\nbody` front-matter from the rest of the
/// file. Returns an empty front-matter block when none is present.
fn split_front_matter(raw: &str) -> (&str, &str) {
    let trimmed = raw.trim_start();
    let Some(rest) = trimmed.strip_prefix("---") else {
        return ("", raw);
    };
    let Some(end) = rest.find("\n---") else {
        return ("", raw);
    };
    let front_matter = &rest[..end];
    let body = &rest[end + 4..];
    (front_matter, body.trim_start_matches('\n'))
}

fn front_matter_value(front_matter: &str, key: &str) -> Option<String> {
    front_matter.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() == key {
            Some(v.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// Extracts the body of a `## <name>` section up to the next `## ` heading
/// or end of file.
fn section(body: &str, name: &str) -> Option<String> {
    let heading = format!("## {name}");
    let start = body.find(&heading)? + heading.len();
    let rest = &body[start..];
    let end = rest.find("\n## ").unwrap_or(rest.len());
    let content = rest[..end].trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

fn parse_bullets(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.trim().strip_prefix('-').map(|rest| rest.trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"---
name: sec
description: Security Reviewer
model: gpt-5
---

## Role

You are a security reviewer focused on finding vulnerabilities.

## Instruction

Review ${repository} for security issues.

## Output Format

Return findings as a Markdown list.

## Focus Areas

- Injection
- Authentication
"#;

    #[test]
    fn parses_a_complete_definition() {
        let agent = parse_agent_definition(EXAMPLE);
        assert_eq!(agent.name, "sec");
        assert_eq!(agent.display_name, "Security Reviewer");
        assert_eq!(agent.model, "gpt-5");
        assert!(agent.system_prompt.contains("security reviewer"));
        assert!(agent.instruction_template.contains("${repository}"));
        assert_eq!(agent.focus_areas, vec!["Injection".to_string(), "Authentication".to_string()]);
        assert!(agent.is_usable());
    }

    #[test]
    fn missing_role_section_falls_back_to_the_whole_body() {
        let raw = "---\nname: x\n---\n\nJust a plain description with no sections.";
        let agent = parse_agent_definition(raw);
        assert!(agent.system_prompt.contains("Just a plain description"));
    }

    #[test]
    fn missing_focus_areas_defaults_to_a_generic_label() {
        let raw = "---\nname: x\n---\n\n## Role\n\nbody\n";
        let agent = parse_agent_definition(raw);
        assert_eq!(agent.focus_areas, vec!["General code quality".to_string()]);
    }

    #[test]
    fn missing_output_format_falls_back_to_the_built_in_default() {
        let raw = "---\nname: x\n---\n\n## Role\n\nbody\n";
        let agent = parse_agent_definition(raw);
        assert!(agent.output_format.starts_with("## Output Format"));
    }
}

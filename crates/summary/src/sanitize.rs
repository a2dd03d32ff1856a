/// Replaces any character outside `[A-Za-z0-9._-]` with `_`. Used
/// to turn an agent's name into a safe report-link filename fragment.
/// Idempotent: the output alphabet is a subset of the allowed characters, so
/// re-sanitizing a sanitized name is a no-op.
pub fn sanitize_agent_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

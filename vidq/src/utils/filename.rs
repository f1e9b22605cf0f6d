//! Path-component sanitization for uploader subfolders.
//!
//! Uploader names come straight from the resolver and may contain characters
//! that are invalid on Windows (`"Foo | Bar"`, `"AC/DC"`) or be reserved
//! device names. Non-ASCII text is kept as is.

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Fallback directory name when nothing usable is left.
pub const FALLBACK_COMPONENT: &str = "unnamed";

/// Turn an arbitrary display string into a single safe path component.
///
/// Runs of invalid or control characters collapse into one `_`, leading and
/// trailing spaces and dots are trimmed, and reserved device names get a `_`
/// prefix.
///
/// ```
/// use vidq::utils::filename::sanitize_component;
///
/// assert_eq!(sanitize_component("AC/DC"), "AC_DC");
/// assert_eq!(sanitize_component("  ..."), "unnamed");
/// assert_eq!(sanitize_component("nul"), "_nul");
/// ```
pub fn sanitize_component(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut pending_replacement = false;

    for c in input.chars() {
        if c.is_control() || INVALID_CHARS.contains(&c) {
            pending_replacement = true;
            continue;
        }
        if pending_replacement {
            cleaned.push('_');
            pending_replacement = false;
        }
        cleaned.push(c);
    }
    if pending_replacement {
        cleaned.push('_');
    }

    let trimmed = cleaned.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        return FALLBACK_COMPONENT.to_string();
    }

    let stem = trimmed.split('.').next().unwrap_or(trimmed).to_uppercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return format!("_{trimmed}");
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_untouched() {
        assert_eq!(sanitize_component("Alice"), "Alice");
        assert_eq!(sanitize_component("Linus Tech Tips"), "Linus Tech Tips");
    }

    #[test]
    fn test_separators_replaced() {
        assert_eq!(sanitize_component("AC/DC"), "AC_DC");
        assert_eq!(sanitize_component("Foo | Bar"), "Foo _ Bar");
        assert_eq!(sanitize_component("a\\b"), "a_b");
    }

    #[test]
    fn test_runs_collapse() {
        assert_eq!(sanitize_component("what?!?*"), "what_!_");
        assert_eq!(sanitize_component("x<>:\"y"), "x_y");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(sanitize_component("line\nbreak"), "line_break");
    }

    #[test]
    fn test_trims_dots_and_spaces() {
        assert_eq!(sanitize_component(" ..channel.. "), "channel");
        assert_eq!(sanitize_component(".."), FALLBACK_COMPONENT);
        assert_eq!(sanitize_component(""), FALLBACK_COMPONENT);
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(sanitize_component("CON"), "_CON");
        assert_eq!(sanitize_component("com1.backup"), "_com1.backup");
        assert_eq!(sanitize_component("CONSOLE"), "CONSOLE");
    }

    #[test]
    fn test_cjk_kept() {
        assert_eq!(sanitize_component("喵喵频道"), "喵喵频道");
        assert_eq!(sanitize_component("喵喵:频道"), "喵喵_频道");
    }

    #[test]
    fn test_idempotent() {
        for input in ["AC/DC", " ..x.. ", "CON", "喵?", "a|b|c"] {
            let once = sanitize_component(input);
            assert_eq!(sanitize_component(&once), once, "input: {input}");
        }
    }
}

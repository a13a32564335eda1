use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid variable pattern"))
}

fn blank_lines_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"))
}

/// `{name}` placeholders in a template, sorted and de-duplicated
pub fn template_variables(text: &str) -> Vec<String> {
    variable_pattern()
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Insert `{var}` at a character offset (clamped to the end of the text).
/// Returns the new text and the cursor position just after the insertion.
pub fn insert_variable(text: &str, cursor: usize, var: &str) -> (String, usize) {
    let placeholder = format!("{{{}}}", var);
    let char_count = text.chars().count();
    let cursor = cursor.min(char_count);

    let byte_offset = text
        .char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    let mut result = String::with_capacity(text.len() + placeholder.len());
    result.push_str(&text[..byte_offset]);
    result.push_str(&placeholder);
    result.push_str(&text[byte_offset..]);

    (result, cursor + placeholder.chars().count())
}

/// Strip trailing whitespace per line, collapse runs of blank lines, trim
pub fn format_prompt(text: &str) -> String {
    let stripped = text
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    blank_lines_pattern()
        .replace_all(&stripped, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_sorted_unique() {
        let text = "你是{name}，患有{disease}。{name}今年{age}岁。{ not_a_var } {also-not}";
        assert_eq!(template_variables(text), vec!["age", "disease", "name"]);
    }

    #[test]
    fn test_no_variables() {
        assert!(template_variables("plain text").is_empty());
    }

    #[test]
    fn test_insert_at_cursor_counts_chars() {
        let (text, cursor) = insert_variable("患者：。", 3, "name");
        assert_eq!(text, "患者：{name}。");
        assert_eq!(cursor, 9);
    }

    #[test]
    fn test_insert_clamps_cursor() {
        let (text, cursor) = insert_variable("abc", 99, "x");
        assert_eq!(text, "abc{x}");
        assert_eq!(cursor, 6);
    }

    #[test]
    fn test_format_prompt() {
        let raw = "  \nline one   \nline two\t\n\n\n\n\nline three  \n\n";
        assert_eq!(format_prompt(raw), "line one\nline two\n\nline three");
    }
}

use std::sync::OnceLock;

use regex::Regex;

fn separator_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[\s,]+").expect("separator regex must compile"))
}

pub fn split_on_spaces(text: &str) -> Vec<String> {
    text.split_whitespace().map(ToString::to_string).collect()
}

pub fn split_on_spaces_and_commas(text: &str) -> Vec<String> {
    separator_regex()
        .split(text.trim())
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn split_on_periods(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Splits a console line on whitespace. Double or single quotes group words
/// into one token; the quotes themselves are dropped.
pub fn tokenize_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for ch in line.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

pub fn is_all_ascii(text: &str) -> bool {
    text.is_ascii()
}

pub fn is_all_alphabetical(text: &str) -> bool {
    text.chars().all(char::is_alphabetic)
}

#[cfg(test)]
mod text_tests {
    use super::*;

    #[test]
    fn splits_on_spaces_and_commas() {
        assert_eq!(split_on_spaces_and_commas(" a, b ,c  d "), vec!["a", "b", "c", "d"]);
        assert!(split_on_spaces_and_commas("  ").is_empty());
    }

    #[test]
    fn splits_on_periods_dropping_empty_segments() {
        assert_eq!(split_on_periods(".storage.value"), vec!["storage", "value"]);
        assert_eq!(split_on_periods("a..b"), vec!["a", "b"]);
    }

    #[test]
    fn tokenizer_keeps_quoted_groups() {
        assert_eq!(
            tokenize_command_line(r#"operation info message="hello world" x"#),
            vec!["operation", "info", "message=hello world", "x"]
        );
        assert_eq!(tokenize_command_line("say ''"), vec!["say", ""]);
        assert!(tokenize_command_line("   ").is_empty());
    }

    #[test]
    fn character_class_checks() {
        assert!(is_all_ascii("abc 123"));
        assert!(!is_all_ascii("caf\u{e9}"));
        assert!(is_all_alphabetical("abc"));
        assert!(!is_all_alphabetical("ab1"));
    }
}

//! Markdown cleanup for model output

/// Undo escape sequences models emit literally (`\n`, `\|`, `\\`)
pub fn clean_llm_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('|') => {
                chars.next();
                out.push('|');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }

    out
}

/// Backslash-escape Markdown emphasis and code characters
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '_' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_llm_markdown() {
        assert_eq!(clean_llm_markdown(r"line one\nline two"), "line one\nline two");
        assert_eq!(clean_llm_markdown(r"| a \| b |"), "| a | b |");
        assert_eq!(clean_llm_markdown(r"path\\to"), r"path\to");
        assert_eq!(clean_llm_markdown(r"keep \t as is"), r"keep \t as is");
        assert_eq!(clean_llm_markdown("trailing \\"), "trailing \\");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("*bold* _it_ `code`"), r"\*bold\* \_it\_ \`code\`");
        assert_eq!(escape_markdown("plain"), "plain");
    }
}

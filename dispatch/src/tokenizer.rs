/// Splits message text into argument tokens.
///
/// Whitespace separates tokens. Double quotes group text containing spaces
/// into one token, and `\"` inside quotes yields a literal quote. An
/// unterminated quote runs to the end of the input.
///
/// # Examples
///
/// ```
/// use chat_command_dispatch::tokenize;
///
/// assert_eq!(tokenize(r#"role add "Night Owls" "#), ["role", "add", "Night Owls"]);
/// assert_eq!(tokenize(r#"say "" done"#), ["say", "", "done"]);
/// ```
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            '\\' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(tokenize("  roll\t6   2 \n"), ["roll", "6", "2"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_quotes_join_words() {
        assert_eq!(tokenize(r#"note "buy milk" later"#), ["note", "buy milk", "later"]);
        assert_eq!(tokenize(r#"a"b c"d"#), ["ab cd"]);
    }

    #[test]
    fn test_escaped_quote_inside_quotes() {
        assert_eq!(tokenize(r#"say "she said \"hi\"""#), ["say", r#"she said "hi""#]);
        assert_eq!(tokenize(r#"path C:\dir"#), ["path", r"C:\dir"]);
    }

    #[test]
    fn test_apostrophes_are_literal() {
        assert_eq!(tokenize("say don't stop"), ["say", "don't", "stop"]);
        assert_eq!(tokenize(r#"quote "it's fine" 'twas"#), ["quote", "it's fine", "'twas"]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        assert_eq!(tokenize(r#"echo "open ended"#), ["echo", "open ended"]);
    }
}

pub mod parsers;

use crate::error::LaunchError;

/// Split a shell command line into words.
///
/// Handles the quoting produced by `shell_escape`: single quotes, double
/// quotes and backslash escapes. No expansion is performed and an unquoted
/// `#` starts a comment. Unquoted `;`, `&&` and `||` always end a word and
/// come back as words of their own.
///
/// # Examples
///
/// ```
/// use glaunch::utils::split_words;
///
/// assert_eq!(
///     split_words("python -m create_heatmap --chunks 4").unwrap(),
///     vec!["python", "-m", "create_heatmap", "--chunks", "4"]
/// );
/// assert_eq!(split_words("cd '/data/my run'").unwrap(), vec!["cd", "/data/my run"]);
/// assert_eq!(split_words(r"echo 'it'\''s'").unwrap(), vec!["echo", "it's"]);
/// assert_eq!(split_words("cd /a||exit 1").unwrap(), vec!["cd", "/a", "||", "exit", "1"]);
/// ```
pub fn split_words(line: &str) -> Result<Vec<String>, LaunchError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => end_word(&mut words, &mut current, &mut in_word),
            '#' if !in_word => break,
            ';' => {
                end_word(&mut words, &mut current, &mut in_word);
                words.push(";".to_string());
            }
            '&' | '|' if chars.peek() == Some(&ch) => {
                chars.next();
                end_word(&mut words, &mut current, &mut in_word);
                words.push(format!("{ch}{ch}"));
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(unterminated(line, '\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(unterminated(line, '"')),
                        },
                        Some(c) => current.push(c),
                        None => return Err(unterminated(line, '"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    current.push(c);
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn end_word(words: &mut Vec<String>, current: &mut String, in_word: &mut bool) {
    if *in_word {
        words.push(std::mem::take(current));
        *in_word = false;
    }
}

fn unterminated(line: &str, quote: char) -> LaunchError {
    LaunchError::parse(format!("unterminated {quote} quote in `{line}`"))
}

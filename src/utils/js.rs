//! Text helpers for slicing JavaScript source without parsing it

use crate::error::SigError;

/// Characters after which a `/` opens a regular expression literal rather than a division
const REGEX_PREFIX: &[char] = &[
    '(', '[', '{', '}', ':', ';', ',', '=', '!', '&', '|', '?', '+', '-', '*', '%', '<', '>', '~', '^',
];

/// Keywords that can be directly followed by an expression
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "throw", "void", "delete", "in", "of", "else", "do", "new",
    "instanceof", "yield", "await",
];

#[derive(Debug, Clone, Copy)]
enum Literal {
    Quote(char),
    Regex { in_class: bool },
}

/// Return the text between the first `left` and the next `right` after it.
pub fn between<'a>(haystack: &'a str, left: &str, right: &str) -> Option<&'a str> {
    let start = haystack.find(left)? + left.len();
    let rest = &haystack[start..];
    let end = rest.find(right)?;
    Some(&rest[..end])
}

/// Find `needle` where it is not the tail of a longer identifier.
pub fn find_declaration(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !is_identifier_char(c))
    })
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Cut `text` right after the bracket matching its first character.
///
/// `text` must begin with `{`, `[` or `(`. Brackets inside string, template and
/// regular expression literals are ignored, and backslash escapes inside those
/// literals are honoured. Running out of input before the depth returns to zero
/// is an error.
pub fn cut_after_js(text: &str) -> Result<&str, SigError> {
    let (open, close) = match text.chars().next() {
        Some('{') => ('{', '}'),
        Some('[') => ('[', ']'),
        Some('(') => ('(', ')'),
        Some(other) => {
            return Err(SigError::UnbalancedInput(format!(
                "expected an opening bracket, found {:?}",
                other
            )))
        }
        None => return Err(SigError::UnbalancedInput("empty input".to_string())),
    };

    let mut depth = 0usize;
    let mut literal: Option<Literal> = None;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if let Some(current) = literal {
            if escaped {
                escaped = false;
                continue;
            }
            literal = match (current, ch) {
                (_, '\\') => {
                    escaped = true;
                    Some(current)
                }
                (Literal::Quote(quote), c) if c == quote => None,
                (Literal::Regex { in_class: false }, '[') => {
                    Some(Literal::Regex { in_class: true })
                }
                (Literal::Regex { in_class: true }, ']') => {
                    Some(Literal::Regex { in_class: false })
                }
                (Literal::Regex { in_class: false }, '/') => None,
                _ => Some(current),
            };
            continue;
        }

        match ch {
            '"' | '\'' | '`' => literal = Some(Literal::Quote(ch)),
            '/' if opens_regex(&text[..i]) => literal = Some(Literal::Regex { in_class: false }),
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Err(SigError::UnbalancedInput(format!(
        "no matching {:?} found in {} bytes",
        close,
        text.len()
    )))
}

// A `}` is taken to close a block. After an identifier or a number the slash
// divides, unless the word is a keyword that expects an operand.
fn opens_regex(before: &str) -> bool {
    let before = before.trim_end();
    let prev = match before.chars().next_back() {
        Some(c) => c,
        None => return true,
    };
    if !is_identifier_char(prev) {
        return REGEX_PREFIX.contains(&prev);
    }

    let word_start = before
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_identifier_char(c))
        .last()
        .map_or(0, |(i, _)| i);
    let is_property = before[..word_start].trim_end().ends_with('.');
    !is_property && REGEX_KEYWORDS.contains(&&before[word_start..])
}

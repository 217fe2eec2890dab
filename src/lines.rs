//! Assembly of logical lines from raw file text.
//!
//! Carriage returns are normalized first, then physical lines are joined
//! according to the [`LineContinuation`] style. Everything else (comments,
//! sections, names) is handled by the parser on the joined result.

use crate::dialect::LineContinuation;

/// One logical entry and the 1-based line number where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalLine {
    pub number: usize,
    pub text: String,
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Split `text` into logical lines.
///
/// `is_comment` and `headers` are only consulted by the semicolon style,
/// where an entry otherwise swallows everything up to the next `;`: a comment
/// or a `[section]` header is recognised when it starts a new entry.
pub(crate) fn logical_lines(
    text: &str,
    style: LineContinuation,
    is_comment: impl Fn(&str) -> bool,
    headers: bool,
) -> Vec<LogicalLine> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut physical: Vec<&str> = normalized.split('\n').collect();
    if normalized.ends_with('\n') {
        physical.pop();
    }

    match style {
        LineContinuation::SingleLine => join_lines(&physical, |_, _| false),
        LineContinuation::Rfc822 => join_lines(&physical, |current, next| {
            if next.starts_with(is_blank) {
                current.push_str(next.trim_start_matches(is_blank));
                true
            } else {
                false
            }
        }),
        LineContinuation::MsDos => join_lines(&physical, |current, next| {
            if current.ends_with('&') && next.starts_with(is_blank) {
                current.pop();
                current.push_str(next);
                true
            } else {
                false
            }
        }),
        LineContinuation::Unix => join_lines(&physical, |current, next| {
            if current.ends_with('\\') {
                current.pop();
                current.push_str(next);
                true
            } else {
                false
            }
        }),
        LineContinuation::Fortran => join_lines(&physical, |current, next| {
            match next.strip_prefix('&') {
                Some(rest) => {
                    current.push_str(rest);
                    true
                }
                None => false,
            }
        }),
        LineContinuation::Semicolon => semicolon_entries(&physical, is_comment, headers),
    }
}

/// Generic joiner: `join` appends `next` to `current` and returns `true`
/// when `next` continues the current logical line.
fn join_lines(physical: &[&str], join: impl Fn(&mut String, &str) -> bool) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::with_capacity(physical.len());
    for (idx, line) in physical.iter().enumerate() {
        if let Some(current) = lines.last_mut()
            && join(&mut current.text, line)
        {
            continue;
        }
        lines.push(LogicalLine {
            number: idx + 1,
            text: line.to_string(),
        });
    }
    lines
}

fn semicolon_entries(
    physical: &[&str],
    is_comment: impl Fn(&str) -> bool,
    headers: bool,
) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    let mut start = 0;

    for (idx, line) in physical.iter().enumerate() {
        let number = idx + 1;
        let mut rest: &str = line;

        if buffer.trim().is_empty() {
            buffer.clear();
            let trimmed = rest.trim();
            if trimmed.is_empty() || is_comment(trimmed) {
                continue;
            }
            if headers && trimmed.starts_with('[') {
                lines.push(LogicalLine {
                    number,
                    text: trimmed.to_string(),
                });
                continue;
            }
            start = number;
        } else {
            buffer.push('\n');
        }

        while let Some(pos) = rest.find(';') {
            buffer.push_str(&rest[..pos]);
            lines.push(LogicalLine {
                number: start,
                text: std::mem::take(&mut buffer),
            });
            rest = &rest[pos + 1..];
            start = number;
            if is_comment(rest.trim_start()) {
                rest = "";
            }
        }
        buffer.push_str(rest);
    }

    if !buffer.trim().is_empty() {
        lines.push(LogicalLine {
            number: start,
            text: buffer,
        });
    }
    lines
}

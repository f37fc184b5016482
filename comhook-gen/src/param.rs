//! Parameter parsing: one raw parameter text to a [`Parameter`].
//!
//! Two sources feed this module: one-parameter-per-line lists in expanded C++
//! declarations (`__in const UINT Value) = 0;`) and inline macro lists
//! (`(THIS_ UINT Adapter, IDirect3DDevice9** ppDevice) PURE;`). Both end up in
//! [`split_declarator`], which splits at the last type/name boundary.

use crate::error::ScanError;
use crate::model::Parameter;

/// Result of parsing one line inside an open parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterLine {
    /// A parameter; `last` is set when the line also closes the list.
    Parameter { param: Parameter, last: bool },
    /// A comment line, ignored.
    Comment,
}

/// Terminators that close a parameter list, pure-virtual and macro forms.
const LIST_TERMINATORS: [&str; 2] = [") = 0;", ") PURE;"];

/// Parse one line of a multi-line parameter list.
///
/// Recognized shapes: `TYPE name,`, `TYPE name) = 0;` and the same two with a
/// bracketed array size after the name. Anything else that is not a comment is
/// an [`ScanError::UnrecognizedParameter`].
pub fn parse_parameter_line(line: &str) -> Result<ParameterLine, ScanError> {
    let line = strip_leading_comments(line);
    if line.is_empty() || line.starts_with("/*") || line.starts_with("//") {
        return Ok(ParameterLine::Comment);
    }

    let (body, last) = if let Some(body) = line.strip_suffix(',') {
        (body, false)
    } else if let Some(body) = LIST_TERMINATORS
        .iter()
        .find_map(|t| line.strip_suffix(t))
    {
        (body, true)
    } else {
        return Err(ScanError::UnrecognizedParameter(line.to_string()));
    };

    let param = parse_declarator(body)
        .map_err(|_| ScanError::UnrecognizedParameter(line.to_string()))?;
    Ok(ParameterLine::Parameter { param, last })
}

/// Drop closed `/* ... */` blocks in front of a parameter (`/* [in] */ UINT n,`).
fn strip_leading_comments(line: &str) -> &str {
    let mut line = line.trim();
    while let Some(rest) = line.strip_prefix("/*") {
        match rest.find("*/") {
            Some(end) => line = rest[end + 2..].trim_start(),
            None => break,
        }
    }
    line
}

/// Parse the comma-separated list found inside `(THIS_ ...)`.
///
/// Every entry yields its own result so that one malformed parameter does not
/// take the rest of the list down with it.
pub fn parse_inline_parameters(list: &str) -> Vec<Result<Parameter, ScanError>> {
    split_top_level(list)
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.ends_with('*') || p.ends_with('&') {
                return Err(ScanError::MissingParameterName(p.to_string()));
            }
            parse_declarator(p)
        })
        .collect()
}

/// Parse `TYPE name` or `TYPE name[ N ]`.
pub fn parse_declarator(text: &str) -> Result<Parameter, ScanError> {
    let text = text.trim();
    let (declarator, arity) = split_array_suffix(text);
    let (raw_type, name) = split_declarator(declarator)
        .ok_or_else(|| ScanError::MissingParameterName(text.to_string()))?;
    let (annotation, ty) = split_annotation(raw_type);
    Ok(Parameter::new(ty, annotation, name, arity))
}

/// Split `name[ N ]` into `name` and `N`.
fn split_array_suffix(text: &str) -> (&str, Option<String>) {
    if let Some(inner) = text.strip_suffix(']')
        && let Some(open) = inner.rfind('[')
    {
        let arity = inner[open + 1..].trim();
        if !arity.is_empty() && arity.chars().all(is_word_char) {
            return (inner[..open].trim_end(), Some(arity.to_string()));
        }
    }
    (text, None)
}

/// Split at the last space, `*` or `&` that precedes the trailing identifier.
///
/// Returns `None` when there is no identifier or no type in front of it.
pub fn split_declarator(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_end();
    let (boundary, c) = text
        .char_indices()
        .rev()
        .find(|&(_, c)| c.is_whitespace() || c == '*' || c == '&')?;
    let name_start = boundary + c.len_utf8();
    let name = &text[name_start..];
    if name.is_empty() || !name.chars().all(is_word_char) {
        return None;
    }
    let ty = text[..name_start].trim();
    if ty.is_empty() {
        return None;
    }
    Some((ty, name))
}

/// Split a leading annotation marker (`__in`, `__out_ecount(n)`, `_In_`,
/// `_Out_writes_(n)`) from the base type.
pub fn split_annotation(raw: &str) -> (Option<String>, &str) {
    let raw = raw.trim();
    if !raw.starts_with('_') {
        return (None, raw);
    }
    let word_end = raw
        .find(|c: char| !is_word_char(c))
        .unwrap_or(raw.len());
    let mut marker_end = word_end;
    if raw[word_end..].starts_with('(') {
        match matching_paren(raw, word_end) {
            Some(close) => marker_end = close + 1,
            None => return (None, raw),
        }
    }
    let rest = raw[marker_end..].trim_start();
    if rest.is_empty() || rest.len() == raw[marker_end..].len() {
        // A marker must be followed by whitespace and a type.
        return (None, raw);
    }
    (Some(raw[..marker_end].to_string()), rest)
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested inside parentheses or brackets.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

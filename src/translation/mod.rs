//! Placeholder handling for T-SQL text.
//!
//! `tiberius` binds parameters positionally as `@P1`, `@P2`, ... This module
//! renumbers those placeholders when one statement is repeated inside a batch,
//! and can translate `?` or `%s` markers into `@Pn` for callers porting SQL
//! written for other drivers.

use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{is_block_comment_end, is_block_comment_start, is_line_comment_start, parse_positional};
use scanner::State;

/// Positional marker style to translate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// ODBC-style `?` markers.
    Qmark,
    /// DB-API `format` style `%s` markers (`%%` is a literal percent sign).
    Pyformat,
}

/// How to resolve translation for a call relative to the client default.
///
/// # Examples
/// ```rust
/// use mssql_middleware::prelude::*;
///
/// assert!(TranslationMode::ForceOn.resolve(false));
/// assert!(!TranslationMode::ClientDefault.resolve(false));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMode {
    /// Follow the client's default setting.
    #[default]
    ClientDefault,
    /// Force translation on, regardless of the client default.
    ForceOn,
    /// Force translation off, regardless of the client default.
    ForceOff,
}

impl TranslationMode {
    #[must_use]
    pub fn resolve(self, client_default: bool) -> bool {
        match self {
            TranslationMode::ClientDefault => client_default,
            TranslationMode::ForceOn => true,
            TranslationMode::ForceOff => false,
        }
    }
}

/// Translate `?` or `%s` markers into `@P1`, `@P2`, ... in order of appearance.
///
/// String literals, quoted identifiers (`"..."`, `[...]`) and comments are left
/// alone. Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn translate_placeholders(sql: &str, source: PlaceholderStyle, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }

    let mut next = 0usize;
    rewrite(sql, |bytes, idx| match (source, bytes[idx]) {
        (PlaceholderStyle::Qmark, b'?') => {
            next += 1;
            Some((idx + 1, format!("@P{next}")))
        }
        (PlaceholderStyle::Pyformat, b'%') => match bytes.get(idx + 1) {
            Some(b's') => {
                next += 1;
                Some((idx + 2, format!("@P{next}")))
            }
            Some(b'%') => Some((idx + 2, "%".to_string())),
            _ => None,
        },
        _ => None,
    })
}

/// Shift every `@Pn` placeholder to `@P(n + offset)`.
#[must_use]
pub fn offset_placeholders(sql: &str, offset: usize) -> Cow<'_, str> {
    if offset == 0 {
        return Cow::Borrowed(sql);
    }

    rewrite(sql, |bytes, idx| {
        parse_positional(bytes, idx).map(|(end, n)| (end, format!("@P{}", n + offset)))
    })
}

/// Repeat `sql` once per parameter tuple, shifting each copy's placeholders past
/// the previous copies' parameters, so `copies * width` values bind in order.
#[must_use]
pub fn expand_batch(sql: &str, copies: usize, width: usize) -> String {
    let statement = sql.trim_end().trim_end_matches(';');
    if copies <= 1 {
        return statement.to_string();
    }

    let mut out = String::with_capacity((statement.len() + 8) * copies);
    for copy in 0..copies {
        if copy > 0 {
            out.push_str(";\n");
        }
        out.push_str(&offset_placeholders(statement, copy * width));
    }
    out
}

/// Walk `sql`, offering every byte outside literals and comments to `replace`.
/// `replace` returns the end of the consumed span and its substitute.
fn rewrite<'a>(
    sql: &'a str,
    mut replace: impl FnMut(&[u8], usize) -> Option<(usize, String)>,
) -> Cow<'a, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                _ => {
                    if let Some((end, substitute)) = replace(bytes, idx) {
                        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 16));
                        buf.push_str(&sql[copied..idx]);
                        buf.push_str(&substitute);
                        copied = end;
                        idx = end;
                        continue;
                    }
                }
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }

        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_qmark_markers() {
        let sql = "select * from t where a = ? and b = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Qmark, true);
        assert_eq!(res, "select * from t where a = @P1 and b = @P2");
    }

    #[test]
    fn translates_pyformat_markers() {
        let sql = "SELECT %s a, %s b WHERE x LIKE 'a%' AND y = 5 %% 2";
        let res = translate_placeholders(sql, PlaceholderStyle::Pyformat, true);
        assert_eq!(res, "SELECT @P1 a, @P2 b WHERE x LIKE 'a%' AND y = 5 % 2");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', [a?], \"b?\", ? -- ?\n/* ? /* ? */ ? */ from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Qmark, true);
        assert_eq!(
            res,
            "select '?', [a?], \"b?\", @P1 -- ?\n/* ? /* ? */ ? */ from t where a = @P2"
        );
    }

    #[test]
    fn respects_disabled_flag() {
        let sql = "select * from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Qmark, false);
        assert!(matches!(res, Cow::Borrowed(_)));
    }

    #[test]
    fn offsets_positional_placeholders() {
        let sql = "INSERT INTO t VALUES (@P1, @p2, '@P3', @Param1, @@P4)";
        let res = offset_placeholders(sql, 10);
        assert_eq!(
            res,
            "INSERT INTO t VALUES (@P11, @P12, '@P3', @Param1, @@P4)"
        );
    }

    #[test]
    fn zero_offset_borrows() {
        assert!(matches!(offset_placeholders("SELECT @P1", 0), Cow::Borrowed(_)));
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let sql = "SELECT N'héllo' h, @P1 v";
        assert_eq!(offset_placeholders(sql, 2), "SELECT N'héllo' h, @P3 v");
    }

    #[test]
    fn expands_batches() {
        let res = expand_batch("SELECT @P1 a, @P2 b;", 3, 2);
        assert_eq!(
            res,
            "SELECT @P1 a, @P2 b;\nSELECT @P3 a, @P4 b;\nSELECT @P5 a, @P6 b"
        );
        assert_eq!(expand_batch("SELECT @P1 a;  ", 1, 1), "SELECT @P1 a");
    }

    #[test]
    fn translation_mode_resolution() {
        assert!(TranslationMode::ForceOn.resolve(false));
        assert!(!TranslationMode::ForceOff.resolve(true));
        assert!(TranslationMode::ClientDefault.resolve(true));
        assert!(!TranslationMode::ClientDefault.resolve(false));
    }
}

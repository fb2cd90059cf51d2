pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Bytes that may continue a T-SQL identifier or variable name.
pub(super) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'#' | b'$') || b >= 0x80
}

/// `@P<digits>` starting at `idx`, not glued to a longer name on either side.
/// Returns the end of the digits and the parsed number.
pub(super) fn parse_positional(bytes: &[u8], idx: usize) -> Option<(usize, usize)> {
    if bytes.get(idx) != Some(&b'@') || !matches!(bytes.get(idx + 1), Some(b'P' | b'p')) {
        return None;
    }
    if idx > 0 && is_ident_byte(bytes[idx - 1]) {
        return None;
    }
    let (end, digits) = super::scanner::scan_digits(bytes, idx + 2)?;
    if bytes.get(end).is_some_and(|b| is_ident_byte(*b)) {
        return None;
    }
    digits.parse().ok().map(|n| (end, n))
}

//! Pre-parse cleanup of source responses.
//!
//! The accounting source emits characters XML 1.0 forbids (NUL, other C0
//! controls, and numeric references to them) and leaves `&` unescaped in
//! free-text fields such as company and ledger names.

const PREDEFINED_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

/// Longest entity reference considered when deciding whether `&` is bare.
const MAX_REFERENCE_LEN: usize = 12;

/// Strip forbidden characters and escape bare ampersands.
#[must_use]
pub fn clean_response(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find(|c: char| c == '&' || is_forbidden(c)) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with('&') {
            let consumed = match reference_at(tail) {
                Some((len, Reference::Valid)) => {
                    out.push_str(&tail[..len]);
                    len
                }
                Some((len, Reference::Forbidden)) => len,
                None => {
                    out.push_str("&amp;");
                    1
                }
            };
            rest = &tail[consumed..];
        } else {
            // skip the forbidden char
            let width = tail.chars().next().map_or(1, char::len_utf8);
            rest = &tail[width..];
        }
    }
    out.push_str(rest);
    out
}

enum Reference {
    Valid,
    /// A numeric reference to a character XML forbids.
    Forbidden,
}

/// Inspect an `&...;` reference at the start of `tail`, returning its byte
/// length. `None` means the ampersand is bare.
fn reference_at(tail: &str) -> Option<(usize, Reference)> {
    let window = tail.get(1..).unwrap_or_default();
    let semi = window.find(';').filter(|&i| i > 0 && i <= MAX_REFERENCE_LEN)?;
    let body = &window[..semi];
    let len = semi + 2;

    if PREDEFINED_ENTITIES.contains(&body) {
        return Some((len, Reference::Valid));
    }

    let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };

    match char::from_u32(code) {
        Some(c) if !is_forbidden(c) => Some((len, Reference::Valid)),
        _ => Some((len, Reference::Forbidden)),
    }
}

const fn is_forbidden(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{7F}')
}

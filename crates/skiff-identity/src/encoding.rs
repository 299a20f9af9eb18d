/// Strip everything outside the base64 alphabet.
///
/// Keys and proofs arrive pasted from shells and config files, so they may
/// carry newlines, spaces, or stray punctuation. Padding characters are kept.
pub fn normalize_base64(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect()
}

/// Right-pad with `=` until the length is a multiple of 4.
pub fn pad_base64(s: &str) -> String {
    let mut out = s.to_string();
    while out.len() % 4 != 0 {
        out.push('=');
    }
    out
}

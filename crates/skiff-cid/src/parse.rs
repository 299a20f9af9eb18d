/// Isolate a bare CID from any wrapping URL or sub-path.
///
/// Handles `ipfs://` URIs, path-gateway URLs (`https://<host>/ipfs/<cid>/...`),
/// and subdomain-gateway URLs (`https://<cid>.ipfs.<gateway>/...`). Query
/// strings, fragments, and trailing path segments are dropped.
pub fn extract_cid(input: &str) -> String {
    let mut s = input.trim();
    for prefix in ["ipfs://", "https://", "http://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
            break;
        }
    }
    let s = s.split(['?', '#']).next().unwrap_or("");

    // Path-gateway form: [host]/ipfs/<cid>[/...]
    let s = match s.find("/ipfs/") {
        Some(idx) => &s[idx + "/ipfs/".len()..],
        None => s,
    };

    let mut first = s.split('/').find(|seg| !seg.is_empty()).unwrap_or("");

    // Subdomain-gateway form: <cid>.ipfs.<gateway>
    if let Some(idx) = first.find(".ipfs.") {
        first = &first[..idx];
    }
    first.to_string()
}

/// Structural validation of a CID by its multibase prefix.
///
/// The legacy base58 `Qm` form gets an exact-length check; CIDv1 multibase
/// variants get minimum-length and alphabet checks keyed on the leading
/// character. Unrecognized prefixes fall back to a loose length-and-charset
/// heuristic, which is known to accept some structurally invalid strings.
pub fn is_valid_cid(id: &str) -> bool {
    let Some(first) = id.chars().next() else {
        return false;
    };

    // CIDv0: "Qm" + 44 base58btc characters, exactly 46 total.
    if let Some(rest) = id.strip_prefix("Qm") {
        return id.len() == 46 && rest.chars().all(is_base58);
    }

    let rest = &id[first.len_utf8()..];
    match first {
        'b' => id.len() >= 59 && rest.chars().all(|c| matches!(c, 'a'..='z' | '2'..='7')),
        'B' => id.len() >= 59 && rest.chars().all(|c| matches!(c, 'A'..='Z' | '2'..='7')),
        'z' => id.len() >= 48 && rest.chars().all(is_base58),
        'f' => id.len() >= 50 && rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
        'F' => id.len() >= 50 && rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()),
        'k' => id.len() >= 50 && rest.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9')),
        'K' => id.len() >= 50 && rest.chars().all(|c| matches!(c, 'A'..='Z' | '0'..='9')),
        '9' => id.len() >= 50 && rest.chars().all(|c| c.is_ascii_digit()),
        'm' | 'M' | 'u' | 'U' => {
            id.len() >= 50
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_' | '='))
        }
        // Unknown prefix: loose heuristic, kept deliberately permissive.
        _ => {
            id.len() >= 30
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
    }
}

fn is_base58(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

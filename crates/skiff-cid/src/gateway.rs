use skiff_types::SkiffError;

use crate::parse::{extract_cid, is_valid_cid};

/// Gateway used when the caller does not name one.
pub const DEFAULT_GATEWAY: &str = "w3s.link";

/// Known public gateways, for redundant share links.
pub const PUBLIC_GATEWAYS: [&str; 4] = ["w3s.link", "dweb.link", "cf-ipfs.com", "ipfs.io"];

/// Compose a subdomain-gateway URL for a CID.
///
/// The input is cleaned through [`extract_cid`] first and rejected outright
/// when structurally invalid; a malformed URL is never returned.
pub fn to_gateway_url(
    id: &str,
    file_name: Option<&str>,
    gateway: Option<&str>,
) -> Result<String, SkiffError> {
    let cid = extract_cid(id);
    if !is_valid_cid(&cid) {
        return Err(SkiffError::InvalidCid(cid));
    }
    let gateway = gateway.unwrap_or(DEFAULT_GATEWAY);
    Ok(match file_name {
        Some(name) => format!("https://{cid}.ipfs.{gateway}/{}", encode_segment(name)),
        None => format!("https://{cid}.ipfs.{gateway}"),
    })
}

/// The same composition across every known public gateway.
pub fn gateway_urls(id: &str, file_name: Option<&str>) -> Result<Vec<String>, SkiffError> {
    PUBLIC_GATEWAYS
        .iter()
        .map(|gw| to_gateway_url(id, file_name, Some(gw)))
        .collect()
}

/// Append the image-resize hint used for gallery thumbnails.
pub fn thumbnail_url(gateway_url: &str) -> String {
    if gateway_url.contains('?') {
        format!("{gateway_url}&img-width=300")
    } else {
        format!("{gateway_url}?img-width=300")
    }
}

/// Percent-encode a single path segment.
fn encode_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn url_with_default_gateway() {
        let url = to_gateway_url(CID, None, None).unwrap();
        assert_eq!(url, format!("https://{CID}.ipfs.w3s.link"));
    }

    #[test]
    fn url_with_file_name_is_encoded() {
        let url = to_gateway_url(CID, Some("my photo.png"), None).unwrap();
        assert_eq!(url, format!("https://{CID}.ipfs.w3s.link/my%20photo.png"));
    }

    #[test]
    fn url_with_explicit_gateway() {
        let url = to_gateway_url(CID, None, Some("dweb.link")).unwrap();
        assert_eq!(url, format!("https://{CID}.ipfs.dweb.link"));
    }

    #[test]
    fn invalid_cid_is_an_error_not_a_url() {
        assert!(matches!(
            to_gateway_url("not-a-cid", None, None),
            Err(SkiffError::InvalidCid(_))
        ));
    }

    #[test]
    fn wrapped_url_input_is_cleaned_first() {
        let wrapped = format!("ipfs://{CID}/sub/path");
        let url = to_gateway_url(&wrapped, None, None).unwrap();
        assert_eq!(url, format!("https://{CID}.ipfs.w3s.link"));
    }

    #[test]
    fn one_url_per_public_gateway() {
        let urls = gateway_urls(CID, None).unwrap();
        assert_eq!(urls.len(), PUBLIC_GATEWAYS.len());
        for (url, gw) in urls.iter().zip(PUBLIC_GATEWAYS) {
            assert_eq!(url, &format!("https://{CID}.ipfs.{gw}"));
        }
    }

    #[test]
    fn thumbnail_hint_appended() {
        assert_eq!(
            thumbnail_url("https://x.ipfs.w3s.link"),
            "https://x.ipfs.w3s.link?img-width=300"
        );
        assert_eq!(
            thumbnail_url("https://x.ipfs.w3s.link/a.png?v=1"),
            "https://x.ipfs.w3s.link/a.png?v=1&img-width=300"
        );
    }
}

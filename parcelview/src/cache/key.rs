//! Cache key derivation.
//!
//! A key is the cache-format version tag followed by the request URL with
//! volatile parameters removed and the remaining query sorted by name:
//!
//! ```text
//! v2|https://host/geoserver/ows?outputFormat=application%2Fjson&request=GetFeature&...
//! ```

use reqwest::Url;
use tracing::trace;

use crate::cache::types::{CacheKey, KeyConfig};

/// Build the canonical cache key for a request URL.
///
/// Never fails: a URL that cannot be parsed (e.g. a relative path) is keyed
/// by its raw text, which is still deterministic for identical input.
///
/// # Example
///
/// ```
/// use parcelview::cache::{build_key, KeyConfig};
///
/// let config = KeyConfig::default();
/// let a = build_key("https://example.com/ows?b=2&a=1&_t=1700000000000", &config);
/// let b = build_key("https://example.com/ows?a=1&b=2", &config);
/// assert_eq!(a, b);
/// assert!(a.as_str().starts_with("v2|"));
/// ```
pub fn build_key(url: &str, config: &KeyConfig) -> CacheKey {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            trace!(url = url, error = %e, "Unparseable URL, keying by raw text");
            return CacheKey::from_raw(format!("{}|{}", config.version, url));
        }
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| !config.volatile_params.iter().any(|v| v == name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    // Stable sort keeps repeated parameters in their original relative order.
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    parsed.set_fragment(None);

    CacheKey::from_raw(format!("{}|{}", config.version, parsed))
}

/// 32-bit FNV-1a hash of a key, as eight lowercase hex characters.
///
/// Hashes UTF-16 code units so keys written by other clients of the same
/// store hash identically. Used where storage keys must stay short; distinct
/// keys may collide and nothing attempts to resolve that.
pub fn short_hash(key: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for unit in key.encode_utf16() {
        hash ^= u32::from(unit);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("{:08x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://geo.example.org/geoserver/catastro/ows";

    fn config() -> KeyConfig {
        KeyConfig::default()
    }

    #[test]
    fn test_key_ignores_cache_busting_param() {
        let plain = build_key(&format!("{BASE}?service=WFS&typeName=lote"), &config());
        let busted = build_key(
            &format!("{BASE}?service=WFS&_t=1712345678901&typeName=lote"),
            &config(),
        );
        assert_eq!(plain, busted);
    }

    #[test]
    fn test_key_ignores_param_order() {
        let a = build_key(&format!("{BASE}?service=WFS&typeName=lote&maxFeatures=10"), &config());
        let b = build_key(&format!("{BASE}?maxFeatures=10&service=WFS&typeName=lote"), &config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_changes_with_version() {
        let url = format!("{BASE}?service=WFS");
        let v2 = build_key(&url, &config());
        let v3 = build_key(
            &url,
            &KeyConfig {
                version: "v3".to_string(),
                ..config()
            },
        );
        assert_ne!(v2, v3);
        assert!(v3.as_str().starts_with("v3|"));
    }

    #[test]
    fn test_key_differs_for_different_params() {
        let a = build_key(&format!("{BASE}?typeName=lote"), &config());
        let b = build_key(&format!("{BASE}?typeName=manzana"), &config());
        assert_ne!(a, b);
    }

    #[test]
    fn test_only_volatile_param_drops_query() {
        let key = build_key(&format!("{BASE}?_t=5"), &config());
        assert_eq!(key.as_str(), format!("v2|{BASE}"));
    }

    #[test]
    fn test_repeated_params_keep_relative_order() {
        let a = build_key(&format!("{BASE}?x=1&a=0&x=2"), &config());
        let b = build_key(&format!("{BASE}?a=0&x=1&x=2"), &config());
        assert_eq!(a, b);

        let swapped = build_key(&format!("{BASE}?a=0&x=2&x=1"), &config());
        assert_ne!(a, swapped);
    }

    #[test]
    fn test_unparseable_url_falls_back_to_raw() {
        let key = build_key("/relative/ows?_t=1", &config());
        assert_eq!(key.as_str(), "v2|/relative/ows?_t=1");
        // Deterministic for identical input
        assert_eq!(key, build_key("/relative/ows?_t=1", &config()));
    }

    #[test]
    fn test_fragment_is_not_part_of_key() {
        let a = build_key(&format!("{BASE}?a=1#top"), &config());
        let b = build_key(&format!("{BASE}?a=1"), &config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_short_hash_known_vectors() {
        assert_eq!(short_hash(""), "811c9dc5");
        assert_eq!(short_hash("a"), "e40c292c");
        assert_eq!(short_hash("foobar"), "bf9cf968");
    }

    #[test]
    fn test_short_hash_is_eight_hex_chars() {
        let hash = short_hash("v2|https://geo.example.org/ows?typeName=tg_lote");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

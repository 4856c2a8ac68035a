//! Reversible encoding that makes public post ids look opaque.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::TypeError;

pub fn encode_id(id: &str) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

pub fn decode_id(encoded: &str) -> Result<String, TypeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| TypeError::InvalidOpaqueId(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| TypeError::InvalidOpaqueId(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_ids_are_url_safe() {
        let encoded = encode_id("20200701051121Z-hello");
        assert!(!encoded.contains(['/', '+', '=']));
        assert_eq!(decode_id(&encoded).unwrap(), "20200701051121Z-hello");
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(decode_id("not base64!"), Err(TypeError::InvalidOpaqueId(_))));
    }
}

//! Text encoding normalization
//!
//! The upstream serves subtitles in whatever 8-bit code page the uploader
//! used, mostly Central European and Cyrillic Windows pages. Output is
//! always UTF-8 without a byte order mark.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

use crate::{GatewayError, Result};

/// Encoding assumed when detection is inconclusive.
pub const DEFAULT_FALLBACK_ENCODING: &str = "windows-1250";

/// Resolve an encoding label such as `windows-1250` or `cp1251`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| GatewayError::Configuration(format!("unknown text encoding '{label}'")))
}

/// Decode `bytes` to UTF-8.
///
/// A byte order mark decides the encoding outright; valid UTF-8 is passed
/// through. Anything else goes through charset detection, and `fallback`
/// is used when the detector is not confident.
pub fn normalize_encoding(bytes: &[u8], fallback: &'static Encoding) -> Result<String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_strict(&bytes[bom_len..], encoding);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (guess, confident) = detector.guess_assess(None, false);
    let encoding = if confident { guess } else { fallback };
    debug!(
        detected = guess.name(),
        confident,
        using = encoding.name(),
        "decoding legacy subtitle text"
    );
    decode_strict(bytes, encoding)
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    if encoding == UTF_8 {
        return std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| GatewayError::Encoding(format!("invalid UTF-8 after byte order mark: {e}")));
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            GatewayError::Encoding(format!("subtitle text is not valid {}", encoding.name()))
        })
}

#[cfg(test)]
mod tests {
    use encoding_rs::WINDOWS_1250;

    use super::*;

    #[test]
    fn utf8_passes_through() {
        let text = normalize_encoding("Đorđe čita".as_bytes(), WINDOWS_1250).unwrap();
        assert_eq!(text, "Đorđe čita");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let text = normalize_encoding(b"\xEF\xBB\xBFhello", WINDOWS_1250).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn utf16_bom_selects_utf16() {
        let text = normalize_encoding(&[0xFF, 0xFE, b'o', 0, b'k', 0], WINDOWS_1250).unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn labels_resolve() {
        assert_eq!(encoding_for_label("windows-1250").unwrap(), WINDOWS_1250);
        assert_eq!(encoding_for_label(" CP1250 ").unwrap(), WINDOWS_1250);
        assert!(encoding_for_label("klingon").is_err());
    }
}

// Conversions between text/bytes and integer label sequences

/// UTF-8 bytes of `s`, one label per byte.
pub fn utf8_labels(s: &str) -> Vec<i32> {
    bytes_to_labels(s.as_bytes())
}

/// UTF-16 code units of `s`, one label per unit.
pub fn utf16_labels(s: &str) -> Vec<i32> {
    s.encode_utf16().map(i32::from).collect()
}

/// Unicode scalar values of `s`, one label per code point.
pub fn utf32_labels(s: &str) -> Vec<i32> {
    s.chars().map(|c| c as i32).collect()
}

pub fn bytes_to_labels(bytes: &[u8]) -> Vec<i32> {
    bytes.iter().map(|&b| i32::from(b)).collect()
}

/// Narrows labels back to bytes.
///
/// Labels must be in `0..=255`; anything wider is truncated.
pub fn labels_to_bytes(labels: &[i32]) -> Vec<u8> {
    labels
        .iter()
        .map(|&l| {
            debug_assert!((0..=0xFF).contains(&l), "label {l} is not a byte");
            l as u8
        })
        .collect()
}

/// Decodes code point labels, or `None` if any label is not a valid `char`.
pub fn utf32_to_string(labels: &[i32]) -> Option<String> {
    labels
        .iter()
        .map(|&l| u32::try_from(l).ok().and_then(char::from_u32))
        .collect()
}

/// Decodes UTF-16 code unit labels, replacing invalid sequences.
pub fn utf16_to_string_lossy(labels: &[i32]) -> String {
    let units: Vec<u16> = labels.iter().map(|&l| l as u16).collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_splits_multibyte_chars() {
        assert_eq!(utf8_labels("aä"), vec![0x61, 0xC3, 0xA4]);
        assert_eq!(labels_to_bytes(&utf8_labels("aä")), "aä".as_bytes());
    }

    #[test]
    fn utf16_uses_surrogate_pairs() {
        assert_eq!(utf16_labels("a😀"), vec![0x61, 0xD83D, 0xDE00]);
        assert_eq!(utf16_to_string_lossy(&utf16_labels("a😀")), "a😀");
    }

    #[test]
    fn utf32_round_trip() {
        let labels = utf32_labels("kö😀");
        assert_eq!(labels, vec![0x6B, 0xF6, 0x1F600]);
        assert_eq!(utf32_to_string(&labels).as_deref(), Some("kö😀"));
    }

    #[test]
    fn utf32_rejects_surrogates_and_negatives() {
        assert_eq!(utf32_to_string(&[0xD800]), None);
        assert_eq!(utf32_to_string(&[-1]), None);
    }
}

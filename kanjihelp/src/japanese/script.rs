use std::ops::RangeInclusive;

/// CJK Unified Ideographs, Extension A, and Compatibility Ideographs.
/// Kana, punctuation and radicals are deliberately outside these ranges.
const KANJI_RANGES: [RangeInclusive<u32>; 3] = [
    0x4E00..=0x9FFF,
    0x3400..=0x4DBF,
    0xF900..=0xFAFF,
];

const KATAKANA_TO_HIRAGANA: RangeInclusive<u32> = 0x30A1..=0x30F6;
const KANA_OFFSET: u32 = 0x60;

pub fn is_kanji(ch: char) -> bool {
    let code = ch as u32;
    KANJI_RANGES.iter().any(|range| range.contains(&code))
}

/// Iterates code points, so characters outside the BMP are classified as a
/// whole rather than by their UTF-16 halves.
pub fn has_kanji(text: &str) -> bool {
    text.chars().any(is_kanji)
}

pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|ch| {
            let code = ch as u32;
            if KATAKANA_TO_HIRAGANA.contains(&code) {
                char::from_u32(code - KANA_OFFSET).unwrap_or(ch)
            } else {
                ch
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kanji_range_boundaries() {
        for code in [0x4E00, 0x9FFF, 0x3400, 0x4DBF, 0xF900, 0xFAFF] {
            let ch = char::from_u32(code).unwrap();
            assert!(is_kanji(ch), "U+{code:04X} should be kanji");
        }
        for code in [0x4DFF, 0x4DC0, 0x33FF, 0xF8FF, 0xFB00] {
            let ch = char::from_u32(code).unwrap();
            assert!(!is_kanji(ch), "U+{code:04X} should not be kanji");
        }
    }

    #[test]
    fn test_every_code_point_in_ranges_is_kanji() {
        for range in KANJI_RANGES.iter() {
            for code in range.clone() {
                let ch = char::from_u32(code).unwrap();
                assert!(is_kanji(ch), "U+{code:04X} should be kanji");
            }
        }
    }

    #[test]
    fn test_non_kanji_scripts() {
        for ch in ['あ', 'ん', 'ア', 'ヶ', 'ー', '。', '、', '「', 'A', 'z', '1', ' ', '⺀', '々'] {
            assert!(!is_kanji(ch), "{ch:?} should not be kanji");
        }
    }

    #[test]
    fn test_has_kanji() {
        assert!(has_kanji("学生"));
        assert!(has_kanji("お茶"));
        assert!(!has_kanji("です"));
        assert!(!has_kanji(""));
        assert!(!has_kanji("Hello, world!"));
    }

    #[test]
    fn test_has_kanji_supplementary_plane() {
        // U+20B9F is a CJK Extension B ideograph encoded as a surrogate pair
        // in UTF-16; it is outside the three accepted ranges.
        let ext_b = "\u{20B9F}";
        assert_eq!(ext_b.encode_utf16().count(), 2);
        assert!(!has_kanji(ext_b));
        assert!(!has_kanji("😀あ"));
        assert!(has_kanji("\u{20B9F}叱"));
    }

    #[test]
    fn test_katakana_to_hiragana_examples() {
        assert_eq!(katakana_to_hiragana(""), "");
        assert_eq!(katakana_to_hiragana("カタカナ"), "かたかな");
        assert_eq!(katakana_to_hiragana("ABCあ"), "ABCあ");
        assert_eq!(katakana_to_hiragana("ガクセイ"), "がくせい");
    }

    #[test]
    fn test_katakana_to_hiragana_block_edges() {
        assert_eq!(katakana_to_hiragana("ァ"), "ぁ");
        assert_eq!(katakana_to_hiragana("ヶ"), "\u{3096}");
        // Outside [U+30A1, U+30F6]: prolonged sound mark, ヷ, middle dot
        assert_eq!(katakana_to_hiragana("ーヷ・"), "ーヷ・");
    }

    #[test]
    fn test_katakana_to_hiragana_is_char_local() {
        let input = "トウキョウ東京ABC";
        let output = katakana_to_hiragana(input);
        assert_eq!(input.chars().count(), output.chars().count());
        assert_eq!(output, "とうきょう東京ABC");
    }
}

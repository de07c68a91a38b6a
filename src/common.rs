use std::str::FromStr;

use crate::text_parser::TextParser;
use crate::Tag;

pub(crate) trait TagExt {
    fn default_script() -> Self;
    fn default_language() -> Self;
    fn to_lowercase(&self) -> Self;
    fn to_uppercase(&self) -> Self;
}

impl TagExt for Tag {
    #[inline]
    fn default_script() -> Self {
        Tag::from_bytes(b"DFLT")
    }

    #[inline]
    fn default_language() -> Self {
        Tag::from_bytes(b"dflt")
    }

    fn to_lowercase(&self) -> Self {
        let b = self.to_bytes();
        Tag::from_bytes(&[
            b[0].to_ascii_lowercase(),
            b[1].to_ascii_lowercase(),
            b[2].to_ascii_lowercase(),
            b[3].to_ascii_lowercase(),
        ])
    }

    fn to_uppercase(&self) -> Self {
        let b = self.to_bytes();
        Tag::from_bytes(&[
            b[0].to_ascii_uppercase(),
            b[1].to_ascii_uppercase(),
            b[2].to_ascii_uppercase(),
            b[3].to_ascii_uppercase(),
        ])
    }
}

/// Defines the direction in which text is to be read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Initial, unset direction.
    #[default]
    Invalid,
    /// Text is set horizontally from left to right.
    LeftToRight,
    /// Text is set horizontally from right to left.
    RightToLeft,
    /// Text is set vertically from top to bottom.
    TopToBottom,
    /// Text is set vertically from bottom to top.
    BottomToTop,
}

impl Direction {
    #[inline]
    pub(crate) fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    #[inline]
    pub(crate) fn is_vertical(self) -> bool {
        matches!(self, Direction::TopToBottom | Direction::BottomToTop)
    }

    #[inline]
    pub(crate) fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    #[inline]
    pub(crate) fn is_backward(self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }

    #[inline]
    pub(crate) fn reverse(self) -> Self {
        match self {
            Direction::LeftToRight => Direction::RightToLeft,
            Direction::RightToLeft => Direction::LeftToRight,
            Direction::TopToBottom => Direction::BottomToTop,
            Direction::BottomToTop => Direction::TopToBottom,
            Direction::Invalid => Direction::Invalid,
        }
    }

    /// Returns the horizontal direction a script is written in.
    ///
    /// Scripts with no inherent direction return `None`.
    pub fn from_script(script: Script) -> Option<Self> {
        // Keep in sync with the right-to-left scripts listed by Unicode
        // (`Bidi_Class=R` or `AL` for the script's letters).
        match script {
            script::ARABIC
            | script::HEBREW
            | script::SYRIAC
            | script::THAANA
            | script::NKO
            | script::SAMARITAN
            | script::MANDAIC
            | script::IMPERIAL_ARAMAIC
            | script::PHOENICIAN
            | script::AVESTAN
            | script::INSCRIPTIONAL_PAHLAVI
            | script::INSCRIPTIONAL_PARTHIAN
            | script::OLD_SOUTH_ARABIAN
            | script::KHAROSHTHI
            | script::MANICHAEAN
            | script::PSALTER_PAHLAVI
            | script::ADLAM
            | script::HANIFI_ROHINGYA
            | script::SOGDIAN
            | script::OLD_SOGDIAN
            | script::YEZIDI => Some(Direction::RightToLeft),

            // Scripts that may be written in either direction.
            script::OLD_ITALIC | script::RUNIC => None,

            _ => Some(Direction::LeftToRight),
        }
    }
}

impl FromStr for Direction {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("invalid direction");
        }

        // Only the first letter matters.
        match s.as_bytes()[0].to_ascii_lowercase() {
            b'l' => Ok(Direction::LeftToRight),
            b'r' => Ok(Direction::RightToLeft),
            b't' => Ok(Direction::TopToBottom),
            b'b' => Ok(Direction::BottomToTop),
            _ => Err("invalid direction"),
        }
    }
}

/// A text language, stored as a lowercase BCP 47 tag.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Language(String);

impl Language {
    /// Returns the language tag as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the primary subtag, e.g. `my` for `my-MM`.
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or("")
    }
}

impl FromStr for Language {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("invalid language");
        }

        let normalized: String = s
            .chars()
            .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
            .collect();
        Ok(Language(normalized))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A text script.
///
/// Any ISO 15924 tag is accepted, the constants in [`script`] cover the
/// scripts this crate treats specially.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Script(pub(crate) Tag);

impl Script {
    #[inline]
    pub(crate) const fn from_bytes(bytes: &[u8; 4]) -> Self {
        Script(Tag::from_bytes(bytes))
    }

    /// Converts an ISO 15924 script tag to a corresponding `Script`.
    pub fn from_iso15924_tag(tag: Tag) -> Option<Script> {
        if tag.is_null() {
            return None;
        }

        // Be lenient, adjust case (one capital letter followed by three small letters).
        let tag = Tag((tag.as_u32() & 0xDFDFDFDF) | 0x00202020);

        match &tag.to_bytes() {
            b"Qaai" => return Some(script::INHERITED),
            b"Qaac" => return Some(script::COPTIC),
            b"Cyrs" => return Some(script::CYRILLIC),
            b"Latf" | b"Latg" => return Some(script::LATIN),
            b"Syre" | b"Syrj" | b"Syrn" => return Some(script::SYRIAC),
            _ => {}
        }

        if tag.as_u32() & 0xE0E0E0E0 == 0x40606060 {
            Some(Script(tag))
        } else {
            Some(script::UNKNOWN)
        }
    }

    /// Returns script's tag.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.0
    }
}

impl FromStr for Script {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = Tag::from_bytes_lossy(s.as_bytes());
        Script::from_iso15924_tag(tag).ok_or("invalid script")
    }
}

/// Predefined scripts.
pub mod script {
    #![allow(missing_docs)]

    use crate::Script;

    pub const COMMON: Script                 = Script::from_bytes(b"Zyyy");
    pub const INHERITED: Script              = Script::from_bytes(b"Zinh");
    pub const UNKNOWN: Script                = Script::from_bytes(b"Zzzz");

    pub const ADLAM: Script                  = Script::from_bytes(b"Adlm");
    pub const ARABIC: Script                 = Script::from_bytes(b"Arab");
    pub const ARMENIAN: Script               = Script::from_bytes(b"Armn");
    pub const AVESTAN: Script                = Script::from_bytes(b"Avst");
    pub const BENGALI: Script                = Script::from_bytes(b"Beng");
    pub const COPTIC: Script                 = Script::from_bytes(b"Copt");
    pub const CYRILLIC: Script               = Script::from_bytes(b"Cyrl");
    pub const DEVANAGARI: Script             = Script::from_bytes(b"Deva");
    pub const GEORGIAN: Script               = Script::from_bytes(b"Geor");
    pub const GREEK: Script                  = Script::from_bytes(b"Grek");
    pub const GUJARATI: Script               = Script::from_bytes(b"Gujr");
    pub const GURMUKHI: Script               = Script::from_bytes(b"Guru");
    pub const HAN: Script                    = Script::from_bytes(b"Hani");
    pub const HANGUL: Script                 = Script::from_bytes(b"Hang");
    pub const HANIFI_ROHINGYA: Script        = Script::from_bytes(b"Rohg");
    pub const HEBREW: Script                 = Script::from_bytes(b"Hebr");
    pub const HIRAGANA: Script               = Script::from_bytes(b"Hira");
    pub const IMPERIAL_ARAMAIC: Script       = Script::from_bytes(b"Armi");
    pub const INSCRIPTIONAL_PAHLAVI: Script  = Script::from_bytes(b"Phli");
    pub const INSCRIPTIONAL_PARTHIAN: Script = Script::from_bytes(b"Prti");
    pub const KANNADA: Script                = Script::from_bytes(b"Knda");
    pub const KATAKANA: Script               = Script::from_bytes(b"Kana");
    pub const KHAROSHTHI: Script             = Script::from_bytes(b"Khar");
    pub const KHMER: Script                  = Script::from_bytes(b"Khmr");
    pub const LAO: Script                    = Script::from_bytes(b"Laoo");
    pub const LATIN: Script                  = Script::from_bytes(b"Latn");
    pub const MALAYALAM: Script              = Script::from_bytes(b"Mlym");
    pub const MANDAIC: Script                = Script::from_bytes(b"Mand");
    pub const MANICHAEAN: Script             = Script::from_bytes(b"Mani");
    pub const MONGOLIAN: Script              = Script::from_bytes(b"Mong");
    pub const MYANMAR: Script                = Script::from_bytes(b"Mymr");
    pub const NKO: Script                    = Script::from_bytes(b"Nkoo");
    pub const OLD_ITALIC: Script             = Script::from_bytes(b"Ital");
    pub const OLD_SOGDIAN: Script            = Script::from_bytes(b"Sogo");
    pub const OLD_SOUTH_ARABIAN: Script      = Script::from_bytes(b"Sarb");
    pub const ORIYA: Script                  = Script::from_bytes(b"Orya");
    pub const PHAGS_PA: Script               = Script::from_bytes(b"Phag");
    pub const PHOENICIAN: Script             = Script::from_bytes(b"Phnx");
    pub const PSALTER_PAHLAVI: Script        = Script::from_bytes(b"Phlp");
    pub const RUNIC: Script                  = Script::from_bytes(b"Runr");
    pub const SAMARITAN: Script              = Script::from_bytes(b"Samr");
    pub const SINHALA: Script                = Script::from_bytes(b"Sinh");
    pub const SOGDIAN: Script                = Script::from_bytes(b"Sogd");
    pub const SYRIAC: Script                 = Script::from_bytes(b"Syrc");
    pub const TAMIL: Script                  = Script::from_bytes(b"Taml");
    pub const TELUGU: Script                 = Script::from_bytes(b"Telu");
    pub const THAANA: Script                 = Script::from_bytes(b"Thaa");
    pub const THAI: Script                   = Script::from_bytes(b"Thai");
    pub const TIBETAN: Script                = Script::from_bytes(b"Tibt");
    pub const YEZIDI: Script                 = Script::from_bytes(b"Yezi");
    pub const YI: Script                     = Script::from_bytes(b"Yiii");

    // https://github.com/harfbuzz/harfbuzz/issues/1162
    pub const MYANMAR_ZAWGYI: Script         = Script::from_bytes(b"Qaag");
}

/// A feature tag with an accompanying range specifying on which subslice of
/// `shape`s input it should be applied.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Feature {
    /// The feature tag.
    pub tag: Tag,
    /// The value of the feature, `0` disables it.
    pub value: u32,
    /// The first cluster the feature applies to.
    pub start: u32,
    /// One past the last cluster the feature applies to.
    pub end: u32,
}

impl Feature {
    /// Create a new `Feature` struct.
    pub fn new(tag: Tag, value: u32, range: impl std::ops::RangeBounds<usize>) -> Feature {
        let max = u32::MAX as usize;
        let start = match range.start_bound() {
            std::ops::Bound::Included(&included) => included.min(max) as u32,
            std::ops::Bound::Excluded(&excluded) => excluded.min(max - 1) as u32 + 1,
            std::ops::Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            std::ops::Bound::Included(&included) => included.min(max) as u32,
            std::ops::Bound::Excluded(&excluded) => excluded.saturating_sub(1).min(max) as u32,
            std::ops::Bound::Unbounded => u32::MAX,
        };

        Feature { tag, value, start, end }
    }

    #[inline]
    pub(crate) fn is_global(&self) -> bool {
        self.start == 0 && self.end == u32::MAX
    }
}

impl FromStr for Feature {
    type Err = &'static str;

    /// Parses a `Feature` form a string.
    ///
    /// Possible values:
    ///
    /// - `kern` -> kern .. 1
    /// - `+kern` -> kern .. 1
    /// - `-kern` -> kern .. 0
    /// - `kern=0` -> kern .. 0
    /// - `kern=1` -> kern .. 1
    /// - `aalt=2` -> altr .. 2
    /// - `kern[]` -> kern .. 1
    /// - `kern[:]` -> kern .. 1
    /// - `kern[5:]` -> kern 5.. 1
    /// - `kern[:5]` -> kern ..=5 1
    /// - `kern[3:5]` -> kern 3..=5 1
    /// - `kern[3]` -> kern 3..=4 1
    /// - `aalt[3:5]=2` -> kern 3..=5 1
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn parse(s: &str) -> Option<Feature> {
            if s.is_empty() {
                return None;
            }

            let mut p = TextParser::new(s);

            // Parse prefix.
            let mut value = 1;
            match p.curr_byte()? {
                b'-' => {
                    value = 0;
                    p.advance(1);
                }
                b'+' => {
                    value = 1;
                    p.advance(1);
                }
                _ => {}
            }

            // Parse tag.
            p.skip_spaces();
            let quote = p.consume_quote();

            let tag = p.consume_tag()?;

            // Force closing quote.
            if let Some(quote) = quote {
                p.consume_byte(quote)?;
            }

            // Parse indices.
            p.skip_spaces();

            let (start, end) = if p.consume_byte(b'[').is_some() {
                let start_opt = p.consume_i32();
                let start = start_opt.unwrap_or(0) as u32; // negative value overflow is ok

                let end = if matches!(p.curr_byte(), Some(b':') | Some(b';')) {
                    p.advance(1);
                    p.consume_i32().unwrap_or(-1) as u32 // negative value overflow is ok
                } else {
                    if start_opt.is_some() && start != u32::MAX {
                        start + 1
                    } else {
                        u32::MAX
                    }
                };

                p.consume_byte(b']')?;

                (start, end)
            } else {
                (0, u32::MAX)
            };

            // Parse postfix.
            let had_equal = p.consume_byte(b'=').is_some();
            let value1 = p
                .consume_i32()
                .or_else(|| p.consume_bool().map(|b| b as i32));

            if had_equal && value1.is_none() {
                return None;
            };

            if let Some(value1) = value1 {
                value = value1 as u32; // negative value overflow is ok
            }

            p.skip_spaces();

            if !p.at_end() {
                return None;
            }

            Some(Feature {
                tag,
                value,
                start,
                end,
            })
        }

        parse(s).ok_or("invalid feature")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test {
        ($name:ident, $text:expr, $tag:expr, $value:expr, $range:expr) => (
            #[test]
            fn $name() {
                assert_eq!(
                    Feature::from_str($text).unwrap(),
                    Feature::new(Tag::from_bytes($tag), $value, $range)
                );
            }
        )
    }

    test!(parse_01, "kern",         b"kern", 1, ..);
    test!(parse_02, "+kern",        b"kern", 1, ..);
    test!(parse_03, "-kern",        b"kern", 0, ..);
    test!(parse_04, "kern=0",       b"kern", 0, ..);
    test!(parse_05, "kern[5:]",     b"kern", 1, 5..);
    test!(parse_06, "kern[3:5]",    b"kern", 1, 3..=5);
    test!(parse_07, "aalt[3:5]=2",  b"aalt", 2, 3..=5);
    test!(parse_08, "\"kern\"=off", b"kern", 0, ..);

    #[test]
    fn parse_invalid() {
        assert!(Feature::from_str("").is_err());
        assert!(Feature::from_str("kern=").is_err());
        assert!(Feature::from_str("kern[3").is_err());
    }

    #[test]
    fn language_is_normalized() {
        let lang = Language::from_str("my_MM").unwrap();
        assert_eq!(lang.as_str(), "my-mm");
        assert_eq!(lang.primary(), "my");
    }

    #[test]
    fn script_direction() {
        assert_eq!(Direction::from_script(script::ARABIC), Some(Direction::RightToLeft));
        assert_eq!(Direction::from_script(script::MYANMAR), Some(Direction::LeftToRight));
        assert_eq!(Direction::from_script(script::RUNIC), None);
    }

    #[test]
    fn script_from_str_is_lenient() {
        assert_eq!(Script::from_str("mymr").unwrap(), script::MYANMAR);
        assert_eq!(Script::from_str("Latf").unwrap(), script::LATIN);
    }
}

use unicode_properties::{GeneralCategory, GeneralCategoryGroup, UnicodeGeneralCategory};

use crate::{script, Script, Tag};

pub(crate) mod modified_cp {
    pub const DOTTED_CIRCLE: u32 = 0x25CC;
    pub const ZWNJ: u32 = 0x200C;
    pub const ZWJ: u32 = 0x200D;
    pub const CGJ: u32 = 0x034F;
}

// Combining classes below every Arabic class, for reordered modifier marks.
pub(crate) mod modified_cc {
    pub const CCC22: u8 = 22;
    pub const CCC26: u8 = 26;
}

bitflags::bitflags! {
    /// Per-character flags cached in the glyph info before shaping.
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub(crate) struct UnicodeProps: u8 {
        const MARK          = 1 << 0;
        const ZWJ           = 1 << 1;
        const ZWNJ          = 1 << 2;
        const IGNORABLE     = 1 << 3;
        const HIDDEN        = 1 << 4;
        const CONTINUATION  = 1 << 5;
        const SPACE         = 1 << 6;
    }
}

// Default_Ignorable codepoints, minus the Hangul fillers (U+115F, U+1160,
// U+3164, U+FFA0) which fonts draw with regular spacing glyphs, and minus
// U+1BCA0..1BCA3.
pub(crate) fn is_default_ignorable(ch: u32) -> bool {
    let plane = ch >> 16;
    if plane == 0 {
        let page = ch >> 8;
        match page {
            0x00 => ch == 0x00AD,
            0x03 => ch == 0x034F,
            0x06 => ch == 0x061C,
            0x17 => (0x17B4..=0x17B5).contains(&ch),
            0x18 => (0x180B..=0x180E).contains(&ch),
            0x20 => {
                (0x200B..=0x200F).contains(&ch)
                    || (0x202A..=0x202E).contains(&ch)
                    || (0x2060..=0x206F).contains(&ch)
            }
            0xFE => (0xFE00..=0xFE0F).contains(&ch) || ch == 0xFEFF,
            0xFF => (0xFFF0..=0xFFF8).contains(&ch),
            _ => false,
        }
    } else {
        match plane {
            0x01 => (0x1D173..=0x1D17A).contains(&ch),
            0x0E => (0xE0000..=0xE0FFF).contains(&ch),
            _ => false,
        }
    }
}

pub(crate) fn script_from_char(c: char) -> Script {
    use unicode_script::Script as UScript;

    match UScript::from(c) {
        UScript::Common => script::COMMON,
        UScript::Inherited => script::INHERITED,
        UScript::Unknown => script::UNKNOWN,
        s => {
            let tag = Tag::from_bytes_lossy(s.short_name().as_bytes());
            Script::from_iso15924_tag(tag).unwrap_or(script::UNKNOWN)
        }
    }
}

#[inline]
pub(crate) fn is_mark(c: char) -> bool {
    c.general_category_group() == GeneralCategoryGroup::Mark
}

#[inline]
pub(crate) fn is_space_separator(c: char) -> bool {
    c.general_category() == GeneralCategory::SpaceSeparator
}

/// Grapheme continuations: marks, joiners and emoji modifiers.
pub(crate) fn is_continuation(c: char) -> bool {
    let u = c as u32;
    is_mark(c)
        || u == modified_cp::ZWJ
        || (0x1F3FB..=0x1F3FF).contains(&u)
        || (0xE0020..=0xE007F).contains(&u)
}

pub(crate) fn props_for(c: char) -> UnicodeProps {
    let u = c as u32;
    let mut props = UnicodeProps::empty();

    if is_mark(c) {
        props |= UnicodeProps::MARK;
    }

    if is_continuation(c) {
        props |= UnicodeProps::CONTINUATION;
    }

    if is_space_separator(c) {
        props |= UnicodeProps::SPACE;
    }

    if is_default_ignorable(u) {
        props |= UnicodeProps::IGNORABLE;

        match u {
            modified_cp::ZWJ => props |= UnicodeProps::ZWJ,
            modified_cp::ZWNJ => props |= UnicodeProps::ZWNJ,
            // Mongolian free variation selectors and the combining grapheme
            // joiner must not be hidden from GSUB.
            0x180B..=0x180D | 0x180F | modified_cp::CGJ => props |= UnicodeProps::HIDDEN,
            _ => {}
        }
    }

    props
}

#[inline]
pub(crate) fn combining_class(c: char) -> u8 {
    unicode_ccc::get_canonical_combining_class(c) as u8
}

#[inline]
pub(crate) fn mirrored(c: char) -> Option<char> {
    unicode_bidi_mirroring::get_mirrored(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_lookup() {
        assert_eq!(script_from_char('\u{1000}'), script::MYANMAR);
        assert_eq!(script_from_char('a'), script::LATIN);
        assert_eq!(script_from_char(' '), script::COMMON);
        assert_eq!(script_from_char('\u{0301}'), script::INHERITED);
    }

    #[test]
    fn joiner_props() {
        assert!(props_for('\u{200D}').contains(UnicodeProps::ZWJ | UnicodeProps::IGNORABLE));
        assert!(props_for('\u{200C}').contains(UnicodeProps::ZWNJ));
        assert!(props_for('\u{102F}').contains(UnicodeProps::MARK));
        assert!(!props_for('\u{1000}').contains(UnicodeProps::MARK));
    }

    #[test]
    fn mirroring() {
        assert_eq!(mirrored('('), Some(')'));
        assert_eq!(mirrored('a'), None);
    }
}

//! OpenType layout plumbing: feature tags, script tag selection and the
//! feature-to-mask map compiled for a shape plan.

mod map;
mod tag;

pub use map::*;
pub(crate) use tag::*;

/// Layout table selector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TableIndex {
    /// Glyph substitution.
    GSUB = 0,
    /// Glyph positioning.
    GPOS = 1,
}

impl TableIndex {
    pub(crate) fn iter() -> impl Iterator<Item = TableIndex> {
        [Self::GSUB, Self::GPOS].into_iter()
    }
}

/// Registered OpenType feature tags used by the shapers.
pub mod feature {
    #![allow(missing_docs)]

    use crate::Tag;

    pub const ABOVE_BASE_MARK_POSITIONING: Tag = Tag::from_bytes(b"abvm");
    pub const ABOVE_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"abvs");
    pub const BELOW_BASE_FORMS: Tag = Tag::from_bytes(b"blwf");
    pub const BELOW_BASE_MARK_POSITIONING: Tag = Tag::from_bytes(b"blwm");
    pub const BELOW_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"blws");
    pub const CONTEXTUAL_ALTERNATES: Tag = Tag::from_bytes(b"calt");
    pub const CONTEXTUAL_LIGATURES: Tag = Tag::from_bytes(b"clig");
    pub const CURSIVE_POSITIONING: Tag = Tag::from_bytes(b"curs");
    pub const DENOMINATORS: Tag = Tag::from_bytes(b"dnom");
    pub const DISTANCES: Tag = Tag::from_bytes(b"dist");
    pub const FRACTIONS: Tag = Tag::from_bytes(b"frac");
    pub const GLYPH_COMPOSITION_DECOMPOSITION: Tag = Tag::from_bytes(b"ccmp");
    pub const INITIAL_FORMS: Tag = Tag::from_bytes(b"init");
    pub const ISOLATED_FORMS: Tag = Tag::from_bytes(b"isol");
    pub const KERNING: Tag = Tag::from_bytes(b"kern");
    pub const LEADING_JAMO_FORMS: Tag = Tag::from_bytes(b"ljmo");
    pub const LEFT_TO_RIGHT_ALTERNATES: Tag = Tag::from_bytes(b"ltra");
    pub const LEFT_TO_RIGHT_MIRRORED_FORMS: Tag = Tag::from_bytes(b"ltrm");
    pub const LOCALIZED_FORMS: Tag = Tag::from_bytes(b"locl");
    pub const MARK_POSITIONING: Tag = Tag::from_bytes(b"mark");
    pub const MARK_POSITIONING_VIA_SUBSTITUTION: Tag = Tag::from_bytes(b"mset");
    pub const MARK_TO_MARK_POSITIONING: Tag = Tag::from_bytes(b"mkmk");
    pub const MEDIAL_FORMS: Tag = Tag::from_bytes(b"medi");
    pub const MEDIAL_FORMS_2: Tag = Tag::from_bytes(b"med2");
    pub const NUMERATORS: Tag = Tag::from_bytes(b"numr");
    pub const POST_BASE_FORMS: Tag = Tag::from_bytes(b"pstf");
    pub const POST_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"psts");
    pub const PRE_BASE_FORMS: Tag = Tag::from_bytes(b"pref");
    pub const PRE_BASE_SUBSTITUTIONS: Tag = Tag::from_bytes(b"pres");
    pub const RANDOMIZE: Tag = Tag::from_bytes(b"rand");
    pub const REPH_FORMS: Tag = Tag::from_bytes(b"rphf");
    pub const REQUIRED_CONTEXTUAL_ALTERNATES: Tag = Tag::from_bytes(b"rclt");
    pub const REQUIRED_LIGATURES: Tag = Tag::from_bytes(b"rlig");
    pub const REQUIRED_VARIATION_ALTERNATES: Tag = Tag::from_bytes(b"rvrn");
    pub const RIGHT_TO_LEFT_ALTERNATES: Tag = Tag::from_bytes(b"rtla");
    pub const RIGHT_TO_LEFT_MIRRORED_FORMS: Tag = Tag::from_bytes(b"rtlm");
    pub const STANDARD_LIGATURES: Tag = Tag::from_bytes(b"liga");
    pub const STRETCHING_GLYPH_DECOMPOSITION: Tag = Tag::from_bytes(b"stch");
    pub const TERMINAL_FORMS_1: Tag = Tag::from_bytes(b"fina");
    pub const TERMINAL_FORMS_2: Tag = Tag::from_bytes(b"fin2");
    pub const TERMINAL_FORMS_3: Tag = Tag::from_bytes(b"fin3");
    pub const TRAILING_JAMO_FORMS: Tag = Tag::from_bytes(b"tjmo");
    pub const VERTICAL_KERNING: Tag = Tag::from_bytes(b"vkrn");
    pub const VERTICAL_WRITING: Tag = Tag::from_bytes(b"vert");
    pub const VOWEL_JAMO_FORMS: Tag = Tag::from_bytes(b"vjmo");
}

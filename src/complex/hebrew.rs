use super::{ComplexShaper, ZeroWidthMarksMode};
use crate::normalize::{ShapeNormalizationMode, ShapeNormalizeContext};
use crate::ot::{feature, TableIndex};
use crate::Tag;

pub static HEBREW_SHAPER: ComplexShaper = ComplexShaper {
    name: "hebrew",
    collect_features: None,
    override_features: None,
    create_data: None,
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: Some(ShapeNormalizationMode::Auto),
    decompose: None,
    compose: Some(compose),
    setup_masks: None,
    // https://github.com/harfbuzz/harfbuzz/issues/347#issuecomment-267838368
    gpos_tag: Some(Tag::from_bytes(b"hebr")),
    reorder_marks: None,
    zero_width_marks: Some(ZeroWidthMarksMode::Late),
    fallback_position: true,
};

const S_DAGESH_FORMS: &[u32] = &[
    0xFB30, // ALEF
    0xFB31, // BET
    0xFB32, // GIMEL
    0xFB33, // DALET
    0xFB34, // HE
    0xFB35, // VAV
    0xFB36, // ZAYIN
    0x0000, // HET
    0xFB38, // TET
    0xFB39, // YOD
    0xFB3A, // FINAL KAF
    0xFB3B, // KAF
    0xFB3C, // LAMED
    0x0000, // FINAL MEM
    0xFB3E, // MEM
    0x0000, // FINAL NUN
    0xFB40, // NUN
    0xFB41, // SAMEKH
    0x0000, // AYIN
    0xFB43, // FINAL PE
    0xFB44, // PE
    0x0000, // FINAL TSADI
    0xFB46, // TSADI
    0xFB47, // QOF
    0xFB48, // RESH
    0xFB49, // SHIN
    0xFB4A, // TAV
];

// Hebrew presentation-form shaping.
// https://bugzilla.mozilla.org/show_bug.cgi?id=728866
//
// Every Hebrew presentation form is excluded from canonical composition,
// so these pairs only compose here, and only for fonts that can't position
// the marks themselves.
fn compose(ctx: &ShapeNormalizeContext, a: char, b: char) -> Option<char> {
    if ctx.plan.ot_map.has_feature(TableIndex::GPOS, feature::MARK_POSITIONING) {
        return None;
    }

    let a = a as u32;
    let ab = match b {
        // HIRIQ
        '\u{05B4}' if a == 0x05D9 => 0xFB1D, // YOD
        // PATAH
        '\u{05B7}' if a == 0x05D9 => 0xFB1F, // YIDDISH YOD YOD
        '\u{05B7}' if a == 0x05D0 => 0xFB2E, // ALEF
        // QAMATS
        '\u{05B8}' if a == 0x05D0 => 0xFB2F, // ALEF
        // HOLAM
        '\u{05B9}' if a == 0x05D5 => 0xFB4B, // VAV
        // DAGESH
        '\u{05BC}' if (0x05D0..=0x05EA).contains(&a) => S_DAGESH_FORMS[(a - 0x05D0) as usize],
        '\u{05BC}' if a == 0xFB2A => 0xFB2C, // SHIN WITH SHIN DOT
        '\u{05BC}' if a == 0xFB2B => 0xFB2D, // SHIN WITH SIN DOT
        // RAFE
        '\u{05BF}' if a == 0x05D1 => 0xFB4C, // BET
        '\u{05BF}' if a == 0x05DB => 0xFB4D, // KAF
        '\u{05BF}' if a == 0x05E4 => 0xFB4E, // PE
        // SHIN DOT
        '\u{05C1}' if a == 0x05E9 => 0xFB2A, // SHIN
        '\u{05C1}' if a == 0xFB49 => 0xFB2C, // SHIN WITH DAGESH
        // SIN DOT
        '\u{05C2}' if a == 0x05E9 => 0xFB2B, // SHIN
        '\u{05C2}' if a == 0xFB49 => 0xFB2D, // SHIN WITH DAGESH
        _ => 0,
    };

    if ab == 0 {
        None
    } else {
        char::from_u32(ab)
    }
}

#[cfg(test)]
mod tests {
    use crate::{shape, FontFace, GlyphId, UnicodeBuffer};
    use pretty_assertions::assert_eq;

    struct Hebrew;

    impl FontFace for Hebrew {
        fn glyph_index(&self, c: char) -> Option<GlyphId> {
            u16::try_from(c as u32).ok().map(GlyphId)
        }

        fn glyph_advance(&self, _: GlyphId, _: bool) -> i32 {
            600
        }
    }

    fn run(text: &str) -> Vec<u32> {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        shape(&Hebrew, &[], buffer)
            .glyph_infos()
            .iter()
            .map(|info| info.glyph_id)
            .collect()
    }

    #[test]
    fn shin_with_dagesh_and_shin_dot() {
        // The marks are reordered by combining class, then composed pairwise.
        assert_eq!(run("\u{05E9}\u{05C1}\u{05BC}"), vec![0xFB2C]);
    }

    #[test]
    fn letters_without_a_dagesh_form_stay_decomposed() {
        // HET + DAGESH; the buffer comes back in visual order.
        assert_eq!(run("\u{05D7}\u{05BC}"), vec![0x05BC, 0x05D7]);
    }
}

use super::myanmar_machine::{find_syllables_myanmar, SyllableType};
use super::{syllabic, ComplexShaper, ZeroWidthMarksMode};
use crate::buffer::{Buffer, GlyphInfo};
use crate::face::FontFace;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::{feature, FeatureFlags};
use crate::plan::{ShapePlan, ShapePlanner};
use crate::Tag;

pub static MYANMAR_SHAPER: ComplexShaper = ComplexShaper {
    name: "myanmar",
    collect_features: Some(collect_features),
    override_features: Some(override_features),
    create_data: None,
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: Some(ShapeNormalizationMode::ComposedDiacriticsNoShortCircuit),
    decompose: None,
    compose: None,
    setup_masks: Some(setup_masks),
    gpos_tag: None,
    reorder_marks: None,
    zero_width_marks: Some(ZeroWidthMarksMode::Early),
    fallback_position: false,
};

// Zawgyi is visually ordered and needs no reordering at all.
pub static MYANMAR_ZAWGYI_SHAPER: ComplexShaper = ComplexShaper {
    name: "myanmar_zawgyi",
    collect_features: None,
    override_features: None,
    create_data: None,
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: None,
    decompose: None,
    compose: None,
    setup_masks: None,
    gpos_tag: None,
    reorder_marks: None,
    zero_width_marks: None,
    fallback_position: false,
};

pub mod category {
    pub const X: u8 = 0;
    pub const C: u8 = 1;
    pub const IV: u8 = 2;
    pub const DB: u8 = 3;
    pub const H: u8 = 4;
    pub const ZWNJ: u8 = 5;
    pub const ZWJ: u8 = 6;
    pub const SM: u8 = 8;
    pub const A: u8 = 10;
    pub const GB: u8 = 11;
    pub const RA: u8 = 16;
    pub const AS: u8 = 18;
    pub const MH: u8 = 21;
    pub const MR: u8 = 22;
    pub const MW: u8 = 23;
    pub const MY: u8 = 24;
    pub const PT: u8 = 25;
    pub const V_ABV: u8 = 26;
    pub const V_BLW: u8 = 27;
    pub const V_PRE: u8 = 28;
    pub const V_PST: u8 = 29;
    pub const VS: u8 = 30;
    pub const P: u8 = 31;
    pub const D: u8 = 32;
}

// Visual order of the glyphs within a syllable after reordering.
pub mod position {
    pub const PRE_M: u8 = 2;
    pub const PRE_C: u8 = 3;
    pub const BASE_C: u8 = 4;
    pub const AFTER_MAIN: u8 = 5;
    pub const BEFORE_SUB: u8 = 7;
    pub const BELOW_C: u8 = 8;
    pub const AFTER_SUB: u8 = 9;
    pub const END: u8 = 14;
}

const MYANMAR_FEATURES: &[Tag] = &[
    // Basic features.
    // These features are applied in order, one at a time, after reordering,
    // constrained to the syllable.
    feature::REPH_FORMS,
    feature::PRE_BASE_FORMS,
    feature::BELOW_BASE_FORMS,
    feature::POST_BASE_FORMS,
    // Other features.
    // These features are applied all at once after clearing syllables.
    feature::PRE_BASE_SUBSTITUTIONS,
    feature::ABOVE_BASE_SUBSTITUTIONS,
    feature::BELOW_BASE_SUBSTITUTIONS,
    feature::POST_BASE_SUBSTITUTIONS,
];

// Myanmar
// https://docs.microsoft.com/en-us/typography/script-development/myanmar#analyze
pub fn get_category(c: char) -> u8 {
    use category::*;

    match c as u32 {
        // Kinzi-forming consonants.
        0x1004 | 0x101B | 0x105A => RA,

        0x1000..=0x1021 => C,
        0x1022..=0x102A => IV,
        0x102B..=0x102C => V_PST,
        0x102D..=0x102E => V_ABV,
        0x102F..=0x1030 => V_BLW,
        0x1031 => V_PRE,
        0x1032 => A,
        0x1033..=0x1035 => V_ABV,
        0x1036 => A,
        0x1037 => DB,
        0x1038 => SM,
        0x1039 => H,
        0x103A => AS,
        0x103B => MY,
        0x103C => MR,
        0x103D => MW,
        0x103E => MH,
        0x103F => C,
        // The Microsoft document says D0 for U+1040, Uniscribe uses D.
        0x1040..=0x1049 => D,
        0x104A..=0x104B => P,
        0x104E => C,
        0x1050..=0x1051 => C,
        0x1052..=0x1055 => IV,
        0x1056..=0x1057 => V_PST,
        0x1058..=0x1059 => V_BLW,
        0x105B..=0x105D => C,
        0x105E..=0x105F => MY,
        0x1060 => MH,
        0x1061 => C,
        0x1062 => V_PST,
        0x1063..=0x1064 => PT,
        0x1065..=0x1066 => C,
        0x1067..=0x1068 => V_PST,
        0x1069..=0x106D => PT,
        0x106E..=0x1070 => C,
        0x1071..=0x1074 => V_ABV,
        0x1075..=0x1081 => C,
        0x1082 => MW,
        0x1083 => V_PST,
        0x1084 => V_PRE,
        0x1085..=0x1086 => V_ABV,
        0x1087..=0x108D => SM,
        0x108E => C,
        0x108F => SM,
        0x1090..=0x1099 => D,
        0x109A..=0x109C => SM,
        0x109D => V_ABV,

        0xA9E0..=0xA9E4 => C,
        0xA9E5 => V_ABV,
        0xA9E7..=0xA9EF => C,
        0xA9F0..=0xA9F9 => D,
        0xA9FA..=0xA9FE => C,

        0xAA60..=0xAA6F => C,
        // https://github.com/harfbuzz/harfbuzz/issues/218
        0xAA71..=0xAA76 => C,
        0xAA7A => C,
        0xAA7B => PT,
        0xAA7C..=0xAA7D => SM,
        0xAA7E..=0xAA7F => C,

        0xFE00..=0xFE0F => VS,
        0x200C => ZWNJ,
        0x200D => ZWJ,

        // Generic bases.
        0x002D | 0x00A0 | 0x00D7 | 0x2012..=0x2015 | 0x2022 | 0x25CC | 0x25FB..=0x25FE => GB,

        _ => X,
    }
}

impl GlyphInfo {
    fn is_myanmar_consonant(&self) -> bool {
        matches!(
            self.complex_category(),
            category::C | category::RA | category::IV | category::GB
        )
    }

    fn myanmar_position(&self) -> u8 {
        self.complex_aux()
    }

    fn set_myanmar_position(&mut self, pos: u8) {
        self.set_complex_aux(pos);
    }

    fn set_myanmar_properties(&mut self) {
        self.set_complex_category(get_category(self.as_char()));
        self.set_myanmar_position(position::END);
    }
}

fn collect_features(planner: &mut ShapePlanner) {
    // Do this before any lookups have been applied.
    planner.ot_map.add_gsub_pause(Some(setup_syllables));

    planner
        .ot_map
        .enable_feature(feature::LOCALIZED_FORMS, FeatureFlags::PER_SYLLABLE, 1);
    // The Indic shaping documents do not require ccmp, but we apply it here since if
    // there is a use of it, it's typically at the beginning.
    planner.ot_map.enable_feature(
        feature::GLYPH_COMPOSITION_DECOMPOSITION,
        FeatureFlags::PER_SYLLABLE,
        1,
    );

    planner.ot_map.add_gsub_pause(Some(reorder_myanmar));

    for &feature in &MYANMAR_FEATURES[..4] {
        planner.ot_map.enable_feature(
            feature,
            FeatureFlags::MANUAL_ZWJ | FeatureFlags::PER_SYLLABLE,
            1,
        );
        planner.ot_map.add_gsub_pause(None);
    }

    planner.ot_map.add_gsub_pause(Some(syllabic::clear_syllables));

    for &feature in &MYANMAR_FEATURES[4..] {
        planner.ot_map.enable_feature(feature, FeatureFlags::MANUAL_ZWJ, 1);
    }
}

fn override_features(planner: &mut ShapePlanner) {
    planner.ot_map.disable_feature(feature::STANDARD_LIGATURES);
}

fn setup_masks(_: &ShapePlan, _: &dyn FontFace, buffer: &mut Buffer) {
    // We cannot setup masks here.  We save information about characters
    // and setup masks later on in a pause-callback.
    for info in &mut buffer.info {
        info.set_myanmar_properties();
    }
}

fn setup_syllables(_: &ShapePlan, _: &dyn FontFace, buffer: &mut Buffer) {
    find_syllables_myanmar(buffer);

    let mut start = 0;
    let mut end = buffer.next_syllable(0);
    while start < buffer.len() {
        buffer.unsafe_to_break(start, end);
        start = end;
        end = buffer.next_syllable(start);
    }
}

fn reorder_myanmar(_: &ShapePlan, face: &dyn FontFace, buffer: &mut Buffer) {
    syllabic::insert_dotted_circles(
        face,
        buffer,
        SyllableType::BrokenCluster as u8,
        category::GB,
        Some(position::END),
    );

    let mut start = 0;
    let mut end = buffer.next_syllable(0);
    while start < buffer.len() {
        reorder_syllable(start, end, buffer);
        start = end;
        end = buffer.next_syllable(start);
    }
}

fn reorder_syllable(start: usize, end: usize, buffer: &mut Buffer) {
    match SyllableType::from_syllable(buffer.info[start].syllable()) {
        // We already inserted dotted-circles, so just call the consonant_syllable.
        SyllableType::ConsonantSyllable | SyllableType::BrokenCluster => {
            initial_reordering_consonant_syllable(start, end, buffer);
        }
        SyllableType::PunctuationCluster | SyllableType::NonMyanmarCluster => {}
    }
}

// Rules from:
// https://docs.microsoft.com/en-us/typography/script-development/myanmar
fn initial_reordering_consonant_syllable(start: usize, end: usize, buffer: &mut Buffer) {
    let mut base = end;
    let mut has_reph = false;

    let mut limit = start;
    if start + 3 <= end
        && buffer.info[start].complex_category() == category::RA
        && buffer.info[start + 1].complex_category() == category::AS
        && buffer.info[start + 2].complex_category() == category::H
    {
        limit += 3;
        base = start;
        has_reph = true;
    }

    if !has_reph {
        base = limit;
    }

    for i in limit..end {
        if buffer.info[i].is_myanmar_consonant() {
            base = i;
            break;
        }
    }

    // Reorder!
    let mut i = start;
    let reph_end = if has_reph { start + 3 } else { start };
    while i < reph_end {
        buffer.info[i].set_myanmar_position(position::AFTER_MAIN);
        i += 1;
    }

    while i < base {
        buffer.info[i].set_myanmar_position(position::PRE_C);
        i += 1;
    }

    if i < end {
        buffer.info[i].set_myanmar_position(position::BASE_C);
        i += 1;
    }

    let mut pos = position::AFTER_MAIN;
    // The following loop may be ugly, but it implements all of
    // Myanmar reordering!
    for i in i..end {
        let cat = buffer.info[i].complex_category();

        // Pre-base reordering
        if cat == category::MR {
            buffer.info[i].set_myanmar_position(position::PRE_C);
            continue;
        }

        // Left matra
        if cat == category::V_PRE {
            buffer.info[i].set_myanmar_position(position::PRE_M);
            continue;
        }

        if cat == category::VS {
            let prev = buffer.info[i - 1].myanmar_position();
            buffer.info[i].set_myanmar_position(prev);
            continue;
        }

        if pos == position::AFTER_MAIN && cat == category::V_BLW {
            pos = position::BELOW_C;
            buffer.info[i].set_myanmar_position(pos);
            continue;
        }

        if pos == position::BELOW_C && cat == category::A {
            buffer.info[i].set_myanmar_position(position::BEFORE_SUB);
            continue;
        }

        if pos == position::BELOW_C && cat == category::V_BLW {
            buffer.info[i].set_myanmar_position(pos);
            continue;
        }

        if pos == position::BELOW_C && cat != category::A {
            pos = position::AFTER_SUB;
            buffer.info[i].set_myanmar_position(pos);
            continue;
        }

        buffer.info[i].set_myanmar_position(pos);
    }

    buffer.sort(start, end, |a, b| a.myanmar_position() > b.myanmar_position());

    // Flip left-matra sequence.
    let mut first_left_matra = end;
    let mut last_left_matra = end;
    for i in start..end {
        if buffer.info[i].myanmar_position() == position::PRE_M {
            if first_left_matra == end {
                first_left_matra = i;
            }
            last_left_matra = i;
        }
    }

    // https://github.com/harfbuzz/harfbuzz/issues/3863
    if first_left_matra < last_left_matra {
        // No need to merge clusters, done already?
        buffer.reverse_range(first_left_matra, last_left_matra + 1);
        // Reverse back VS, etc.
        let mut i = first_left_matra;
        for j in i..=last_left_matra {
            if buffer.info[j].complex_category() == category::V_PRE {
                buffer.reverse_range(i, j + 1);
                i = j + 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferFlags;
    use crate::{script, shape, Direction, GlyphId, UnicodeBuffer};
    use pretty_assertions::assert_eq;

    // Maps every BMP character to a glyph id equal to its code point.
    struct Identity {
        has_dotted_circle: bool,
    }

    impl FontFace for Identity {
        fn glyph_index(&self, c: char) -> Option<GlyphId> {
            if c == '\u{25CC}' && !self.has_dotted_circle {
                return None;
            }
            u16::try_from(c as u32).ok().map(GlyphId)
        }

        fn glyph_advance(&self, _: GlyphId, _: bool) -> i32 {
            100
        }

        fn has_script(&self, _: crate::ot::TableIndex, tag: Tag) -> bool {
            tag == Tag::from_bytes(b"mym2")
        }
    }

    fn run(face: &Identity, text: &str, flags: BufferFlags) -> crate::GlyphBuffer {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_script(script::MYANMAR);
        buffer.set_direction(Direction::LeftToRight);
        buffer.set_flags(flags);
        shape(face, &[], buffer)
    }

    fn glyphs(buffer: &crate::GlyphBuffer) -> Vec<u32> {
        buffer.glyph_infos().iter().map(|info| info.glyph_id).collect()
    }

    #[test]
    fn categories() {
        assert_eq!(get_category('\u{1004}'), category::RA);
        assert_eq!(get_category('\u{1000}'), category::C);
        assert_eq!(get_category('\u{1021}'), category::C);
        assert_eq!(get_category('\u{1023}'), category::IV);
        assert_eq!(get_category('\u{103C}'), category::MR);
        assert_eq!(get_category('\u{1031}'), category::V_PRE);
        assert_eq!(get_category('\u{25CC}'), category::GB);
        assert_eq!(get_category('\u{FE00}'), category::VS);
        assert_eq!(get_category('a'), category::X);
    }

    #[test]
    fn kinzi_moves_after_base() {
        let face = Identity { has_dotted_circle: true };
        // NGA ASAT VIRAMA KA VOWEL SIGN U
        let out = run(&face, "\u{1004}\u{103A}\u{1039}\u{1000}\u{102F}", BufferFlags::empty());
        assert_eq!(glyphs(&out), vec![0x1000, 0x1004, 0x103A, 0x1039, 0x102F]);

        let infos = out.glyph_infos();
        assert!(infos.iter().all(|info| info.cluster == 0));
        assert!(infos[1..].iter().all(|info| info.unsafe_to_break()));
    }

    #[test]
    fn medial_ra_and_left_matra_go_first() {
        let face = Identity { has_dotted_circle: true };
        // KA MEDIAL RA VOWEL SIGN E
        let out = run(&face, "\u{1000}\u{103C}\u{1031}", BufferFlags::empty());
        assert_eq!(glyphs(&out), vec![0x1031, 0x103C, 0x1000]);
    }

    #[test]
    fn broken_cluster_gets_dotted_circle() {
        let face = Identity { has_dotted_circle: true };
        let out = run(&face, "\u{102F}", BufferFlags::empty());
        assert_eq!(glyphs(&out), vec![0x25CC, 0x102F]);
        assert_eq!(out.glyph_infos()[0].cluster, out.glyph_infos()[1].cluster);

        let out = run(&face, "\u{102F}", BufferFlags::DO_NOT_INSERT_DOTTED_CIRCLE);
        assert_eq!(glyphs(&out), vec![0x102F]);
    }

    #[test]
    fn missing_dotted_circle_maps_to_notdef() {
        let face = Identity { has_dotted_circle: false };
        let out = run(&face, "\u{102F}", BufferFlags::empty());
        assert_eq!(glyphs(&out), vec![0, 0x102F]);
    }

    #[test]
    fn zawgyi_keeps_logical_order() {
        let face = Identity { has_dotted_circle: true };
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str("\u{1031}\u{1000}");
        buffer.set_script(script::MYANMAR_ZAWGYI);
        buffer.set_direction(Direction::LeftToRight);
        let out = shape(&face, &[], buffer);
        assert_eq!(glyphs(&out), vec![0x1031, 0x1000]);
    }
}

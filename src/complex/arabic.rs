use std::any::Any;

use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

use super::{ComplexShaper, ZeroWidthMarksMode};
use crate::buffer::{Buffer, GlyphInfo};
use crate::face::FontFace;
use crate::normalize::ShapeNormalizationMode;
use crate::ot::{feature, FeatureFlags};
use crate::plan::{ShapePlan, ShapePlanner};
use crate::unicode::modified_cc;
use crate::{script, Mask, Tag};

pub static ARABIC_SHAPER: ComplexShaper = ComplexShaper {
    name: "arabic",
    collect_features: Some(collect_features),
    override_features: None,
    create_data: Some(create_data),
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: Some(ShapeNormalizationMode::Auto),
    decompose: None,
    compose: None,
    setup_masks: Some(setup_masks),
    gpos_tag: None,
    reorder_marks: Some(reorder_marks),
    zero_width_marks: Some(ZeroWidthMarksMode::Late),
    fallback_position: true,
};

// Indexed by `Action`.
const ARABIC_FEATURES: &[Tag] = &[
    feature::ISOLATED_FORMS,
    feature::TERMINAL_FORMS_1,
    feature::TERMINAL_FORMS_2,
    feature::TERMINAL_FORMS_3,
    feature::MEDIAL_FORMS,
    feature::MEDIAL_FORMS_2,
    feature::INITIAL_FORMS,
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
enum Action {
    Isol = 0,
    Fina,
    Fin2,
    Fin3,
    Medi,
    Med2,
    Init,
    None,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum JoiningType {
    U = 0,
    L = 1,
    R = 2,
    D = 3,
    GroupAlaph = 4,
    GroupDalathRish = 5,
    T = 7,
}

impl GlyphInfo {
    fn arabic_shaping_action(&self) -> u8 {
        self.complex_aux()
    }

    fn set_arabic_shaping_action(&mut self, action: Action) {
        self.set_complex_aux(action as u8)
    }
}

fn feature_is_syriac(tag: Tag) -> bool {
    matches!(tag.to_bytes()[3], b'2' | b'3')
}

struct StateEntry {
    prev_action: Action,
    curr_action: Action,
    next_state: usize,
}

const fn entry(prev_action: Action, curr_action: Action, next_state: usize) -> StateEntry {
    StateEntry {
        prev_action,
        curr_action,
        next_state,
    }
}

// Rows are states, columns are joining types U, L, R, D, ALAPH, DALATH RISH.
#[rustfmt::skip]
const STATE_TABLE: [[StateEntry; 6]; 7] = {
    use Action::*;
    [
        // State 0: prev was U, not willing to join.
        [entry(None, None, 0), entry(None, Isol, 2), entry(None, Isol, 1), entry(None, Isol, 2), entry(None, Isol, 1), entry(None, Isol, 6)],
        // State 1: prev was R or ISOL/ALAPH, not willing to join.
        [entry(None, None, 0), entry(None, Isol, 2), entry(None, Isol, 1), entry(None, Isol, 2), entry(None, Fin2, 5), entry(None, Isol, 6)],
        // State 2: prev was D/L in ISOL form, willing to join.
        [entry(None, None, 0), entry(None, Isol, 2), entry(Init, Fina, 1), entry(Init, Fina, 3), entry(Init, Fina, 4), entry(Init, Fina, 6)],
        // State 3: prev was D in FINA form, willing to join.
        [entry(None, None, 0), entry(None, Isol, 2), entry(Medi, Fina, 1), entry(Medi, Fina, 3), entry(Medi, Fina, 4), entry(Medi, Fina, 6)],
        // State 4: prev was FINA ALAPH, not willing to join.
        [entry(None, None, 0), entry(None, Isol, 2), entry(Med2, Isol, 1), entry(Med2, Isol, 2), entry(Med2, Fin2, 5), entry(Med2, Isol, 6)],
        // State 5: prev was FIN2/FIN3 ALAPH, not willing to join.
        [entry(None, None, 0), entry(None, Isol, 2), entry(Isol, Isol, 1), entry(Isol, Isol, 2), entry(Isol, Fin2, 5), entry(Isol, Isol, 6)],
        // State 6: prev was DALATH/RISH, not willing to join.
        [entry(None, None, 0), entry(None, Isol, 2), entry(None, Isol, 1), entry(None, Isol, 2), entry(None, Fin3, 5), entry(None, Isol, 6)],
    ]
};

struct ArabicShapePlan {
    // The last entry, for `Action::None`, stays zero.
    mask_array: [Mask; ARABIC_FEATURES.len() + 1],
}

fn create_data(plan: &ShapePlan) -> Box<dyn Any + Send + Sync> {
    let mut mask_array = [0; ARABIC_FEATURES.len() + 1];
    for (mask, tag) in mask_array.iter_mut().zip(ARABIC_FEATURES) {
        *mask = plan.ot_map.one_mask(*tag);
    }

    Box::new(ArabicShapePlan { mask_array })
}

fn collect_features(planner: &mut ShapePlanner) {
    // Microsoft's Arabic feature order, with a pause after most features.
    // The pause between init/medi/... and rlig is required; the others only
    // matter for fonts with contextual substitutions.

    planner.ot_map.enable_feature(feature::GLYPH_COMPOSITION_DECOMPOSITION, FeatureFlags::MANUAL_ZWJ, 1);
    planner.ot_map.enable_feature(feature::LOCALIZED_FORMS, FeatureFlags::MANUAL_ZWJ, 1);
    planner.ot_map.add_gsub_pause(None);

    for &tag in ARABIC_FEATURES {
        let has_fallback = planner.script == Some(script::ARABIC) && !feature_is_syriac(tag);
        let flags = if has_fallback {
            FeatureFlags::HAS_FALLBACK
        } else {
            FeatureFlags::empty()
        };
        planner.ot_map.add_feature(tag, flags | FeatureFlags::MANUAL_ZWJ, 1);
        planner.ot_map.add_gsub_pause(None);
    }

    planner.ot_map.enable_feature(
        feature::REQUIRED_LIGATURES,
        FeatureFlags::MANUAL_ZWJ | FeatureFlags::HAS_FALLBACK,
        1,
    );
    planner.ot_map.add_gsub_pause(None);

    planner.ot_map.enable_feature(feature::CONTEXTUAL_ALTERNATES, FeatureFlags::MANUAL_ZWJ, 1);
    planner.ot_map.add_gsub_pause(None);

    planner.ot_map.enable_feature(feature::MARK_POSITIONING_VIA_SUBSTITUTION, FeatureFlags::empty(), 1);
}

fn setup_masks(plan: &ShapePlan, _: &dyn FontFace, buffer: &mut Buffer) {
    arabic_joining(buffer);

    if plan.script == Some(script::MONGOLIAN) {
        mongolian_variation_selectors(buffer);
    }

    let Some(arabic_plan) = plan.data::<ArabicShapePlan>() else {
        return;
    };

    for info in &mut buffer.info {
        let action = usize::from(info.arabic_shaping_action()).min(Action::None as usize);
        info.mask |= arabic_plan.mask_array[action];
    }
}

fn arabic_joining(buffer: &mut Buffer) {
    let mut prev: Option<usize> = None;
    let mut state = 0;

    for i in 0..buffer.len() {
        let this_type = joining_type(buffer.info[i].as_char());
        if this_type == JoiningType::T {
            buffer.info[i].set_arabic_shaping_action(Action::None);
            continue;
        }

        let entry = &STATE_TABLE[state][this_type as usize];
        if entry.prev_action != Action::None {
            if let Some(prev) = prev {
                buffer.info[prev].set_arabic_shaping_action(entry.prev_action);
                buffer.unsafe_to_break(prev, i + 1);
            }
        }

        buffer.info[i].set_arabic_shaping_action(entry.curr_action);

        prev = Some(i);
        state = entry.next_state;
    }
}

// Free variation selectors take the form of the letter they follow.
fn mongolian_variation_selectors(buffer: &mut Buffer) {
    for i in 1..buffer.len() {
        if matches!(buffer.info[i].glyph_id, 0x180B..=0x180D | 0x180F) {
            let action = buffer.info[i - 1].arabic_shaping_action();
            buffer.info[i].set_complex_aux(action);
        }
    }
}

fn joining_type(c: char) -> JoiningType {
    use JoiningType::*;

    match c as u32 {
        // Syriac joining groups.
        0x0710 => GroupAlaph,
        0x0715 | 0x0716 | 0x072A | 0x072F => GroupDalathRish,

        0x0621 | 0x0674 | 0x06D5 => U,

        0x0622..=0x0625
        | 0x0627
        | 0x0629
        | 0x062F..=0x0632
        | 0x0648
        | 0x0671..=0x0673
        | 0x0675..=0x0677
        | 0x0688..=0x0699
        | 0x06C0
        | 0x06C3..=0x06CB
        | 0x06CD
        | 0x06CF
        | 0x06D2
        | 0x06D3
        | 0x06EE
        | 0x06EF
        | 0x0717..=0x0719
        | 0x071E
        | 0x0728
        | 0x072C
        | 0x074D => R,

        0x0620
        | 0x0626
        | 0x0628
        | 0x062A..=0x062E
        | 0x0633..=0x063F
        | 0x0641..=0x0647
        | 0x0649
        | 0x064A
        | 0x066E
        | 0x066F
        | 0x0678..=0x0687
        | 0x069A..=0x06BF
        | 0x06C1
        | 0x06C2
        | 0x06CC
        | 0x06CE
        | 0x06D0
        | 0x06D1
        | 0x06FA..=0x06FC
        | 0x06FF
        | 0x0712..=0x0714
        | 0x071A..=0x071D
        | 0x071F..=0x0727
        | 0x0729
        | 0x072B
        | 0x072D
        | 0x072E
        | 0x074E
        | 0x074F
        | 0x0750..=0x077F
        | 0x07CA..=0x07EA
        | 0x0840..=0x0858
        | 0x08A0..=0x08AC => D,

        // Join-causing: TATWEEL, N'KO LAJANYALAN and ZWJ.
        0x0640 | 0x07FA | 0x180A | 0x200D => D,

        0x200C => U,

        0x1807 | 0x1820..=0x1842 | 0x1844..=0x1878 | 0x1887..=0x18A8 | 0x18AA => D,

        // Phags-pa.
        0xA840..=0xA871 => D,
        0xA872 => L,

        _ => match c.general_category() {
            GeneralCategory::NonspacingMark
            | GeneralCategory::EnclosingMark
            | GeneralCategory::Format => T,
            _ => U,
        },
    }
}

// http://www.unicode.org/reports/tr53/
fn is_modifier_combining_mark(c: char) -> bool {
    matches!(
        c as u32,
        0x0654 | 0x0655 | 0x0658 | 0x06DC | 0x06E3 | 0x06E7 | 0x06ED | 0x08D3 | 0x08F3
    )
}

// Moves modifier combining marks to the start of their mark sequence.
fn reorder_marks(_: &ShapePlan, buffer: &mut Buffer, mut start: usize, end: usize) {
    let mut i = start;
    for cc in [220u8, 230] {
        while i < end && buffer.info[i].combining_class() < cc {
            i += 1;
        }

        if i == end {
            break;
        }

        if buffer.info[i].combining_class() > cc {
            continue;
        }

        let mut j = i;
        while j < end
            && buffer.info[j].combining_class() == cc
            && is_modifier_combining_mark(buffer.info[j].as_char())
        {
            j += 1;
        }

        if i == j {
            continue;
        }

        buffer.merge_clusters(start, j);
        buffer.info[start..j].rotate_left(i - start);

        // Renumber the classes so that the sequence stays sorted.
        let new_start = start + j - i;
        let new_cc = if cc == 220 {
            modified_cc::CCC22
        } else {
            modified_cc::CCC26
        };
        for info in &mut buffer.info[start..new_start] {
            info.set_combining_class(new_cc);
        }

        start = new_start;
        i = j;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shape, GlyphId, UnicodeBuffer};
    use pretty_assertions::assert_eq;

    fn actions(text: &str) -> Vec<Action> {
        let mut buffer = Buffer::new();
        for (i, c) in text.chars().enumerate() {
            buffer.add(c, i as u32);
        }

        arabic_joining(&mut buffer);
        buffer
            .info
            .iter()
            .map(|info| match info.arabic_shaping_action() {
                0 => Action::Isol,
                1 => Action::Fina,
                2 => Action::Fin2,
                3 => Action::Fin3,
                4 => Action::Medi,
                5 => Action::Med2,
                6 => Action::Init,
                _ => Action::None,
            })
            .collect()
    }

    #[test]
    fn dual_joining_letters() {
        // BEH BEH BEH
        assert_eq!(
            actions("\u{0628}\u{0628}\u{0628}"),
            vec![Action::Init, Action::Medi, Action::Fina]
        );
    }

    #[test]
    fn right_joining_letter_breaks_the_chain() {
        // BEH ALEF BEH
        assert_eq!(
            actions("\u{0628}\u{0627}\u{0628}"),
            vec![Action::Init, Action::Fina, Action::Isol]
        );
    }

    #[test]
    fn marks_are_transparent() {
        // BEH FATHA BEH
        assert_eq!(
            actions("\u{0628}\u{064E}\u{0628}"),
            vec![Action::Init, Action::None, Action::Fina]
        );
    }

    #[test]
    fn zwnj_prevents_joining() {
        assert_eq!(
            actions("\u{0628}\u{200C}\u{0628}"),
            vec![Action::Isol, Action::None, Action::Isol]
        );
    }

    #[test]
    fn syriac_alaph_forms() {
        // WAW ALAPH, then BETH ALAPH
        assert_eq!(
            actions("\u{0718}\u{0710}"),
            vec![Action::Isol, Action::Fin2]
        );
        assert_eq!(
            actions("\u{0712}\u{0710}"),
            vec![Action::Init, Action::Fina]
        );
    }

    struct Bmp;

    impl FontFace for Bmp {
        fn glyph_index(&self, c: char) -> Option<GlyphId> {
            u16::try_from(c as u32).ok().map(GlyphId)
        }

        fn glyph_advance(&self, _: GlyphId, _: bool) -> i32 {
            500
        }
    }

    #[test]
    fn positional_masks_are_set_for_fallback() {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str("\u{0628}\u{0628}");
        let plan = ShapePlan::new(
            &Bmp,
            crate::Direction::RightToLeft,
            Some(script::ARABIC),
            None,
            &[],
        );
        assert_eq!(plan.shaper_name(), "arabic");

        let init = plan.ot_map.one_mask(feature::INITIAL_FORMS);
        let fina = plan.ot_map.one_mask(feature::TERMINAL_FORMS_1);
        assert_ne!(init, 0);
        assert_ne!(fina, 0);

        buffer.set_direction(crate::Direction::RightToLeft);
        buffer.set_script(script::ARABIC);
        let glyphs = crate::shape_with_plan(&Bmp, &plan, buffer);

        // Visual order: the final form comes first.
        let infos = glyphs.glyph_infos();
        assert_eq!(infos[0].glyph_id, 0x0628);
        assert_ne!(infos[0].mask() & fina, 0);
        assert_ne!(infos[1].mask() & init, 0);
        assert_eq!(infos[1].mask() & fina, 0);
    }

    #[test]
    fn modifier_marks_move_first() {
        // BEH, KASRA (32), HAMZA BELOW (220, modifier)
        let mut buffer = Buffer::new();
        for (i, c) in "\u{0628}\u{0650}\u{0655}".chars().enumerate() {
            buffer.add(c, i as u32);
            buffer.info[i].init_unicode_props();
        }

        let plan = ShapePlan::new(
            &Bmp,
            crate::Direction::RightToLeft,
            Some(script::ARABIC),
            None,
            &[],
        );
        reorder_marks(&plan, &mut buffer, 1, 3);

        let order: Vec<u32> = buffer.info.iter().map(|info| info.glyph_id).collect();
        assert_eq!(order, vec![0x0628, 0x0655, 0x0650]);
        assert_eq!(buffer.info[1].combining_class(), modified_cc::CCC22);
    }
}

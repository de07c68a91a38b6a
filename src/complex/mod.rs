//! Script-specific shapers.

mod arabic;
mod hangul;
mod hebrew;
mod myanmar;
mod myanmar_machine;
mod syllabic;
mod thai;

use std::any::Any;

use crate::buffer::Buffer;
use crate::common::TagExt;
use crate::face::FontFace;
use crate::normalize::{ShapeNormalizationMode, ShapeNormalizeContext};
use crate::plan::{ShapePlan, ShapePlanner};
use crate::{script, Direction, Script, Tag};

pub(crate) use arabic::ARABIC_SHAPER;
pub(crate) use hangul::HANGUL_SHAPER;
pub(crate) use hebrew::HEBREW_SHAPER;
pub(crate) use myanmar::{MYANMAR_SHAPER, MYANMAR_ZAWGYI_SHAPER};
pub(crate) use thai::THAI_SHAPER;

/// When marks get their advances zeroed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ZeroWidthMarksMode {
    /// Before GPOS is applied.
    Early,
    /// After GPOS is applied.
    Late,
}

/// A set of hooks a script shaper plugs into the shaping pipeline.
pub struct ComplexShaper {
    /// Shaper name, for logging.
    pub name: &'static str,

    /// Called during `shape_plan()`.
    /// Shapers should use plan.ot_map to add their features and callbacks.
    pub collect_features: Option<fn(&mut ShapePlanner)>,

    /// Called during `shape_plan()`.
    /// Shapers should use plan.ot_map to override features and add callbacks after
    /// common features are added.
    pub override_features: Option<fn(&mut ShapePlanner)>,

    /// Called at the end of `shape_plan()`.
    /// Whatever shapers return will be accessible through `plan.data()` later.
    pub create_data: Option<fn(&ShapePlan) -> Box<dyn Any + Send + Sync>>,

    /// Called during `shape()`.
    /// Shapers can use to modify text before shaping starts.
    pub preprocess_text: Option<fn(&ShapePlan, &dyn FontFace, &mut Buffer)>,

    /// Called during `shape()`.
    /// Shapers can use to modify glyphs after shaping ends.
    pub postprocess_glyphs: Option<fn(&ShapePlan, &dyn FontFace, &mut Buffer)>,

    /// How to normalize.
    pub normalization_mode: Option<ShapeNormalizationMode>,

    /// Called during `shape()`'s normalization.
    pub decompose: Option<fn(&ShapeNormalizeContext, char) -> Option<(char, char)>>,

    /// Called during `shape()`'s normalization.
    pub compose: Option<fn(&ShapeNormalizeContext, char, char) -> Option<char>>,

    /// Called during `shape()`.
    /// Shapers should use map to get feature masks and set on buffer.
    /// Shapers may NOT modify characters.
    pub setup_masks: Option<fn(&ShapePlan, &dyn FontFace, &mut Buffer)>,

    /// If not `None`, then must match found GPOS script tag for
    /// GPOS to be applied.
    pub gpos_tag: Option<Tag>,

    /// Called during `shape()`.
    /// Shapers can use to modify ordering of combining marks.
    pub reorder_marks: Option<fn(&ShapePlan, &mut Buffer, usize, usize)>,

    /// If and when to zero-width marks.
    pub zero_width_marks: Option<ZeroWidthMarksMode>,

    /// Whether to use fallback mark positioning.
    pub fallback_position: bool,
}

impl std::fmt::Debug for ComplexShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplexShaper").field("name", &self.name).finish()
    }
}

pub(crate) static DEFAULT_SHAPER: ComplexShaper = ComplexShaper {
    name: "default",
    collect_features: None,
    override_features: None,
    create_data: None,
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: Some(ShapeNormalizationMode::Auto),
    decompose: None,
    compose: None,
    setup_masks: None,
    gpos_tag: None,
    reorder_marks: None,
    zero_width_marks: Some(ZeroWidthMarksMode::Late),
    fallback_position: true,
};

// Same as default but no mark advance zeroing / fallback positioning.
// Dumbest shaper ever, basically.
pub(crate) static DUMBER_SHAPER: ComplexShaper = ComplexShaper {
    name: "dumber",
    collect_features: None,
    override_features: None,
    create_data: None,
    preprocess_text: None,
    postprocess_glyphs: None,
    normalization_mode: Some(ShapeNormalizationMode::Auto),
    decompose: None,
    compose: None,
    setup_masks: None,
    gpos_tag: None,
    reorder_marks: None,
    zero_width_marks: None,
    fallback_position: false,
};

/// Picks the shaper for a script, given the script tag the font's GSUB
/// table was queried with.
pub(crate) fn complex_categorize(
    script: Script,
    direction: Direction,
    chosen_gsub_script: Option<Tag>,
) -> &'static ComplexShaper {
    let is_default_or_latin = chosen_gsub_script == Some(Tag::default_script())
        || chosen_gsub_script == Some(Tag::from_bytes(b"latn"));

    match script {
        script::ARABIC
        | script::SYRIAC
        | script::MONGOLIAN
        | script::NKO
        | script::PHAGS_PA
        | script::MANDAIC
        | script::MANICHAEAN
        | script::PSALTER_PAHLAVI
        | script::ADLAM
        | script::HANIFI_ROHINGYA
        | script::SOGDIAN => {
            // For Arabic script, use the Arabic shaper even if no OT script tag was found.
            // Arabic shaping is applicable only to horizontal layout; for
            // vertical text, just use the generic shaper instead.
            if (chosen_gsub_script != Some(Tag::default_script()) || script == script::ARABIC)
                && direction.is_horizontal()
            {
                &ARABIC_SHAPER
            } else {
                &DEFAULT_SHAPER
            }
        }

        script::THAI | script::LAO => &THAI_SHAPER,

        script::HANGUL => &HANGUL_SHAPER,

        script::HEBREW => &HEBREW_SHAPER,

        script::MYANMAR => {
            // If the designer designed the font for the 'DFLT' script,
            // (or we ended up arbitrarily pick 'latn'), use the default shaper.
            // Otherwise, use the specific shaper.
            //
            // If designer designed for 'mymr' tag, also send to default
            // shaper. 'mymr' predates the Myanmar OpenType model, which
            // uses 'mym2'.
            if is_default_or_latin || chosen_gsub_script == Some(Tag::from_bytes(b"mymr")) {
                &DEFAULT_SHAPER
            } else {
                &MYANMAR_SHAPER
            }
        }

        // https://github.com/harfbuzz/harfbuzz/issues/1162
        script::MYANMAR_ZAWGYI => &MYANMAR_ZAWGYI_SHAPER,

        _ => &DEFAULT_SHAPER,
    }
}

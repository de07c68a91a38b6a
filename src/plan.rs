use std::any::Any;

use crate::complex::{complex_categorize, ComplexShaper, DEFAULT_SHAPER};
use crate::face::FontFace;
use crate::ot::{feature, FeatureFlags, Map, MapBuilder, TableIndex};
use crate::{Direction, Feature, Language, Mask, Script, Tag};

/// A compiled shaping plan: the chosen shaper plus the feature stages.
///
/// Plans only depend on the face, the segment properties and the user
/// features, so one plan may be reused across buffers with the same
/// properties through [`crate::shape_with_plan`].
pub struct ShapePlan {
    pub(crate) direction: Direction,
    pub(crate) script: Option<Script>,
    pub(crate) language: Option<Language>,
    pub(crate) shaper: &'static ComplexShaper,
    pub(crate) ot_map: Map,
    pub(crate) data: Option<Box<dyn Any + Send + Sync>>,
    pub(crate) user_features: Vec<Feature>,

    pub(crate) frac_mask: Mask,
    pub(crate) numr_mask: Mask,
    pub(crate) dnom_mask: Mask,
    pub(crate) rtlm_mask: Mask,

    pub(crate) has_frac: bool,
    pub(crate) has_vert: bool,
    pub(crate) zero_marks: bool,
    pub(crate) apply_gpos: bool,
}

impl ShapePlan {
    /// Returns a plan that runs the requested features.
    ///
    /// # Panics
    ///
    /// Will panic when debugging assertions are enabled if the buffer direction is invalid.
    pub fn new(
        face: &dyn FontFace,
        direction: Direction,
        script: Option<Script>,
        language: Option<&Language>,
        user_features: &[Feature],
    ) -> Self {
        debug_assert_ne!(direction, Direction::Invalid);

        let mut planner = ShapePlanner::new(face, direction, script, language);
        planner.collect_features(user_features);
        let mut plan = planner.compile(user_features);

        if let Some(func) = plan.shaper.create_data {
            plan.data = Some(func(&plan));
        }

        log::debug!(
            "shape plan for {:?}/{:?}: {} shaper, GSUB script {:?}",
            script.map(|s| s.tag()),
            direction,
            plan.shaper.name,
            plan.ot_map.chosen_script(TableIndex::GSUB),
        );

        plan
    }

    /// The name of the script shaper this plan dispatches to.
    pub fn shaper_name(&self) -> &'static str {
        self.shaper.name
    }

    /// The compiled feature map.
    pub fn ot_map(&self) -> &Map {
        &self.ot_map
    }

    /// The direction the plan was built for.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The script the plan was built for.
    pub fn script(&self) -> Option<Script> {
        self.script
    }

    /// The language the plan was built for.
    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    pub(crate) fn data<T: 'static>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|data| data.downcast_ref())
    }
}

const COMMON_FEATURES: &[(Tag, FeatureFlags)] = &[
    (feature::ABOVE_BASE_MARK_POSITIONING, FeatureFlags::GLOBAL),
    (feature::BELOW_BASE_MARK_POSITIONING, FeatureFlags::GLOBAL),
    (feature::GLYPH_COMPOSITION_DECOMPOSITION, FeatureFlags::GLOBAL),
    (feature::LOCALIZED_FORMS, FeatureFlags::GLOBAL),
    (feature::MARK_POSITIONING, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::MARK_TO_MARK_POSITIONING, FeatureFlags::GLOBAL_MANUAL_JOINERS),
    (feature::REQUIRED_LIGATURES, FeatureFlags::GLOBAL),
];

const HORIZONTAL_FEATURES: &[(Tag, FeatureFlags)] = &[
    (feature::CONTEXTUAL_ALTERNATES, FeatureFlags::GLOBAL),
    (feature::CONTEXTUAL_LIGATURES, FeatureFlags::GLOBAL),
    (feature::CURSIVE_POSITIONING, FeatureFlags::GLOBAL),
    (feature::DISTANCES, FeatureFlags::GLOBAL),
    (feature::KERNING, FeatureFlags::GLOBAL_HAS_FALLBACK),
    (feature::STANDARD_LIGATURES, FeatureFlags::GLOBAL),
    (feature::REQUIRED_CONTEXTUAL_ALTERNATES, FeatureFlags::GLOBAL),
];

/// Collects the features of a plan before they are compiled into a [`Map`].
///
/// Shapers receive the planner in their `collect_features` and
/// `override_features` hooks.
pub struct ShapePlanner<'a> {
    pub face: &'a dyn FontFace,
    pub direction: Direction,
    pub script: Option<Script>,
    pub language: Option<Language>,
    pub ot_map: MapBuilder<'a>,
    pub script_zero_marks: bool,
    pub shaper: &'static ComplexShaper,
}

impl<'a> ShapePlanner<'a> {
    pub fn new(
        face: &'a dyn FontFace,
        direction: Direction,
        script: Option<Script>,
        language: Option<&Language>,
    ) -> Self {
        let ot_map = MapBuilder::new(face, script, language);

        let shaper = match script {
            Some(script) => complex_categorize(script, direction, ot_map.chosen_script(TableIndex::GSUB)),
            None => &DEFAULT_SHAPER,
        };

        ShapePlanner {
            face,
            direction,
            script,
            language: language.cloned(),
            ot_map,
            script_zero_marks: shaper.zero_width_marks.is_some(),
            shaper,
        }
    }

    fn collect_features(&mut self, user_features: &[Feature]) {
        self.ot_map.enable_feature(feature::REQUIRED_VARIATION_ALTERNATES, FeatureFlags::empty(), 1);
        self.ot_map.add_gsub_pause(None);

        match self.direction {
            Direction::LeftToRight => {
                self.ot_map.enable_feature(feature::LEFT_TO_RIGHT_ALTERNATES, FeatureFlags::empty(), 1);
                self.ot_map.enable_feature(feature::LEFT_TO_RIGHT_MIRRORED_FORMS, FeatureFlags::empty(), 1);
            }
            Direction::RightToLeft => {
                self.ot_map.enable_feature(feature::RIGHT_TO_LEFT_ALTERNATES, FeatureFlags::empty(), 1);
                self.ot_map.add_feature(feature::RIGHT_TO_LEFT_MIRRORED_FORMS, FeatureFlags::empty(), 1);
            }
            _ => {}
        }

        // Automatic fractions.
        self.ot_map.add_feature(feature::FRACTIONS, FeatureFlags::empty(), 1);
        self.ot_map.add_feature(feature::NUMERATORS, FeatureFlags::empty(), 1);
        self.ot_map.add_feature(feature::DENOMINATORS, FeatureFlags::empty(), 1);

        // Random!
        self.ot_map.enable_feature(feature::RANDOMIZE, FeatureFlags::RANDOM, Map::MAX_VALUE);

        if let Some(func) = self.shaper.collect_features {
            func(self);
        }

        for &(tag, flags) in COMMON_FEATURES {
            self.ot_map.add_feature(tag, flags, 1);
        }

        if self.direction.is_horizontal() {
            for &(tag, flags) in HORIZONTAL_FEATURES {
                self.ot_map.add_feature(tag, flags, 1);
            }
        } else {
            // We really want to find a 'vert' feature if there's any in the font, no
            // matter which script/langsys it is listed (or not) under.
            // See various bugs referenced from:
            // https://github.com/harfbuzz/harfbuzz/issues/63
            self.ot_map.enable_feature(feature::VERTICAL_WRITING, FeatureFlags::GLOBAL_SEARCH, 1);
        }

        for feature in user_features {
            let flags = if feature.is_global() { FeatureFlags::GLOBAL } else { FeatureFlags::empty() };
            self.ot_map.add_feature(feature.tag, flags, feature.value);
        }

        if let Some(func) = self.shaper.override_features {
            func(self);
        }
    }

    fn compile(&mut self, user_features: &[Feature]) -> ShapePlan {
        let ot_map = self.ot_map.compile();

        let frac_mask = ot_map.one_mask(feature::FRACTIONS);
        let numr_mask = ot_map.one_mask(feature::NUMERATORS);
        let dnom_mask = ot_map.one_mask(feature::DENOMINATORS);
        let has_frac = frac_mask != 0 || (numr_mask != 0 && dnom_mask != 0);

        let rtlm_mask = ot_map.one_mask(feature::RIGHT_TO_LEFT_MIRRORED_FORMS);
        let has_vert = ot_map.one_mask(feature::VERTICAL_WRITING) != 0;

        // https://github.com/harfbuzz/harfbuzz/issues/347#issuecomment-267838368
        let apply_gpos = self.shaper.gpos_tag.is_none()
            || self.shaper.gpos_tag == ot_map.chosen_script(TableIndex::GPOS);

        ShapePlan {
            direction: self.direction,
            script: self.script,
            language: self.language.clone(),
            shaper: self.shaper,
            ot_map,
            data: None,
            user_features: user_features.to_vec(),
            frac_mask,
            numr_mask,
            dnom_mask,
            rtlm_mask,
            has_frac,
            has_vert,
            zero_marks: self.script_zero_marks,
            apply_gpos,
        }
    }
}

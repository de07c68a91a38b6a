use crate::buffer::{glyph_flag, Buffer};
use crate::face::FontFace;
use crate::plan::ShapePlan;
use crate::{Language, Mask, Script, Tag};

use super::{select_script, script_tags, TableIndex};

/// A callback invoked between two feature stages.
pub type PauseFunc = fn(&ShapePlan, &dyn FontFace, &mut Buffer);

/// Features compiled for one shape plan, grouped into per-table stages.
pub struct Map {
    chosen_script: [Option<Tag>; 2],
    found_script: [bool; 2],
    global_mask: Mask,
    features: Vec<FeatureMap>,
    stages: [Vec<StageMap>; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FeatureMap {
    tag: Tag,
    // sequence#, registration order
    seq: usize,
    // GSUB/GPOS
    found: [bool; 2],
    stage: [usize; 2],
    shift: u32,
    mask: Mask,
    // mask for value=1, for quick access
    one_mask: Mask,
    flags: FeatureFlags,
}

/// A feature applied during one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageFeature {
    /// The feature tag.
    pub tag: Tag,
    /// Glyphs whose mask intersects this one receive the feature.
    pub mask: Mask,
    /// Skip ZWNJ when matching context.
    pub auto_zwnj: bool,
    /// Skip ZWJ when matching input.
    pub auto_zwj: bool,
    /// Pick alternates randomly.
    pub random: bool,
    /// Lookups must not cross syllable boundaries.
    pub per_syllable: bool,
}

/// One stage: the features applied together, then an optional pause.
#[derive(Clone, Debug)]
pub struct StageMap {
    /// Features in registration order.
    pub features: Vec<StageFeature>,
    /// Called after the features were applied.
    pub pause_func: Option<PauseFunc>,
}

impl Map {
    pub const MAX_BITS: u32 = 8;
    pub const MAX_VALUE: u32 = (1 << Self::MAX_BITS) - 1;

    #[inline]
    pub fn chosen_script(&self, table_index: TableIndex) -> Option<Tag> {
        self.chosen_script[table_index as usize]
    }

    #[inline]
    pub fn found_script(&self, table_index: TableIndex) -> bool {
        self.found_script[table_index as usize]
    }

    #[inline]
    pub fn global_mask(&self) -> Mask {
        self.global_mask
    }

    #[inline]
    pub fn mask(&self, feature_tag: Tag) -> (Mask, u32) {
        self.features
            .binary_search_by_key(&feature_tag, |f| f.tag)
            .map_or((0, 0), |idx| (self.features[idx].mask, self.features[idx].shift))
    }

    #[inline]
    pub fn one_mask(&self, feature_tag: Tag) -> Mask {
        self.features
            .binary_search_by_key(&feature_tag, |f| f.tag)
            .map_or(0, |idx| self.features[idx].one_mask)
    }

    /// Whether the font provides `feature_tag` in the given table.
    #[inline]
    pub fn has_feature(&self, table_index: TableIndex, feature_tag: Tag) -> bool {
        self.features
            .binary_search_by_key(&feature_tag, |f| f.tag)
            .map_or(false, |idx| self.features[idx].found[table_index as usize])
    }

    #[inline]
    pub fn stages(&self, table_index: TableIndex) -> &[StageMap] {
        &self.stages[table_index as usize]
    }

    /// Tags of every feature that got a mask, in tag order.
    pub fn feature_tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.features.iter().map(|f| f.tag)
    }
}

bitflags::bitflags! {
    /// Flags controlling how a feature is allocated and applied.
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
    pub struct FeatureFlags: u32 {
        /// Feature applies to all characters; results in no mask allocated for it.
        const GLOBAL = 0x01;
        /// Has fallback implementation, so include mask bit even if feature not found.
        const HAS_FALLBACK = 0x02;
        /// Don't skip over ZWNJ when matching **context**.
        const MANUAL_ZWNJ = 0x04;
        /// Don't skip over ZWJ when matching **input**.
        const MANUAL_ZWJ = 0x08;
        const MANUAL_JOINERS = Self::MANUAL_ZWNJ.bits() | Self::MANUAL_ZWJ.bits();
        const GLOBAL_MANUAL_JOINERS = Self::GLOBAL.bits() | Self::MANUAL_JOINERS.bits();
        const GLOBAL_HAS_FALLBACK = Self::GLOBAL.bits() | Self::HAS_FALLBACK.bits();
        /// If feature not found in LangSys, look for it in global feature list and pick one.
        const GLOBAL_SEARCH = 0x10;
        /// Randomly select a glyph from an AlternateSubstFormat1 subtable.
        const RANDOM = 0x20;
        /// Do not skip over, or match across, syllable boundaries.
        const PER_SYLLABLE = 0x40;
    }
}

#[derive(Clone, Copy, Debug)]
struct FeatureInfo {
    tag: Tag,
    // sequence#, used for stable sorting only
    seq: usize,
    max_value: u32,
    flags: FeatureFlags,
    // for non-global features, what should the unset glyphs take
    default_value: u32,
    // GSUB/GPOS
    stage: [usize; 2],
}

struct StageInfo {
    index: usize,
    pause_func: Option<PauseFunc>,
}

/// Collects feature requests and pauses, then compiles them into a [`Map`].
pub struct MapBuilder<'a> {
    face: &'a dyn FontFace,
    chosen_script: [Option<Tag>; 2],
    found_script: [bool; 2],
    current_stage: [usize; 2],
    feature_infos: Vec<FeatureInfo>,
    stages: [Vec<StageInfo>; 2],
}

impl<'a> MapBuilder<'a> {
    pub fn new(face: &'a dyn FontFace, script: Option<Script>, _language: Option<&Language>) -> Self {
        // Fetch script tags for GSUB/GPOS. We need these later to skip
        // features not available in either table and not waste precious bits for them.
        let tags = script_tags(script);

        let mut chosen_script = [None; 2];
        let mut found_script = [false; 2];

        for table_index in TableIndex::iter() {
            let (chosen, found) = select_script(face, table_index, &tags);
            chosen_script[table_index as usize] = chosen;
            found_script[table_index as usize] = found;
        }

        Self {
            face,
            chosen_script,
            found_script,
            current_stage: [0, 0],
            feature_infos: Vec::new(),
            stages: [Vec::new(), Vec::new()],
        }
    }

    #[inline]
    pub fn chosen_script(&self, table_index: TableIndex) -> Option<Tag> {
        self.chosen_script[table_index as usize]
    }

    pub fn add_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        if tag.is_null() {
            return;
        }

        let seq = self.feature_infos.len() + 1;
        self.feature_infos.push(FeatureInfo {
            tag,
            seq,
            max_value: value,
            flags,
            default_value: if flags.contains(FeatureFlags::GLOBAL) { value } else { 0 },
            stage: self.current_stage,
        });
    }

    #[inline]
    pub fn enable_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        self.add_feature(tag, flags | FeatureFlags::GLOBAL, value);
    }

    #[inline]
    pub fn disable_feature(&mut self, tag: Tag) {
        self.add_feature(tag, FeatureFlags::GLOBAL, 0);
    }

    #[inline]
    pub fn add_gsub_pause(&mut self, pause: Option<PauseFunc>) {
        self.add_pause(TableIndex::GSUB, pause);
    }

    #[inline]
    pub fn add_gpos_pause(&mut self, pause: Option<PauseFunc>) {
        self.add_pause(TableIndex::GPOS, pause);
    }

    fn add_pause(&mut self, table_index: TableIndex, pause: Option<PauseFunc>) {
        self.stages[table_index as usize].push(StageInfo {
            index: self.current_stage[table_index as usize],
            pause_func: pause,
        });

        self.current_stage[table_index as usize] += 1;
    }

    fn find_feature(&self, table_index: TableIndex, tag: Tag, flags: FeatureFlags) -> bool {
        let chosen = self.chosen_script[table_index as usize];
        if chosen.is_some() && self.face.has_feature(table_index, chosen, tag) {
            return true;
        }

        flags.contains(FeatureFlags::GLOBAL_SEARCH) && self.face.has_feature(table_index, None, tag)
    }

    pub fn compile(&mut self) -> Map {
        let global_bit_mask = glyph_flag::DEFINED + 1;
        let global_bit_shift = glyph_flag::DEFINED.count_ones();

        let mut map = Map {
            chosen_script: self.chosen_script,
            found_script: self.found_script,
            global_mask: global_bit_mask,
            features: Vec::new(),
            stages: [Vec::new(), Vec::new()],
        };

        // Sort features and merge duplicates.
        self.feature_infos.sort_by_key(|info| (info.tag, info.seq));

        if !self.feature_infos.is_empty() {
            let feature_infos = &mut self.feature_infos;
            let mut j = 0;
            for i in 1..feature_infos.len() {
                if feature_infos[i].tag != feature_infos[j].tag {
                    j += 1;
                    feature_infos[j] = feature_infos[i];
                } else {
                    if feature_infos[i].flags.contains(FeatureFlags::GLOBAL) {
                        feature_infos[j].flags |= FeatureFlags::GLOBAL;
                        feature_infos[j].max_value = feature_infos[i].max_value;
                        feature_infos[j].default_value = feature_infos[i].default_value;
                    } else {
                        if feature_infos[j].flags.contains(FeatureFlags::GLOBAL) {
                            feature_infos[j].flags ^= FeatureFlags::GLOBAL;
                        }
                        feature_infos[j].max_value =
                            feature_infos[j].max_value.max(feature_infos[i].max_value);
                        // Inherit default_value from j
                    }
                    let f = feature_infos[i].flags & FeatureFlags::HAS_FALLBACK;
                    feature_infos[j].flags |= f;
                    feature_infos[j].stage[0] = feature_infos[j].stage[0].min(feature_infos[i].stage[0]);
                    feature_infos[j].stage[1] = feature_infos[j].stage[1].min(feature_infos[i].stage[1]);
                }
            }

            feature_infos.truncate(j + 1);
        }

        // Allocate bits now.
        let mut next_bit = global_bit_shift + 1;

        for info in &self.feature_infos {
            let bits_needed = if info.flags.contains(FeatureFlags::GLOBAL) && info.max_value == 1 {
                // Uses the global bit.
                0
            } else {
                // Limit bits per feature.
                let bit_storage = |v: u32| u32::BITS - v.leading_zeros();
                Map::MAX_BITS.min(bit_storage(info.max_value))
            };

            if info.max_value == 0 || next_bit + bits_needed > Mask::BITS {
                // Feature disabled, or not enough bits.
                continue;
            }

            let found = [
                self.find_feature(TableIndex::GSUB, info.tag, info.flags),
                self.find_feature(TableIndex::GPOS, info.tag, info.flags),
            ];

            if !found.contains(&true) && !info.flags.contains(FeatureFlags::HAS_FALLBACK) {
                log::trace!("feature {:?} not found in font", info.tag);
                continue;
            }

            let (shift, mask) = if info.flags.contains(FeatureFlags::GLOBAL) && info.max_value == 1 {
                // Uses the global bit
                (global_bit_shift, global_bit_mask)
            } else {
                let shift = next_bit;
                let mask = (1 << (next_bit + bits_needed)) - (1 << next_bit);
                next_bit += bits_needed;
                map.global_mask |= (info.default_value << shift) & mask;
                (shift, mask)
            };

            map.features.push(FeatureMap {
                tag: info.tag,
                seq: info.seq,
                found,
                stage: info.stage,
                shift,
                mask,
                one_mask: (1 << shift) & mask,
                flags: info.flags,
            });
        }

        // Done with these.
        self.feature_infos.clear();

        self.add_gsub_pause(None);
        self.add_gpos_pause(None);

        for table_index in TableIndex::iter() {
            let t = table_index as usize;
            let mut stage_index = 0;

            for stage in 0..self.current_stage[t] {
                let mut features: Vec<&FeatureMap> = map
                    .features
                    .iter()
                    .filter(|f| f.stage[t] == stage && f.found[t])
                    .collect();
                features.sort_by_key(|f| f.seq);

                let features = features
                    .into_iter()
                    .map(|f| StageFeature {
                        tag: f.tag,
                        mask: f.mask,
                        auto_zwnj: !f.flags.contains(FeatureFlags::MANUAL_ZWNJ),
                        auto_zwj: !f.flags.contains(FeatureFlags::MANUAL_ZWJ),
                        random: f.flags.contains(FeatureFlags::RANDOM),
                        per_syllable: f.flags.contains(FeatureFlags::PER_SYLLABLE),
                    })
                    .collect();

                let mut pause_func = None;
                if stage_index < self.stages[t].len() && self.stages[t][stage_index].index == stage {
                    pause_func = self.stages[t][stage_index].pause_func;
                    stage_index += 1;
                }

                map.stages[t].push(StageMap { features, pause_func });
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::FontFace;
    use crate::GlyphId;

    struct AllFeatures;

    impl FontFace for AllFeatures {
        fn glyph_index(&self, _: char) -> Option<GlyphId> {
            None
        }

        fn glyph_advance(&self, _: GlyphId, _: bool) -> i32 {
            0
        }

        fn has_script(&self, _: TableIndex, tag: Tag) -> bool {
            tag == Tag::from_bytes(b"latn")
        }

        fn has_feature(&self, table: TableIndex, _: Option<Tag>, _: Tag) -> bool {
            table == TableIndex::GSUB
        }
    }

    fn pause(_: &ShapePlan, _: &dyn FontFace, _: &mut Buffer) {}

    #[test]
    fn global_features_share_the_global_bit() {
        let face = AllFeatures;
        let mut builder = MapBuilder::new(&face, None, None);
        builder.enable_feature(Tag::from_bytes(b"liga"), FeatureFlags::empty(), 1);
        builder.enable_feature(Tag::from_bytes(b"calt"), FeatureFlags::empty(), 1);
        let map = builder.compile();

        let global = map.global_mask();
        assert_eq!(map.one_mask(Tag::from_bytes(b"liga")), global);
        assert_eq!(map.one_mask(Tag::from_bytes(b"calt")), global);
        assert_eq!(map.chosen_script(TableIndex::GSUB), Some(Tag::from_bytes(b"latn")));
        assert!(!map.found_script(TableIndex::GSUB));
    }

    #[test]
    fn non_global_features_get_own_bits() {
        let face = AllFeatures;
        let mut builder = MapBuilder::new(&face, None, None);
        builder.add_feature(Tag::from_bytes(b"init"), FeatureFlags::empty(), 1);
        builder.add_feature(Tag::from_bytes(b"aalt"), FeatureFlags::empty(), 3);
        let map = builder.compile();

        let (init, _) = map.mask(Tag::from_bytes(b"init"));
        let (aalt, shift) = map.mask(Tag::from_bytes(b"aalt"));
        assert_eq!(init.count_ones(), 1);
        assert_eq!(aalt.count_ones(), 2);
        assert_eq!(init & aalt, 0);
        assert_eq!(aalt >> shift, 0b11);
    }

    #[test]
    fn pauses_split_stages() {
        let face = AllFeatures;
        let mut builder = MapBuilder::new(&face, None, None);
        builder.add_gsub_pause(Some(pause));
        builder.enable_feature(Tag::from_bytes(b"locl"), FeatureFlags::empty(), 1);
        builder.enable_feature(Tag::from_bytes(b"ccmp"), FeatureFlags::empty(), 1);
        builder.add_gsub_pause(None);
        builder.enable_feature(Tag::from_bytes(b"rphf"), FeatureFlags::MANUAL_ZWJ, 1);
        let map = builder.compile();

        let stages = map.stages(TableIndex::GSUB);
        assert_eq!(stages.len(), 3);
        assert!(stages[0].features.is_empty());
        assert!(stages[0].pause_func.is_some());
        let tags: Vec<Tag> = stages[1].features.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![Tag::from_bytes(b"locl"), Tag::from_bytes(b"ccmp")]);
        assert!(!stages[2].features[0].auto_zwj);
        assert!(map.stages(TableIndex::GPOS).iter().all(|s| s.features.is_empty()));
    }

    #[test]
    fn disabled_features_get_no_mask() {
        let face = AllFeatures;
        let mut builder = MapBuilder::new(&face, None, None);
        builder.enable_feature(Tag::from_bytes(b"liga"), FeatureFlags::empty(), 1);
        builder.disable_feature(Tag::from_bytes(b"liga"));
        let map = builder.compile();
        assert_eq!(map.one_mask(Tag::from_bytes(b"liga")), 0);
    }
}

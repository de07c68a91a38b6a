use std::fmt::Write as _;

use bitflags::bitflags;

use crate::unicode::{self, UnicodeProps};
use crate::{script, Direction, Language, Mask, Script};

pub(crate) mod glyph_flag {
    /// Breaking the text before this glyph requires reshaping both sides.
    pub const UNSAFE_TO_BREAK: u32 = 0x0000_0001;
    /// Concatenating independently shaped text at this glyph is not safe.
    pub const UNSAFE_TO_CONCAT: u32 = 0x0000_0002;
    pub const DEFINED: u32 = 0x0000_0003;
}

/// `GlyphPosition` holds the positions of the glyph in both horizontal and
/// vertical directions. All positions are relative to the current point.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct GlyphPosition {
    /// How much the line advances after drawing this glyph when setting text in
    /// horizontal direction.
    pub x_advance: i32,
    /// How much the line advances after drawing this glyph when setting text in
    /// vertical direction.
    pub y_advance: i32,
    /// How much the glyph moves on the X-axis before drawing it, this should not
    /// affect how much the line advances.
    pub x_offset: i32,
    /// How much the glyph moves on the Y-axis before drawing it, this should
    /// not affect how much the line advances.
    pub y_offset: i32,
}

/// A glyph info.
///
/// Before glyph mapping `glyph_id` holds the Unicode code point.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug)]
pub struct GlyphInfo {
    /// Code point before glyph mapping, glyph id afterwards.
    pub glyph_id: u32,
    /// The index of the source character (byte offset for UTF-8 input).
    pub cluster: u32,
    pub(crate) mask: Mask,
    // [unicode props, combining class, unused, syllable]
    pub(crate) var1: u32,
    // [unused, unused, script category, script position/action]
    pub(crate) var2: u32,
}

impl GlyphInfo {
    pub(crate) fn new(c: char, cluster: u32) -> Self {
        GlyphInfo {
            glyph_id: c as u32,
            cluster,
            ..GlyphInfo::default()
        }
    }

    /// Indicates that the text could not be broken before this glyph
    /// without reshaping both sides.
    #[inline]
    pub fn unsafe_to_break(&self) -> bool {
        self.mask & glyph_flag::UNSAFE_TO_BREAK != 0
    }

    /// Indicates that independently shaped runs can't be joined at this glyph.
    #[inline]
    pub fn unsafe_to_concat(&self) -> bool {
        self.mask & glyph_flag::UNSAFE_TO_CONCAT != 0
    }

    /// The feature mask; a feature applies where it intersects the stage mask.
    #[inline]
    pub fn mask(&self) -> Mask {
        self.mask
    }

    #[inline]
    pub(crate) fn as_char(&self) -> char {
        char::from_u32(self.glyph_id).unwrap_or('\u{FFFD}')
    }

    #[inline]
    fn var1_bytes(&self) -> &[u8; 4] {
        bytemuck::cast_ref(&self.var1)
    }

    #[inline]
    fn var1_bytes_mut(&mut self) -> &mut [u8; 4] {
        bytemuck::cast_mut(&mut self.var1)
    }

    #[inline]
    fn var2_bytes(&self) -> &[u8; 4] {
        bytemuck::cast_ref(&self.var2)
    }

    #[inline]
    fn var2_bytes_mut(&mut self) -> &mut [u8; 4] {
        bytemuck::cast_mut(&mut self.var2)
    }

    #[inline]
    pub(crate) fn unicode_props(&self) -> UnicodeProps {
        UnicodeProps::from_bits_truncate(self.var1_bytes()[0])
    }

    pub(crate) fn init_unicode_props(&mut self) {
        let c = self.as_char();
        let props = unicode::props_for(c);
        let ccc = if props.contains(UnicodeProps::MARK) {
            unicode::combining_class(c)
        } else {
            0
        };

        let v = self.var1_bytes_mut();
        v[0] = props.bits();
        v[1] = ccc;
    }

    #[inline]
    pub(crate) fn combining_class(&self) -> u8 {
        self.var1_bytes()[1]
    }

    #[inline]
    pub(crate) fn set_combining_class(&mut self, ccc: u8) {
        self.var1_bytes_mut()[1] = ccc;
    }

    #[inline]
    pub(crate) fn is_mark(&self) -> bool {
        self.unicode_props().contains(UnicodeProps::MARK)
    }

    #[inline]
    pub(crate) fn is_zwj(&self) -> bool {
        self.unicode_props().contains(UnicodeProps::ZWJ)
    }

    #[inline]
    pub(crate) fn is_zwnj(&self) -> bool {
        self.unicode_props().contains(UnicodeProps::ZWNJ)
    }

    #[inline]
    pub(crate) fn is_default_ignorable(&self) -> bool {
        let props = self.unicode_props();
        props.contains(UnicodeProps::IGNORABLE) && !props.contains(UnicodeProps::HIDDEN)
    }

    #[inline]
    pub(crate) fn is_continuation(&self) -> bool {
        self.unicode_props().contains(UnicodeProps::CONTINUATION)
    }

    #[inline]
    pub(crate) fn syllable(&self) -> u8 {
        self.var1_bytes()[3]
    }

    #[inline]
    pub(crate) fn set_syllable(&mut self, syllable: u8) {
        self.var1_bytes_mut()[3] = syllable;
    }

    #[inline]
    pub(crate) fn complex_category(&self) -> u8 {
        self.var2_bytes()[2]
    }

    #[inline]
    pub(crate) fn set_complex_category(&mut self, c: u8) {
        self.var2_bytes_mut()[2] = c;
    }

    #[inline]
    pub(crate) fn complex_aux(&self) -> u8 {
        self.var2_bytes()[3]
    }

    #[inline]
    pub(crate) fn set_complex_aux(&mut self, c: u8) {
        self.var2_bytes_mut()[3] = c;
    }
}

bitflags! {
    /// Flags for buffers.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferFlags: u32 {
        /// Indicates that special handling of the beginning of text paragraph can be applied to this buffer.
        const BEGINNING_OF_TEXT             = 1 << 1;
        /// Indicates that special handling of the end of text paragraph can be applied to this buffer.
        const END_OF_TEXT                   = 1 << 2;
        /// Indicates that characters with `Default_Ignorable` Unicode property should use the
        /// corresponding glyph from the font, instead of hiding them.
        const PRESERVE_DEFAULT_IGNORABLES   = 1 << 3;
        /// Indicates that characters with `Default_Ignorable` Unicode property should be removed.
        const REMOVE_DEFAULT_IGNORABLES     = 1 << 4;
        /// Indicates that a dotted circle should not be inserted in the rendering of incorrect
        /// character sequences (such as `<0905 093E>`).
        const DO_NOT_INSERT_DOTTED_CIRCLE   = 1 << 5;
    }
}

/// Cluster merging policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferClusterLevel {
    /// Marks and joiners join the cluster of their base.
    #[default]
    MonotoneGraphemes,
    /// Every character starts its own cluster, clusters stay monotone.
    MonotoneCharacters,
    /// Clusters are never merged, glyphs get unsafe-to-break flags instead.
    Characters,
}

/// The working glyph buffer shared by the shaping pipeline.
#[derive(Clone, Debug, Default)]
pub struct Buffer {
    pub(crate) flags: BufferFlags,
    pub(crate) cluster_level: BufferClusterLevel,
    pub(crate) direction: Direction,
    pub(crate) script: Option<Script>,
    pub(crate) language: Option<Language>,

    pub(crate) info: Vec<GlyphInfo>,
    pub(crate) pos: Vec<GlyphPosition>,

    out_info: Vec<GlyphInfo>,
    have_output: bool,
    pub(crate) idx: usize,
}

impl Buffer {
    pub(crate) fn new() -> Self {
        Buffer::default()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.info.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub(crate) fn add(&mut self, c: char, cluster: u32) {
        self.info.push(GlyphInfo::new(c, cluster));
    }

    pub(crate) fn clear(&mut self) {
        self.info.clear();
        self.pos.clear();
        self.out_info.clear();
        self.have_output = false;
        self.idx = 0;
        self.direction = Direction::Invalid;
        self.script = None;
        self.language = None;
    }

    #[inline]
    pub(crate) fn cur(&self, i: usize) -> &GlyphInfo {
        &self.info[self.idx + i]
    }

    #[inline]
    pub(crate) fn cur_mut(&mut self, i: usize) -> &mut GlyphInfo {
        let idx = self.idx + i;
        &mut self.info[idx]
    }

    #[inline]
    pub(crate) fn out_len(&self) -> usize {
        if self.have_output {
            self.out_info.len()
        } else {
            self.idx
        }
    }

    /// Starts an output pass: glyphs are copied from `info` into a fresh
    /// output array with `next_glyph`/`output_info`, then swapped back by `sync`.
    pub(crate) fn clear_output(&mut self) {
        self.have_output = true;
        self.out_info.clear();
        self.idx = 0;
    }

    pub(crate) fn next_glyph(&mut self) {
        if self.have_output {
            self.out_info.push(self.info[self.idx]);
        }

        self.idx += 1;
    }

    pub(crate) fn output_info(&mut self, info: GlyphInfo) {
        self.out_info.push(info);
    }

    /// Replaces the current character by `c`, keeping its cluster and mask.
    pub(crate) fn output_char(&mut self, c: char) {
        let mut info = self.info[self.idx];
        info.glyph_id = c as u32;
        info.init_unicode_props();
        self.out_info.push(info);
    }

    /// Consumes `num_in` glyphs and outputs `glyph_data` in their place.
    ///
    /// The new glyphs take the mask and the smallest cluster of the
    /// consumed ones.
    pub(crate) fn replace_glyphs(&mut self, num_in: usize, glyph_data: &[char]) {
        self.merge_clusters(self.idx, self.idx + num_in);

        let orig_info = self.info[self.idx];
        for &c in glyph_data {
            let mut info = orig_info;
            info.glyph_id = c as u32;
            info.init_unicode_props();
            self.out_info.push(info);
        }

        self.idx += num_in;
    }

    #[inline]
    pub(crate) fn out_info_mut(&mut self) -> &mut [GlyphInfo] {
        if self.have_output {
            &mut self.out_info
        } else {
            &mut self.info
        }
    }

    /// Merges the clusters of `start..end` of the output array.
    pub(crate) fn merge_out_clusters(&mut self, start: usize, end: usize) {
        if end.saturating_sub(start) < 2 || self.cluster_level == BufferClusterLevel::Characters {
            return;
        }

        let cluster = self.out_info[start..end]
            .iter()
            .map(|info| info.cluster)
            .min()
            .unwrap_or(0);

        let mut start = start;
        while start != 0 && self.out_info[start - 1].cluster == self.out_info[start].cluster {
            start -= 1;
        }

        let mut end = end;
        while end < self.out_info.len() && self.out_info[end - 1].cluster == self.out_info[end].cluster {
            end += 1;
        }

        // If we hit the end of out-buffer, continue in buffer.
        if end == self.out_info.len() {
            let end_cluster = self.out_info[end - 1].cluster;
            let mut i = self.idx;
            while i < self.len() && self.info[i].cluster == end_cluster {
                self.info[i].cluster = cluster;
                i += 1;
            }
        }

        for info in &mut self.out_info[start..end] {
            info.cluster = cluster;
        }
    }

    /// Like `unsafe_to_break`, for a range starting at `start` in the output
    /// array and ending at `end` in the input array.
    pub(crate) fn unsafe_to_break_from_outbuffer(&mut self, start: usize, end: usize) {
        let out_cluster = self.out_info[start..].iter().map(|info| info.cluster).min();
        let in_cluster = self.info[self.idx..end].iter().map(|info| info.cluster).min();
        let Some(cluster) = out_cluster.into_iter().chain(in_cluster).min() else {
            return;
        };

        let flags = glyph_flag::UNSAFE_TO_BREAK | glyph_flag::UNSAFE_TO_CONCAT;
        for info in &mut self.out_info[start..] {
            if info.cluster != cluster {
                info.mask |= flags;
            }
        }
        for info in &mut self.info[self.idx..end] {
            if info.cluster != cluster {
                info.mask |= flags;
            }
        }
    }

    /// Skips the current glyph without copying it to the output.
    pub(crate) fn skip_glyph(&mut self) {
        self.idx += 1;
    }

    pub(crate) fn sync(&mut self) {
        if self.have_output {
            let rest = self.info.get(self.idx..).unwrap_or(&[]);
            self.out_info.extend_from_slice(rest);
            std::mem::swap(&mut self.info, &mut self.out_info);
            self.out_info.clear();
        }

        self.have_output = false;
        self.idx = 0;
    }

    pub(crate) fn next_syllable(&self, mut start: usize) -> usize {
        if start >= self.len() {
            return start;
        }

        let syllable = self.info[start].syllable();
        start += 1;
        while start < self.len() && syllable == self.info[start].syllable() {
            start += 1;
        }

        start
    }

    /// Returns the end of the grapheme starting at `start`.
    pub(crate) fn next_grapheme(&self, start: usize) -> usize {
        let mut end = start + 1;
        while end < self.len() && self.info[end].is_continuation() {
            end += 1;
        }

        end
    }

    /// Removes every glyph matching `filter`, handing its cluster to a neighbour.
    pub(crate) fn delete_glyphs_inplace(&mut self, filter: impl Fn(&GlyphInfo) -> bool) {
        let len = self.len();
        let has_pos = self.pos.len() == len;
        let mut j = 0;

        for i in 0..len {
            if filter(&self.info[i]) {
                let cluster = self.info[i].cluster;
                if i + 1 < len && cluster == self.info[i + 1].cluster {
                    // Cluster survives; do nothing.
                    continue;
                }

                if j != 0 {
                    // Merge cluster backward.
                    if cluster < self.info[j - 1].cluster {
                        let old_cluster = self.info[j - 1].cluster;
                        let mut k = j;
                        while k > 0 && self.info[k - 1].cluster == old_cluster {
                            self.info[k - 1].cluster = cluster;
                            k -= 1;
                        }
                    }
                    continue;
                }

                if i + 1 < len {
                    // Merge cluster forward.
                    self.merge_clusters(i, i + 2);
                }

                continue;
            }

            if j != i {
                self.info[j] = self.info[i];
                if has_pos {
                    self.pos[j] = self.pos[i];
                }
            }
            j += 1;
        }

        self.info.truncate(j);
        if has_pos {
            self.pos.truncate(j);
        }
    }

    /// Resets every position, growing the position array to the glyph count.
    pub(crate) fn clear_positions(&mut self) {
        self.pos.clear();
        self.pos.resize(self.info.len(), GlyphPosition::default());
    }

    pub(crate) fn reset_masks(&mut self, mask: Mask) {
        for info in &mut self.info {
            info.mask = mask;
        }
    }

    pub(crate) fn set_masks(&mut self, mut value: Mask, mask: Mask, cluster_start: u32, cluster_end: u32) {
        if mask == 0 {
            return;
        }

        let not_mask = !mask;
        value &= mask;

        if cluster_start == 0 && cluster_end == u32::MAX {
            for info in &mut self.info {
                info.mask = (info.mask & not_mask) | value;
            }

            return;
        }

        for info in &mut self.info {
            if cluster_start <= info.cluster && info.cluster < cluster_end {
                info.mask = (info.mask & not_mask) | value;
            }
        }
    }

    /// Marks every glyph in `start..end` whose cluster differs from the
    /// range's first cluster as unsafe to break before.
    pub(crate) fn unsafe_to_break(&mut self, start: usize, end: usize) {
        if end.saturating_sub(start) < 2 {
            return;
        }

        let cluster = self.info[start..end]
            .iter()
            .map(|info| info.cluster)
            .min()
            .unwrap_or(0);

        for info in &mut self.info[start..end] {
            if info.cluster != cluster {
                info.mask |= glyph_flag::UNSAFE_TO_BREAK | glyph_flag::UNSAFE_TO_CONCAT;
            }
        }
    }

    pub(crate) fn merge_clusters(&mut self, start: usize, end: usize) {
        if end.saturating_sub(start) < 2 {
            return;
        }

        self.merge_clusters_impl(start, end)
    }

    fn merge_clusters_impl(&mut self, mut start: usize, mut end: usize) {
        if self.cluster_level == BufferClusterLevel::Characters {
            self.unsafe_to_break(start, end);
            return;
        }

        let mut cluster = self.info[start].cluster;
        for i in start + 1..end {
            cluster = cluster.min(self.info[i].cluster);
        }

        // Extend end.
        while end < self.len() && self.info[end - 1].cluster == self.info[end].cluster {
            end += 1;
        }

        // Extend start.
        while self.idx < start && self.info[start - 1].cluster == self.info[start].cluster {
            start -= 1;
        }

        // If we hit the start of buffer, continue in out-buffer.
        if self.have_output && self.idx == start {
            let start_cluster = self.info[start].cluster;
            let mut i = self.out_info.len();
            while i != 0 && self.out_info[i - 1].cluster == start_cluster {
                self.out_info[i - 1].cluster = cluster;
                i -= 1;
            }
        }

        for info in &mut self.info[start..end] {
            info.cluster = cluster;
        }
    }

    /// Stable insertion sort of `start..end`; `greater(a, b)` returns `true`
    /// when `a` must come after `b`. Moved glyphs merge their clusters.
    pub(crate) fn sort(&mut self, start: usize, end: usize, greater: impl Fn(&GlyphInfo, &GlyphInfo) -> bool) {
        for i in start + 1..end {
            let mut j = i;
            while j > start && greater(&self.info[j - 1], &self.info[i]) {
                j -= 1;
            }

            if i == j {
                continue;
            }

            // Move item i to occupy place for item j, shift what's in between.
            self.merge_clusters(j, i + 1);

            let t = self.info[i];
            self.info.copy_within(j..i, j + 1);
            self.info[j] = t;
        }
    }

    pub(crate) fn reverse_range(&mut self, start: usize, end: usize) {
        if end.saturating_sub(start) < 2 {
            return;
        }

        self.info[start..end].reverse();
        if self.pos.len() == self.info.len() {
            self.pos[start..end].reverse();
        }
    }

    pub(crate) fn reverse(&mut self) {
        let len = self.len();
        self.reverse_range(0, len);
    }

    /// Reverses the buffer while keeping the glyph order inside each
    /// grapheme (as delimited by continuation characters).
    pub(crate) fn reverse_graphemes(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }

        let mut start = 0;
        for i in 1..=len {
            if i == len || !self.info[i].is_continuation() {
                self.reverse_range(start, i);
                start = i;
            }
        }

        self.reverse();
    }

    pub(crate) fn guess_segment_properties(&mut self) {
        if self.script.is_none() {
            for info in &self.info {
                let s = unicode::script_from_char(info.as_char());
                if s != script::COMMON && s != script::INHERITED && s != script::UNKNOWN {
                    self.script = Some(s);
                    break;
                }
            }
        }

        if self.direction == Direction::Invalid {
            if let Some(script) = self.script {
                self.direction = Direction::from_script(script).unwrap_or_default();
            }

            if self.direction == Direction::Invalid {
                self.direction = Direction::LeftToRight;
            }
        }
    }

    /// Makes every glyph of a cluster carry the glyph flags set on any of its members.
    pub(crate) fn propagate_flags(&mut self) {
        let len = self.len();
        let mut start = 0;
        while start < len {
            let cluster = self.info[start].cluster;
            let mut end = start + 1;
            while end < len && self.info[end].cluster == cluster {
                end += 1;
            }

            let flags = self.info[start..end]
                .iter()
                .fold(0, |acc, info| acc | (info.mask & glyph_flag::DEFINED));

            if flags != 0 {
                for info in &mut self.info[start..end] {
                    info.mask |= flags;
                }
            }

            start = end;
        }
    }
}

// Used by `FontFace::apply_feature` implementations.
impl Buffer {
    /// The glyphs in logical order.
    #[inline]
    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        &self.info
    }

    /// The glyphs in logical order, mutable.
    #[inline]
    pub fn glyph_infos_mut(&mut self) -> &mut [GlyphInfo] {
        &mut self.info
    }

    /// Glyph positions. Empty until advances were assigned.
    #[inline]
    pub fn glyph_positions_mut(&mut self) -> &mut [GlyphPosition] {
        &mut self.pos
    }

    /// The direction the buffer is shaped in.
    #[inline]
    pub fn shaping_direction(&self) -> Direction {
        self.direction
    }
}

/// A buffer that contains an input string ready for shaping.
#[derive(Clone, Debug, Default)]
pub struct UnicodeBuffer(pub(crate) Buffer);

impl UnicodeBuffer {
    /// Create a new `UnicodeBuffer`.
    #[inline]
    pub fn new() -> UnicodeBuffer {
        UnicodeBuffer(Buffer::new())
    }

    /// Returns the number of characters in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the buffer contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pushes a string to a buffer. Clusters are UTF-8 byte offsets.
    pub fn push_str(&mut self, s: &str) {
        for (i, c) in s.char_indices() {
            self.add(c, i as u32);
        }
    }

    /// Appends a character to a buffer with the given cluster value.
    pub fn add(&mut self, codepoint: char, cluster: u32) {
        self.0.add(codepoint, cluster);
    }

    /// Set the text direction of the `Buffer`'s contents.
    pub fn set_direction(&mut self, direction: Direction) {
        self.0.direction = direction;
    }

    /// Returns the `Buffer`'s text direction.
    pub fn direction(&self) -> Direction {
        self.0.direction
    }

    /// Set the script from an ISO15924 tag.
    pub fn set_script(&mut self, script: Script) {
        self.0.script = Some(script);
    }

    /// Get the ISO15924 script tag.
    pub fn script(&self) -> Option<Script> {
        self.0.script
    }

    /// Set the buffer language.
    pub fn set_language(&mut self, lang: Language) {
        self.0.language = Some(lang);
    }

    /// Get the buffer language.
    pub fn language(&self) -> Option<Language> {
        self.0.language.clone()
    }

    /// Guess the segment properties (direction, language, script) for the
    /// current buffer.
    pub fn guess_segment_properties(&mut self) {
        self.0.guess_segment_properties()
    }

    /// Set the flags for this buffer.
    pub fn set_flags(&mut self, flags: BufferFlags) {
        self.0.flags = flags;
    }

    /// Get the flags for this buffer.
    pub fn flags(&self) -> BufferFlags {
        self.0.flags
    }

    /// Set the cluster level of the buffer.
    pub fn set_cluster_level(&mut self, cluster_level: BufferClusterLevel) {
        self.0.cluster_level = cluster_level;
    }

    /// Retrieve the cluster level of the buffer.
    pub fn cluster_level(&self) -> BufferClusterLevel {
        self.0.cluster_level
    }

    /// Clear the contents of the buffer.
    pub fn clear(&mut self) {
        self.0.clear()
    }
}

/// A buffer that contains the results of the shaping process.
#[derive(Clone, Debug)]
pub struct GlyphBuffer(pub(crate) Buffer);

impl GlyphBuffer {
    /// Returns the length of the data of the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the buffer contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the glyph infos.
    #[inline]
    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        &self.0.info
    }

    /// Get the glyph positions.
    #[inline]
    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        &self.0.pos
    }

    /// Returns the direction the glyphs were laid out in.
    pub fn direction(&self) -> Direction {
        self.0.direction
    }

    /// Clears the content of the glyph buffer and returns an empty
    /// `UnicodeBuffer` reusing the existing allocation.
    pub fn clear(mut self) -> UnicodeBuffer {
        self.0.clear();
        UnicodeBuffer(self.0)
    }

    /// Renders the glyphs as `gid=cluster+advance` records joined by `|`.
    ///
    /// Non-zero offsets are written as `@x,y` and a non-zero vertical
    /// advance as `,y` after the horizontal one.
    pub fn serialize(&self) -> String {
        let mut s = String::new();
        for (i, (info, pos)) in self.0.info.iter().zip(&self.0.pos).enumerate() {
            if i != 0 {
                s.push('|');
            }

            let _ = write!(&mut s, "{}={}", info.glyph_id, info.cluster);
            if pos.x_offset != 0 || pos.y_offset != 0 {
                let _ = write!(&mut s, "@{},{}", pos.x_offset, pos.y_offset);
            }

            let _ = write!(&mut s, "+{}", pos.x_advance);
            if pos.y_advance != 0 {
                let _ = write!(&mut s, ",{}", pos.y_advance);
            }
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> Buffer {
        let mut b = Buffer::new();
        for (i, c) in text.chars().enumerate() {
            b.add(c, i as u32);
        }
        b
    }

    fn clusters(b: &Buffer) -> Vec<u32> {
        b.info.iter().map(|i| i.cluster).collect()
    }

    #[test]
    fn sort_is_stable_and_merges_clusters() {
        let mut b = buffer("abcd");
        for (i, info) in b.info.iter_mut().enumerate() {
            info.set_complex_aux([2, 1, 2, 0][i]);
        }

        b.sort(0, 4, |a, b| a.complex_aux() > b.complex_aux());

        let order: String = b.info.iter().map(|i| i.as_char()).collect();
        assert_eq!(order, "dbac");
        assert_eq!(clusters(&b), vec![0, 0, 0, 0]);
    }

    #[test]
    fn sort_leaves_sorted_ranges_untouched() {
        let mut b = buffer("abc");
        b.sort(0, 3, |a, b| a.glyph_id > b.glyph_id);
        assert_eq!(clusters(&b), vec![0, 1, 2]);
    }

    #[test]
    fn output_protocol_inserts_glyphs() {
        let mut b = buffer("ab");
        b.clear_output();
        b.next_glyph();
        b.output_info(GlyphInfo::new('x', 1));
        b.next_glyph();
        b.sync();

        let text: String = b.info.iter().map(|i| i.as_char()).collect();
        assert_eq!(text, "axb");
        assert_eq!(b.idx, 0);
    }

    #[test]
    fn unsafe_to_break_skips_first_cluster() {
        let mut b = buffer("abc");
        b.unsafe_to_break(0, 3);
        assert!(!b.info[0].unsafe_to_break());
        assert!(b.info[1].unsafe_to_break());
        assert!(b.info[2].unsafe_to_break());
    }

    #[test]
    fn characters_level_never_merges() {
        let mut b = buffer("ab");
        b.cluster_level = BufferClusterLevel::Characters;
        b.merge_clusters(0, 2);
        assert_eq!(clusters(&b), vec![0, 1]);
        assert!(b.info[1].unsafe_to_break());
    }

    #[test]
    fn syllables() {
        let mut b = buffer("abcd");
        b.info[0].set_syllable(0x10);
        b.info[1].set_syllable(0x10);
        b.info[2].set_syllable(0x22);
        b.info[3].set_syllable(0x32);
        assert_eq!(b.next_syllable(0), 2);
        assert_eq!(b.next_syllable(2), 3);
        assert_eq!(b.next_syllable(3), 4);
        assert_eq!(b.next_syllable(4), 4);
    }

    #[test]
    fn guess_properties() {
        let mut b = buffer(" \u{0627}");
        b.guess_segment_properties();
        assert_eq!(b.script, Some(script::ARABIC));
        assert_eq!(b.direction, Direction::RightToLeft);
    }
}

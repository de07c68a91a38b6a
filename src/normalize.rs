// This module closely reflects the Unicode Normalization Algorithm,
// yet it's different.
//
// Each shaper specifies whether it prefers decomposed (NFD) or composed (NFC).
// The logic however tries to use whatever the font can support.
//
// Each grapheme is decomposed in a chain of 1:2 decompositions, marks
// reordered, and then recomposed if desired. The decomposition and
// recomposition only happen if the font supports the resulting characters,
// and only through the compose/decompose hooks of the shaper: the crate
// carries no Unicode decomposition tables of its own.

use crate::buffer::{Buffer, GlyphInfo};
use crate::face::FontFace;
use crate::plan::ShapePlan;

const MAX_COMBINING_MARKS: usize = 32;

/// Normalization preference of a shaper.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShapeNormalizationMode {
    /// Leave the text alone.
    None,
    /// Decompose as far as the font allows.
    Decomposed,
    /// Never composes base-to-base.
    ComposedDiacritics,
    /// Always fully decomposes and then recompose back.
    ComposedDiacriticsNoShortCircuit,
    /// Let the pipeline decide.
    Auto,
}

/// What the shaper's compose/decompose hooks can look at.
pub struct ShapeNormalizeContext<'a> {
    pub plan: &'a ShapePlan,
    pub face: &'a dyn FontFace,
}

impl ShapeNormalizeContext<'_> {
    /// `'\0'` as the second character means a singleton decomposition.
    #[inline]
    fn decompose(&self, ab: char) -> Option<(char, char)> {
        self.plan.shaper.decompose.and_then(|f| f(self, ab))
    }

    #[inline]
    fn compose(&self, a: char, b: char) -> Option<char> {
        self.plan.shaper.compose.and_then(|f| f(self, a, b))
    }

    #[inline]
    fn has_glyph(&self, c: char) -> bool {
        self.face.glyph_index(c).is_some()
    }
}

pub(crate) fn normalize(plan: &ShapePlan, face: &dyn FontFace, buffer: &mut Buffer) {
    if buffer.is_empty() {
        return;
    }

    let mut mode = plan.shaper.normalization_mode.unwrap_or(ShapeNormalizationMode::Auto);
    if mode == ShapeNormalizationMode::Auto {
        mode = ShapeNormalizationMode::ComposedDiacritics;
    }

    if mode == ShapeNormalizationMode::None {
        return;
    }

    let ctx = ShapeNormalizeContext { plan, face };

    let might_short_circuit = !matches!(
        mode,
        ShapeNormalizationMode::Decomposed | ShapeNormalizationMode::ComposedDiacriticsNoShortCircuit
    );

    // First round, decompose.
    let mut all_simple = true;
    buffer.clear_output();
    while buffer.idx < buffer.len() {
        if buffer.cur(0).is_mark() {
            all_simple = false;
        }

        decompose_current_character(&ctx, buffer, might_short_circuit);
    }
    buffer.sync();

    if all_simple {
        return;
    }

    // Second round, reorder (inplace).
    let count = buffer.len();
    let mut i = 0;
    while i < count {
        if buffer.info[i].combining_class() == 0 {
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < count && buffer.info[end].combining_class() != 0 {
            end += 1;
        }

        // We are going to do a O(n^2).  Only do this if the sequence is short.
        if end - i <= MAX_COMBINING_MARKS {
            buffer.sort(i, end, compare_combining_class);

            if let Some(reorder_marks) = plan.shaper.reorder_marks {
                reorder_marks(plan, buffer, i, end);
            }
        }

        i = end + 1;
    }

    // Third round, recompose.
    if matches!(
        mode,
        ShapeNormalizationMode::ComposedDiacritics | ShapeNormalizationMode::ComposedDiacriticsNoShortCircuit
    ) {
        recompose(&ctx, buffer);
    }
}

fn decompose_current_character(ctx: &ShapeNormalizeContext, buffer: &mut Buffer, shortest: bool) {
    let u = buffer.cur(0).as_char();
    let has_glyph = ctx.has_glyph(u);

    if (!shortest || !has_glyph) && decompose(ctx, buffer, shortest, u) > 0 {
        buffer.skip_glyph();
        return;
    }

    // U+2011 is the only sensible character that is a no-break version of another character
    // and not a space.  Handle this lone one.
    if !has_glyph && u == '\u{2011}' && ctx.has_glyph('\u{2010}') {
        buffer.output_char('\u{2010}');
        buffer.skip_glyph();
        return;
    }

    buffer.next_glyph();
}

/// Returns 0 if didn't decompose, number of resulting characters otherwise.
fn decompose(ctx: &ShapeNormalizeContext, buffer: &mut Buffer, shortest: bool, ab: char) -> u32 {
    let Some((a, b)) = ctx.decompose(ab) else {
        return 0;
    };

    let b = if b != '\0' {
        if !ctx.has_glyph(b) {
            return 0;
        }
        Some(b)
    } else {
        None
    };

    let a_glyph = ctx.has_glyph(a);
    if !shortest || !a_glyph {
        let ret = decompose(ctx, buffer, shortest, a);
        if ret != 0 {
            if let Some(b) = b {
                buffer.output_char(b);
                return ret + 1;
            }
            return ret;
        }
    }

    if a_glyph {
        // Output a and b.
        buffer.output_char(a);
        if let Some(b) = b {
            buffer.output_char(b);
            return 2;
        }
        return 1;
    }

    0
}

// We don't try to compose a non-mark character with it's preceding starter.
// This is both an optimization to avoid trying to compose every two neighboring
// glyphs in most scripts AND a desired feature for Hangul.
fn recompose(ctx: &ShapeNormalizeContext, buffer: &mut Buffer) {
    let count = buffer.len();
    let mut starter: Option<usize> = None;
    let mut out = 0;

    for i in 0..count {
        let cur = buffer.info[i];

        if let Some(s) = starter {
            // If there's anything between the starter and this char, they should have CCC
            // smaller than this character's.
            if cur.is_mark()
                && (s == out - 1 || buffer.info[out - 1].combining_class() < cur.combining_class())
            {
                let composed = ctx
                    .compose(buffer.info[s].as_char(), cur.as_char())
                    .filter(|c| ctx.has_glyph(*c));

                if let Some(composed) = composed {
                    // Merge and remove the second composable.
                    let cluster = buffer.info[s..out]
                        .iter()
                        .map(|info| info.cluster)
                        .fold(cur.cluster, u32::min);
                    for info in &mut buffer.info[s..out] {
                        info.cluster = cluster;
                    }

                    let starter_info = &mut buffer.info[s];
                    starter_info.glyph_id = composed as u32;
                    starter_info.init_unicode_props();
                    continue;
                }
            }
        }

        buffer.info[out] = cur;
        if cur.combining_class() == 0 {
            starter = Some(out);
        }
        out += 1;
    }

    buffer.info.truncate(out);
}

fn compare_combining_class(pa: &GlyphInfo, pb: &GlyphInfo) -> bool {
    pa.combining_class() > pb.combining_class()
}

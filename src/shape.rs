use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

use crate::buffer::{Buffer, BufferClusterLevel, BufferFlags, GlyphInfo};
use crate::complex::ZeroWidthMarksMode;
use crate::face::FontFace;
use crate::ot::TableIndex;
use crate::plan::ShapePlan;
use crate::unicode;
use crate::{normalize, Direction, Feature, GlyphBuffer, GlyphId, UnicodeBuffer};

/// Shapes the buffer content using provided font and features.
///
/// Consumes the buffer. You can then run `GlyphBuffer::clear` to get the `UnicodeBuffer` back
/// without allocating a new one.
pub fn shape(face: &dyn FontFace, features: &[Feature], mut buffer: UnicodeBuffer) -> GlyphBuffer {
    buffer.guess_segment_properties();
    let plan = ShapePlan::new(
        face,
        buffer.0.direction,
        buffer.0.script,
        buffer.0.language.as_ref(),
        features,
    );

    shape_with_plan(face, &plan, buffer)
}

/// Shapes the buffer content using the provided font and plan.
///
/// Consumes the buffer. You can then run `GlyphBuffer::clear` to get the `UnicodeBuffer` back
/// without allocating a new one.
///
/// It is up to the caller to ensure that the shape plan matches the properties of the provided
/// buffer, otherwise the shaping result will likely be incorrect.
///
/// # Panics
///
/// Will panic when debugging assertions are enabled if the buffer and plan have mismatched
/// properties.
pub fn shape_with_plan(face: &dyn FontFace, plan: &ShapePlan, buffer: UnicodeBuffer) -> GlyphBuffer {
    let mut buffer = buffer.0;
    buffer.guess_segment_properties();

    debug_assert_eq!(buffer.direction, plan.direction);
    debug_assert_eq!(
        buffer.script.unwrap_or(crate::script::UNKNOWN),
        plan.script.unwrap_or(crate::script::UNKNOWN)
    );

    if !buffer.is_empty() {
        // Save the original direction, we use it later.
        let target_direction = buffer.direction;
        shape_internal(&mut ShapeContext {
            plan,
            face,
            buffer: &mut buffer,
            target_direction,
        });
    }

    GlyphBuffer(buffer)
}

struct ShapeContext<'a> {
    plan: &'a ShapePlan,
    face: &'a dyn FontFace,
    buffer: &'a mut Buffer,
    // Transient stuff
    target_direction: Direction,
}

// Pull it all together!
fn shape_internal(ctx: &mut ShapeContext) {
    initialize_masks(ctx);
    set_unicode_props(ctx.buffer);
    insert_dotted_circle(ctx.buffer, ctx.face);

    form_clusters(ctx.buffer);

    ensure_native_direction(ctx.buffer);

    if let Some(func) = ctx.plan.shaper.preprocess_text {
        func(ctx.plan, ctx.face, ctx.buffer);
    }

    substitute_pre(ctx);
    position(ctx);
    substitute_post(ctx);

    ctx.buffer.propagate_flags();

    ctx.buffer.direction = ctx.target_direction;
}

fn substitute_pre(ctx: &mut ShapeContext) {
    rotate_chars(ctx);

    normalize::normalize(ctx.plan, ctx.face, ctx.buffer);

    setup_masks(ctx);

    map_glyphs(ctx.face, ctx.buffer);

    apply_stages(ctx.plan, ctx.face, ctx.buffer, TableIndex::GSUB);
}

fn substitute_post(ctx: &mut ShapeContext) {
    hide_default_ignorables(ctx.buffer, ctx.face);

    if let Some(func) = ctx.plan.shaper.postprocess_glyphs {
        func(ctx.plan, ctx.face, ctx.buffer);
    }
}

fn apply_stages(plan: &ShapePlan, face: &dyn FontFace, buffer: &mut Buffer, table_index: TableIndex) {
    for stage in plan.ot_map.stages(table_index) {
        for feature in &stage.features {
            face.apply_feature(table_index, feature, buffer);
        }

        if let Some(func) = stage.pause_func {
            func(plan, face, buffer);
        }
    }
}

fn position(ctx: &mut ShapeContext) {
    ctx.buffer.clear_positions();

    position_default(ctx);

    position_complex(ctx);

    if ctx.buffer.direction.is_backward() {
        ctx.buffer.reverse();
    }
}

fn position_default(ctx: &mut ShapeContext) {
    let vertical = ctx.buffer.direction.is_vertical();
    let buffer = &mut *ctx.buffer;
    for (info, pos) in buffer.info.iter().zip(&mut buffer.pos) {
        let glyph = GlyphId(u16::try_from(info.glyph_id).unwrap_or(0));
        let advance = ctx.face.glyph_advance(glyph, vertical);
        if vertical {
            pos.y_advance = advance;
        } else {
            pos.x_advance = advance;
        }
    }
}

fn position_complex(ctx: &mut ShapeContext) {
    // If the font has no GPOS and direction is forward, then when
    // zeroing mark widths, we shift the mark with it, such that the
    // mark is positioned hanging over the previous glyph.  When
    // direction is backward we don't shift and it will end up
    // hanging over the next glyph after the final reordering.
    let adjust_offsets_when_zeroing = ctx.plan.shaper.fallback_position
        && !ctx.plan.ot_map.found_script(TableIndex::GPOS)
        && ctx.buffer.direction.is_forward();

    let plan = ctx.plan;
    let zero_marks = |mode| plan.zero_marks && plan.shaper.zero_width_marks == Some(mode);

    if zero_marks(ZeroWidthMarksMode::Early) {
        zero_mark_widths(ctx.buffer, adjust_offsets_when_zeroing);
    }

    if ctx.plan.apply_gpos {
        apply_stages(ctx.plan, ctx.face, ctx.buffer, TableIndex::GPOS);
    }

    if zero_marks(ZeroWidthMarksMode::Late) {
        zero_mark_widths(ctx.buffer, adjust_offsets_when_zeroing);
    }

    zero_width_default_ignorables(ctx.buffer);
}

fn initialize_masks(ctx: &mut ShapeContext) {
    let global_mask = ctx.plan.ot_map.global_mask();
    ctx.buffer.reset_masks(global_mask);
}

fn setup_masks(ctx: &mut ShapeContext) {
    setup_masks_fraction(ctx);

    if let Some(func) = ctx.plan.shaper.setup_masks {
        func(ctx.plan, ctx.face, ctx.buffer);
    }

    for feature in &ctx.plan.user_features {
        if !feature.is_global() {
            let (mask, shift) = ctx.plan.ot_map.mask(feature.tag);
            ctx.buffer.set_masks(feature.value << shift, mask, feature.start, feature.end);
        }
    }
}

fn is_decimal_number(info: &GlyphInfo) -> bool {
    info.as_char().general_category() == GeneralCategory::DecimalNumber
}

fn setup_masks_fraction(ctx: &mut ShapeContext) {
    let buffer = &mut *ctx.buffer;
    if !ctx.plan.has_frac || buffer.info.iter().all(|info| info.glyph_id < 0x80) {
        return;
    }

    let (pre_mask, post_mask) = if buffer.direction.is_forward() {
        (ctx.plan.numr_mask | ctx.plan.frac_mask, ctx.plan.frac_mask | ctx.plan.dnom_mask)
    } else {
        (ctx.plan.frac_mask | ctx.plan.dnom_mask, ctx.plan.numr_mask | ctx.plan.frac_mask)
    };

    let len = buffer.len();
    let mut i = 0;
    while i < len {
        // FRACTION SLASH
        if buffer.info[i].glyph_id == 0x2044 {
            let mut start = i;
            while start > 0 && is_decimal_number(&buffer.info[start - 1]) {
                start -= 1;
            }

            let mut end = i + 1;
            while end < len && is_decimal_number(&buffer.info[end]) {
                end += 1;
            }

            buffer.unsafe_to_break(start, end);

            for info in &mut buffer.info[start..i] {
                info.mask |= pre_mask;
            }

            buffer.info[i].mask |= ctx.plan.frac_mask;

            for info in &mut buffer.info[i + 1..end] {
                info.mask |= post_mask;
            }

            i = end;
        } else {
            i += 1;
        }
    }
}

fn set_unicode_props(buffer: &mut Buffer) {
    // Marks, ZWJ, emoji modifiers and tag characters are flagged as
    // continuations so that reversing a backward run keeps graphemes intact.
    for info in &mut buffer.info {
        info.init_unicode_props();
    }
}

fn insert_dotted_circle(buffer: &mut Buffer, face: &dyn FontFace) {
    if !buffer.flags.contains(BufferFlags::DO_NOT_INSERT_DOTTED_CIRCLE)
        && buffer.flags.contains(BufferFlags::BEGINNING_OF_TEXT)
        && buffer.info[0].is_mark()
        && face.glyph_index('\u{25CC}').is_some()
    {
        let first = buffer.info[0];
        let mut info = GlyphInfo::new('\u{25CC}', first.cluster);
        info.mask = first.mask;
        info.init_unicode_props();

        buffer.clear_output();
        buffer.output_info(info);
        while buffer.idx < buffer.len() {
            buffer.next_glyph();
        }
        buffer.sync();
    }
}

fn form_clusters(buffer: &mut Buffer) {
    if buffer.info.iter().all(|info| info.glyph_id < 0x80) {
        return;
    }

    let mut start = 0;
    while start < buffer.len() {
        let end = buffer.next_grapheme(start);
        if buffer.cluster_level == BufferClusterLevel::MonotoneGraphemes {
            buffer.merge_clusters(start, end);
        } else {
            buffer.unsafe_to_break(start, end);
        }
        start = end;
    }
}

fn ensure_native_direction(buffer: &mut Buffer) {
    let dir = buffer.direction;
    let hor = buffer.script.and_then(Direction::from_script).unwrap_or_default();

    if (dir.is_horizontal() && dir != hor && hor != Direction::Invalid)
        || (dir.is_vertical() && dir != Direction::TopToBottom)
    {
        if buffer.cluster_level == BufferClusterLevel::MonotoneCharacters {
            let mut start = 0;
            while start < buffer.len() {
                let end = buffer.next_grapheme(start);
                buffer.merge_clusters(start, end);
                start = end;
            }
        }

        // form_clusters() merged clusters already, we don't merge.
        buffer.reverse_graphemes();
        buffer.direction = buffer.direction.reverse();
    }
}

fn rotate_chars(ctx: &mut ShapeContext) {
    if ctx.target_direction.is_backward() {
        let rtlm_mask = ctx.plan.rtlm_mask;

        for info in &mut ctx.buffer.info {
            match unicode::mirrored(info.as_char()) {
                Some(c) if ctx.face.glyph_index(c).is_some() => info.glyph_id = c as u32,
                _ => info.mask |= rtlm_mask,
            }
        }
    }

    if ctx.target_direction.is_vertical() && !ctx.plan.has_vert {
        for info in &mut ctx.buffer.info {
            let c = vert_char_for(info.as_char());
            if c != info.as_char() && ctx.face.glyph_index(c).is_some() {
                info.glyph_id = c as u32;
            }
        }
    }
}

fn vert_char_for(c: char) -> char {
    match c {
        '\u{2013}' => '\u{fe32}', // EN DASH
        '\u{2014}' => '\u{fe31}', // EM DASH
        '\u{2025}' => '\u{fe30}', // TWO DOT LEADER
        '\u{2026}' => '\u{fe19}', // HORIZONTAL ELLIPSIS
        '\u{3001}' => '\u{fe11}', // IDEOGRAPHIC COMMA
        '\u{3002}' => '\u{fe12}', // IDEOGRAPHIC FULL STOP
        '\u{3008}' => '\u{fe3f}', // LEFT ANGLE BRACKET
        '\u{3009}' => '\u{fe40}', // RIGHT ANGLE BRACKET
        '\u{300a}' => '\u{fe3d}', // LEFT DOUBLE ANGLE BRACKET
        '\u{300b}' => '\u{fe3e}', // RIGHT DOUBLE ANGLE BRACKET
        '\u{300c}' => '\u{fe41}', // LEFT CORNER BRACKET
        '\u{300d}' => '\u{fe42}', // RIGHT CORNER BRACKET
        '\u{300e}' => '\u{fe43}', // LEFT WHITE CORNER BRACKET
        '\u{300f}' => '\u{fe44}', // RIGHT WHITE CORNER BRACKET
        '\u{3010}' => '\u{fe3b}', // LEFT BLACK LENTICULAR BRACKET
        '\u{3011}' => '\u{fe3c}', // RIGHT BLACK LENTICULAR BRACKET
        '\u{3014}' => '\u{fe39}', // LEFT TORTOISE SHELL BRACKET
        '\u{3015}' => '\u{fe3a}', // RIGHT TORTOISE SHELL BRACKET
        '\u{3016}' => '\u{fe17}', // LEFT WHITE LENTICULAR BRACKET
        '\u{3017}' => '\u{fe18}', // RIGHT WHITE LENTICULAR BRACKET
        '\u{fe4f}' => '\u{fe34}', // WAVY LOW LINE
        '\u{ff01}' => '\u{fe15}', // FULLWIDTH EXCLAMATION MARK
        '\u{ff08}' => '\u{fe35}', // FULLWIDTH LEFT PARENTHESIS
        '\u{ff09}' => '\u{fe36}', // FULLWIDTH RIGHT PARENTHESIS
        '\u{ff0c}' => '\u{fe10}', // FULLWIDTH COMMA
        '\u{ff1a}' => '\u{fe13}', // FULLWIDTH COLON
        '\u{ff1b}' => '\u{fe14}', // FULLWIDTH SEMICOLON
        '\u{ff1f}' => '\u{fe16}', // FULLWIDTH QUESTION MARK
        '\u{ff3b}' => '\u{fe47}', // FULLWIDTH LEFT SQUARE BRACKET
        '\u{ff3d}' => '\u{fe48}', // FULLWIDTH RIGHT SQUARE BRACKET
        '\u{ff3f}' => '\u{fe33}', // FULLWIDTH LOW LINE
        '\u{ff5b}' => '\u{fe37}', // FULLWIDTH LEFT CURLY BRACKET
        '\u{ff5d}' => '\u{fe38}', // FULLWIDTH RIGHT CURLY BRACKET
        _ => c,
    }
}

fn map_glyphs(face: &dyn FontFace, buffer: &mut Buffer) {
    for info in &mut buffer.info {
        info.glyph_id = face.glyph_index(info.as_char()).map_or(0, |g| u32::from(g.0));
    }
}

fn zero_width_default_ignorables(buffer: &mut Buffer) {
    if buffer.flags.contains(BufferFlags::PRESERVE_DEFAULT_IGNORABLES)
        || buffer.flags.contains(BufferFlags::REMOVE_DEFAULT_IGNORABLES)
    {
        return;
    }

    for (info, pos) in buffer.info.iter().zip(&mut buffer.pos) {
        if info.is_default_ignorable() {
            pos.x_advance = 0;
            pos.y_advance = 0;
            pos.x_offset = 0;
            pos.y_offset = 0;
        }
    }
}

fn zero_mark_widths(buffer: &mut Buffer, adjust_offsets: bool) {
    for (info, pos) in buffer.info.iter().zip(&mut buffer.pos) {
        if info.is_mark() {
            if adjust_offsets {
                pos.x_offset -= pos.x_advance;
                pos.y_offset -= pos.y_advance;
            }

            pos.x_advance = 0;
            pos.y_advance = 0;
        }
    }
}

fn hide_default_ignorables(buffer: &mut Buffer, face: &dyn FontFace) {
    if buffer.flags.contains(BufferFlags::PRESERVE_DEFAULT_IGNORABLES)
        || !buffer.info.iter().any(GlyphInfo::is_default_ignorable)
    {
        return;
    }

    if !buffer.flags.contains(BufferFlags::REMOVE_DEFAULT_IGNORABLES) {
        if let Some(invisible) = face.glyph_index(' ') {
            for info in &mut buffer.info {
                if info.is_default_ignorable() {
                    info.glyph_id = u32::from(invisible.0);
                }
            }
            return;
        }
    }

    buffer.delete_glyphs_inplace(GlyphInfo::is_default_ignorable);
}

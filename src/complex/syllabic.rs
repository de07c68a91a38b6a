use crate::buffer::{Buffer, BufferFlags, GlyphInfo};
use crate::face::FontFace;
use crate::plan::ShapePlan;

/// Inserts a dotted circle at the start of every broken syllable.
///
/// When the font has no dotted circle the placeholder maps to glyph 0 so
/// the cluster still renders as something.
pub fn insert_dotted_circles(
    face: &dyn FontFace,
    buffer: &mut Buffer,
    broken_syllable_type: u8,
    dottedcircle_category: u8,
    dottedcircle_position: Option<u8>,
) {
    if buffer.flags.contains(BufferFlags::DO_NOT_INSERT_DOTTED_CIRCLE) {
        return;
    }

    let has_broken_syllables = buffer
        .info
        .iter()
        .any(|info| info.syllable() & 0x0F == broken_syllable_type);

    if !has_broken_syllables {
        return;
    }

    let mut dottedcircle = GlyphInfo::new('\u{25CC}', 0);
    dottedcircle.init_unicode_props();
    dottedcircle.set_complex_category(dottedcircle_category);
    if let Some(dottedcircle_position) = dottedcircle_position {
        dottedcircle.set_complex_aux(dottedcircle_position);
    }
    dottedcircle.glyph_id = face.glyph_index('\u{25CC}').map_or(0, |g| u32::from(g.0));

    buffer.clear_output();

    let mut last_syllable = 0;
    while buffer.idx < buffer.len() {
        let syllable = buffer.cur(0).syllable();
        if last_syllable != syllable && (syllable & 0x0F) == broken_syllable_type {
            last_syllable = syllable;

            let mut ginfo = dottedcircle;
            ginfo.cluster = buffer.cur(0).cluster;
            ginfo.mask = buffer.cur(0).mask;
            ginfo.set_syllable(buffer.cur(0).syllable());

            buffer.output_info(ginfo);
        } else {
            buffer.next_glyph();
        }
    }

    buffer.sync();
}

/// Pause that forgets the syllables once per-syllable features are done.
pub fn clear_syllables(_: &ShapePlan, _: &dyn FontFace, buffer: &mut Buffer) {
    for info in &mut buffer.info {
        info.set_syllable(0);
    }
}

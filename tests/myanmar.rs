use fontweave::ot::TableIndex;
use fontweave::{script, shape, Direction, FontFace, GlyphBuffer, GlyphId, Tag, UnicodeBuffer};
use pretty_assertions::assert_eq;

// Every BMP character maps to the glyph with the same id.
struct Identity;

impl FontFace for Identity {
    fn glyph_index(&self, c: char) -> Option<GlyphId> {
        u16::try_from(c as u32).ok().map(GlyphId)
    }

    fn glyph_advance(&self, _: GlyphId, _: bool) -> i32 {
        500
    }

    fn has_script(&self, _: TableIndex, tag: Tag) -> bool {
        tag == Tag::from_bytes(b"mym2")
    }
}

fn shape_myanmar(text: &str) -> GlyphBuffer {
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.set_script(script::MYANMAR);
    buffer.set_direction(Direction::LeftToRight);
    shape(&Identity, &[], buffer)
}

fn glyphs(buffer: &GlyphBuffer) -> Vec<u32> {
    buffer.glyph_infos().iter().map(|info| info.glyph_id).collect()
}

#[test]
fn repha_moves_after_base() {
    // RA ASAT VIRAMA KA VOWEL SIGN U
    let out = shape_myanmar("\u{101B}\u{103A}\u{1039}\u{1000}\u{102F}");
    assert_eq!(glyphs(&out), vec![0x1000, 0x101B, 0x103A, 0x1039, 0x102F]);

    let infos = out.glyph_infos();
    assert!(infos.iter().all(|info| info.cluster == 0));
    assert!(infos[1..].iter().all(|info| info.unsafe_to_break()));
}

#[test]
fn lone_vowel_sign_is_a_broken_cluster() {
    let out = shape_myanmar("\u{102F}");
    assert_eq!(glyphs(&out), vec![0x25CC, 0x102F]);
    assert_eq!(out.glyph_infos()[0].cluster, 0);
    assert_eq!(out.glyph_infos()[1].cluster, 0);
}

#[test]
fn syllables_keep_their_clusters() {
    // KA VOWEL SIGN E, then KHA
    let out = shape_myanmar("\u{1000}\u{1031}\u{1001}");
    assert_eq!(glyphs(&out), vec![0x1031, 0x1000, 0x1001]);

    let clusters: Vec<u32> = out.glyph_infos().iter().map(|info| info.cluster).collect();
    assert_eq!(clusters, vec![0, 0, 6]);
}

#[test]
fn plan_selects_myanmar_shaper() {
    let plan = fontweave::ShapePlan::new(
        &Identity,
        Direction::LeftToRight,
        Some(script::MYANMAR),
        None,
        &[],
    );
    assert_eq!(plan.shaper_name(), "myanmar");
}

use super::{ComplexShaper, ZeroWidthMarksMode};
use crate::buffer::{Buffer, BufferClusterLevel};
use crate::face::FontFace;
use crate::normalize::ShapeNormalizationMode;
use crate::plan::ShapePlan;

pub static THAI_SHAPER: ComplexShaper = ComplexShaper {
    name: "thai",
    collect_features: None,
    override_features: None,
    create_data: None,
    preprocess_text: Some(preprocess_text),
    postprocess_glyphs: None,
    normalization_mode: Some(ShapeNormalizationMode::Auto),
    decompose: None,
    compose: None,
    setup_masks: None,
    gpos_tag: None,
    reorder_marks: None,
    zero_width_marks: Some(ZeroWidthMarksMode::Late),
    fallback_position: false,
};

// Thai and Lao share the layout of their blocks, 0x80 apart.

#[inline]
fn is_sara_am(u: u32) -> bool {
    (u & !0x0080) == 0x0E33
}

#[inline]
fn nikhahit_from_sara_am(u: u32) -> u32 {
    u - 0x0E33 + 0x0E4D
}

#[inline]
fn sara_aa_from_sara_am(u: u32) -> u32 {
    u - 1
}

#[inline]
fn is_above_base_mark(u: u32) -> bool {
    let u = u & !0x0080;
    matches!(u, 0x0E34..=0x0E37 | 0x0E47..=0x0E4E | 0x0E31 | 0x0E3B)
}

fn preprocess_text(_: &ShapePlan, _: &dyn FontFace, buffer: &mut Buffer) {
    // The SARA AM is a composition of NIKHAHIT and SARA AA. Fonts usually
    // carry no glyph for it, and any above-base mark typed between the
    // consonant and the SARA AM belongs above the NIKHAHIT. So decompose
    // and move the NIKHAHIT back past those marks:
    //
    //   <0E14, 0E4B, 0E33> -> <0E14, 0E4D, 0E4B, 0E32>
    //
    // The characters are logically reordered, so their clusters get merged.

    buffer.clear_output();
    while buffer.idx < buffer.len() {
        let u = buffer.cur(0).glyph_id;
        if !is_sara_am(u) {
            buffer.next_glyph();
            continue;
        }

        let (Some(nikhahit), Some(sara_aa)) = (
            char::from_u32(nikhahit_from_sara_am(u)),
            char::from_u32(sara_aa_from_sara_am(u)),
        ) else {
            buffer.next_glyph();
            continue;
        };

        buffer.output_char(nikhahit);
        buffer.output_char(sara_aa);
        buffer.skip_glyph();

        let end = buffer.out_len();
        let mut start = end - 2;
        while start > 0 && is_above_base_mark(buffer.out_info_mut()[start - 1].glyph_id) {
            start -= 1;
        }

        if start + 2 < end {
            buffer.merge_out_clusters(start, end);
            buffer.out_info_mut()[start..end - 1].rotate_right(1);
        } else if start > 0 && buffer.cluster_level == BufferClusterLevel::MonotoneGraphemes {
            // The NIKHAHIT is combining, so it joins the previous cluster.
            buffer.merge_out_clusters(start - 1, end);
        }
    }

    buffer.sync();
}

#[cfg(test)]
mod tests {
    use crate::{shape, FontFace, GlyphId, UnicodeBuffer};
    use pretty_assertions::assert_eq;

    struct Bmp;

    impl FontFace for Bmp {
        fn glyph_index(&self, c: char) -> Option<GlyphId> {
            u16::try_from(c as u32).ok().map(GlyphId)
        }

        fn glyph_advance(&self, _: GlyphId, _: bool) -> i32 {
            500
        }
    }

    fn run(text: &str) -> Vec<(u32, u32)> {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        shape(&Bmp, &[], buffer)
            .glyph_infos()
            .iter()
            .map(|info| (info.glyph_id, info.cluster))
            .collect()
    }

    #[test]
    fn sara_am_is_decomposed() {
        assert_eq!(
            run("\u{0E01}\u{0E33}"),
            vec![(0x0E01, 0), (0x0E4D, 0), (0x0E32, 0)]
        );
    }

    #[test]
    fn nikhahit_moves_before_tone_marks() {
        assert_eq!(
            run("\u{0E14}\u{0E4B}\u{0E33}"),
            vec![(0x0E14, 0), (0x0E4D, 0), (0x0E4B, 0), (0x0E32, 0)]
        );
    }

    #[test]
    fn lao_am_is_decomposed_too() {
        assert_eq!(
            run("\u{0E81}\u{0EB3}"),
            vec![(0x0E81, 0), (0x0ECD, 0), (0x0EB2, 0)]
        );
    }

    #[test]
    fn other_text_is_untouched() {
        assert_eq!(run("\u{0E01}\u{0E32}"), vec![(0x0E01, 0), (0x0E32, 3)]);
    }
}

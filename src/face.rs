use ttf_parser::opentype_layout::LayoutTable;
use ttf_parser::{GlyphId, PlatformId, Tag};

use crate::buffer::Buffer;
use crate::ot::{StageFeature, TableIndex};
use crate::Error;

// https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#windows-platform-platform-id--3
const WINDOWS_SYMBOL_ENCODING: u16 = 0;
const WINDOWS_UNICODE_BMP_ENCODING: u16 = 1;
const WINDOWS_UNICODE_FULL_ENCODING: u16 = 10;

// https://docs.microsoft.com/en-us/typography/opentype/spec/name#platform-specific-encoding-and-language-ids-unicode-platform-platform-id--0
const UNICODE_1_0_ENCODING: u16 = 0;
const UNICODE_1_1_ENCODING: u16 = 1;
const UNICODE_ISO_ENCODING: u16 = 2;
const UNICODE_2_0_BMP_ENCODING: u16 = 3;
const UNICODE_2_0_FULL_ENCODING: u16 = 4;
const UNICODE_FULL_ENCODING: u16 = 6;

/// The glyph and layout-table lookups the shaper needs from a font.
///
/// Glyph substitution and positioning lookups themselves live outside this
/// crate: the shaper calls [`FontFace::apply_feature`] once per feature and
/// stage, and an implementation may run its own lookup engine there.
pub trait FontFace {
    /// Maps a character to a glyph.
    fn glyph_index(&self, c: char) -> Option<GlyphId>;

    /// Returns the advance of a glyph in font units.
    fn glyph_advance(&self, glyph: GlyphId, vertical: bool) -> i32;

    /// Checks that a GSUB/GPOS table has a script with the given tag.
    fn has_script(&self, _table: TableIndex, _script: Tag) -> bool {
        false
    }

    /// Checks that a GSUB/GPOS table has a feature.
    ///
    /// With `script` set, only the default language system of that script
    /// is searched, otherwise the whole feature list.
    fn has_feature(&self, _table: TableIndex, _script: Option<Tag>, _feature: Tag) -> bool {
        false
    }

    /// Applies one feature to the glyphs whose mask intersects `feature.mask`.
    fn apply_feature(&self, _table: TableIndex, _feature: &StageFeature, _buffer: &mut Buffer) {}
}

/// A [`FontFace`] backed by `ttf-parser`.
pub struct Face<'a> {
    pub(crate) ttfp_face: ttf_parser::Face<'a>,
    prefered_cmap_encoding_subtable: Option<u16>,
}

impl<'a> Face<'a> {
    /// Creates a new `Face` from data.
    ///
    /// Data will be referenced, not owned.
    pub fn from_slice(data: &'a [u8], face_index: u32) -> Result<Self, Error> {
        let ttfp_face = ttf_parser::Face::parse(data, face_index)
            .map_err(|e| Error::FontData(e.to_string()))?;
        Ok(Self::from_face(ttfp_face))
    }

    /// Wraps an already parsed `ttf_parser::Face`.
    pub fn from_face(ttfp_face: ttf_parser::Face<'a>) -> Self {
        let prefered_cmap_encoding_subtable = find_best_cmap_subtable(&ttfp_face);
        Face {
            ttfp_face,
            prefered_cmap_encoding_subtable,
        }
    }

    /// Returns the underlying `ttf_parser::Face`.
    #[inline]
    pub fn as_ttf_parser(&self) -> &ttf_parser::Face<'a> {
        &self.ttfp_face
    }

    fn cmap_subtable(&self) -> Option<ttf_parser::cmap::Subtable<'a>> {
        let index = self.prefered_cmap_encoding_subtable?;
        self.ttfp_face.tables().cmap?.subtables.get(index)
    }

    fn glyph_index_u32(&self, c: u32) -> Option<GlyphId> {
        let subtable = self.cmap_subtable()?;
        match subtable.glyph_index(c) {
            Some(gid) => Some(gid),
            None => {
                // For symbol-encoded OpenType fonts, we duplicate the
                // U+F000..F0FF range at U+0000..U+00FF.
                if subtable.platform_id == PlatformId::Windows
                    && subtable.encoding_id == WINDOWS_SYMBOL_ENCODING
                    && c <= 0x00FF
                {
                    return subtable.glyph_index(0xF000 + c);
                }

                None
            }
        }
    }

    /// Calls `f` for every code point the preferred cmap subtable maps.
    pub(crate) fn codepoints(&self, f: impl FnMut(u32)) {
        if let Some(subtable) = self.cmap_subtable() {
            subtable.codepoints(f);
        }
    }

    fn layout_table(&self, table_index: TableIndex) -> Option<LayoutTable<'a>> {
        match table_index {
            TableIndex::GSUB => self.ttfp_face.tables().gsub,
            TableIndex::GPOS => self.ttfp_face.tables().gpos,
        }
    }
}

impl FontFace for Face<'_> {
    #[inline]
    fn glyph_index(&self, c: char) -> Option<GlyphId> {
        self.glyph_index_u32(c as u32)
    }

    fn glyph_advance(&self, glyph: GlyphId, vertical: bool) -> i32 {
        let face = &self.ttfp_face;
        if vertical {
            match face.glyph_ver_advance(glyph) {
                Some(adv) => -i32::from(adv),
                None => -i32::from(face.units_per_em()),
            }
        } else {
            match face.glyph_hor_advance(glyph) {
                Some(adv) => i32::from(adv),
                None => i32::from(face.units_per_em()),
            }
        }
    }

    fn has_script(&self, table: TableIndex, script: Tag) -> bool {
        self.layout_table(table)
            .map_or(false, |t| t.scripts.find(script).is_some())
    }

    fn has_feature(&self, table: TableIndex, script: Option<Tag>, feature: Tag) -> bool {
        let Some(table) = self.layout_table(table) else {
            return false;
        };

        let Some(script) = script else {
            return table.features.into_iter().any(|f| f.tag == feature);
        };

        let Some(lang_sys) = table.scripts.find(script).and_then(|s| s.default_language) else {
            return false;
        };

        lang_sys
            .required_feature
            .into_iter()
            .chain(lang_sys.feature_indices)
            .filter_map(|index| table.features.get(index))
            .any(|f| f.tag == feature)
    }
}

fn find_best_cmap_subtable(face: &ttf_parser::Face) -> Option<u16> {
    // Symbol subtable.
    // Prefer symbol if available.
    // https://github.com/harfbuzz/harfbuzz/issues/1918
    find_cmap_subtable(face, PlatformId::Windows, WINDOWS_SYMBOL_ENCODING)
        // 32-bit subtables:
        .or_else(|| find_cmap_subtable(face, PlatformId::Windows, WINDOWS_UNICODE_FULL_ENCODING))
        .or_else(|| find_cmap_subtable(face, PlatformId::Unicode, UNICODE_FULL_ENCODING))
        .or_else(|| find_cmap_subtable(face, PlatformId::Unicode, UNICODE_2_0_FULL_ENCODING))
        // 16-bit subtables:
        .or_else(|| find_cmap_subtable(face, PlatformId::Windows, WINDOWS_UNICODE_BMP_ENCODING))
        .or_else(|| find_cmap_subtable(face, PlatformId::Unicode, UNICODE_2_0_BMP_ENCODING))
        .or_else(|| find_cmap_subtable(face, PlatformId::Unicode, UNICODE_ISO_ENCODING))
        .or_else(|| find_cmap_subtable(face, PlatformId::Unicode, UNICODE_1_1_ENCODING))
        .or_else(|| find_cmap_subtable(face, PlatformId::Unicode, UNICODE_1_0_ENCODING))
}

fn find_cmap_subtable(face: &ttf_parser::Face, platform_id: PlatformId, encoding_id: u16) -> Option<u16> {
    let cmap = face.tables().cmap?;
    cmap.subtables
        .into_iter()
        .position(|s| s.platform_id == platform_id && s.encoding_id == encoding_id)
        .map(|i| i as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_a_font_data_error() {
        let err = Face::from_slice(b"not a font", 0).err();
        assert!(matches!(err, Some(Error::FontData(_))));
    }
}

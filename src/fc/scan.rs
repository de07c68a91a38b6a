//! Candidate patterns from font files.

use ttf_parser::{name_id, PlatformId, Tag};

use super::charset::Charset;
use super::object::*;
use super::pattern::Pattern;
use crate::Face;

/// Builds the candidate pattern describing one face of a font file.
pub fn font_pattern(face: &Face, file: &str, index: u32) -> Pattern {
    let ttf = face.as_ttf_parser();
    let mut p = Pattern::new();

    let names = localized_names(ttf);
    let families = pick(&names, name_id::TYPOGRAPHIC_FAMILY, name_id::FAMILY);
    let styles = pick(&names, name_id::TYPOGRAPHIC_SUBFAMILY, name_id::SUBFAMILY);
    for (object, lang_object, list) in [
        (Object::FAMILY, Object::FAMILY_LANG, families),
        (Object::STYLE, Object::STYLE_LANG, styles),
        (Object::FULLNAME, Object::FULLNAME_LANG, pick(&names, name_id::FULL_NAME, name_id::FULL_NAME)),
    ] {
        for (name, lang) in list {
            p.add(object, name, true);
            p.add(lang_object, lang, true);
        }
    }

    if let Some((ps, _)) = pick(&names, name_id::POST_SCRIPT_NAME, name_id::POST_SCRIPT_NAME).first() {
        p.add(Object::POSTSCRIPT_NAME, ps.as_str(), true);
    }

    if let Some(weight) = weight_from_opentype(f64::from(ttf.weight().to_number())) {
        p.add(Object::WEIGHT, weight, true);
    }
    p.add(Object::WIDTH, width_from_opentype(ttf.width().to_number()), true);

    let slant = if ttf.is_italic() {
        SLANT_ITALIC
    } else if ttf.is_oblique() {
        SLANT_OBLIQUE
    } else {
        SLANT_ROMAN
    };
    p.add(Object::SLANT, slant, true);

    if ttf.is_monospaced() {
        p.add(Object::SPACING, MONO, true);
    }

    let tables = ttf.tables();
    let outline = tables.glyf.is_some() || tables.cff.is_some() || tables.cff2.is_some();
    let format = if tables.cff.is_some() || tables.cff2.is_some() {
        "CFF"
    } else {
        "TrueType"
    };
    p.add(Object::FONT_FORMAT, format, true);
    p.add(Object::OUTLINE, outline, true);
    p.add(Object::SCALABLE, outline, true);
    let color = tables.colr.is_some() || tables.sbix.is_some() || tables.cbdt.is_some() || tables.svg.is_some();
    p.add(Object::COLOR, color, true);
    p.add(Object::VARIABLE, ttf.is_variable(), true);
    let hinted = ttf.raw_face().table(Tag::from_bytes(b"fpgm")).is_some();
    p.add(Object::FONT_HAS_HINT, hinted, true);

    let mut charset = Charset::new();
    face.codepoints(|c| charset.insert(c));
    p.add(Object::CHARSET, charset, true);

    p.add(Object::FILE, file, true);
    p.add(Object::INDEX, index as i32, true);

    p.add_fullname();
    p
}

/// `(name id, text, language)` records, English first, without duplicates.
fn localized_names(face: &ttf_parser::Face) -> Vec<(u16, String, String)> {
    let mut out: Vec<(u16, String, String)> = Vec::new();
    for name in face.names() {
        let text = match name.platform_id {
            PlatformId::Windows | PlatformId::Unicode => decode_utf16_be(name.name),
            PlatformId::Macintosh if name.encoding_id == 0 => decode_mac_ascii(name.name),
            _ => None,
        };
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            continue;
        };

        let lang = match name.platform_id {
            PlatformId::Windows => windows_lang(name.language_id),
            PlatformId::Macintosh if name.language_id == 0 => "en",
            _ => "und",
        };

        if !out.iter().any(|(id, t, l)| *id == name.name_id && *t == text && l == lang) {
            out.push((name.name_id, text, lang.to_string()));
        }
    }

    out.sort_by_key(|(_, _, lang)| !(lang == "en" || lang.starts_with("en-")));
    out
}

/// The `(text, language)` pairs of `preferred`, or of `fallback` when
/// there are none, one per language.
fn pick(names: &[(u16, String, String)], preferred: u16, fallback: u16) -> Vec<(String, String)> {
    let select = |id: u16| {
        let mut list: Vec<(String, String)> = Vec::new();
        for (_, text, lang) in names.iter().filter(|(n, _, _)| *n == id) {
            if !list.iter().any(|(_, l)| l == lang) {
                list.push((text.clone(), lang.clone()));
            }
        }
        list
    };

    let list = select(preferred);
    if list.is_empty() {
        select(fallback)
    } else {
        list
    }
}

fn decode_utf16_be(data: &[u8]) -> Option<String> {
    let units = data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn decode_mac_ascii(data: &[u8]) -> Option<String> {
    data.is_ascii()
        .then(|| data.iter().map(|b| char::from(*b)).collect())
}

/// Maps a Windows LCID to a language tag.
fn windows_lang(lcid: u16) -> &'static str {
    match lcid {
        0x0409 => "en-us",
        0x0809 => "en-gb",
        0x0c09 => "en-au",
        0x1009 => "en-ca",
        0x0401 => "ar",
        0x0404 => "zh-tw",
        0x0804 => "zh-cn",
        0x0c04 => "zh-hk",
        0x0405 => "cs",
        0x0406 => "da",
        0x0407 => "de-de",
        0x0807 => "de-ch",
        0x0c07 => "de-at",
        0x0408 => "el",
        0x040a | 0x0c0a => "es-es",
        0x080a => "es-mx",
        0x040b => "fi",
        0x040c => "fr-fr",
        0x0c0c => "fr-ca",
        0x040d => "he",
        0x040e => "hu",
        0x0410 => "it-it",
        0x0411 => "ja",
        0x0412 => "ko",
        0x0413 => "nl-nl",
        0x0414 => "nb",
        0x0415 => "pl",
        0x0416 => "pt-br",
        0x0816 => "pt-pt",
        0x0419 => "ru",
        0x041d => "sv-se",
        0x041e => "th",
        0x041f => "tr",
        0x0422 => "uk",
        0x042a => "vi",
        0x0455 => "my",
        0x0439 => "hi",
        _ => "und",
    }
}

/// Maps `usWidthClass` (1 to 9) to a fontconfig width.
fn width_from_opentype(class: u16) -> i32 {
    match class {
        0 | 1 => WIDTH_ULTRACONDENSED,
        2 => WIDTH_EXTRACONDENSED,
        3 => WIDTH_CONDENSED,
        4 => WIDTH_SEMICONDENSED,
        5 => WIDTH_NORMAL,
        6 => WIDTH_SEMIEXPANDED,
        7 => WIDTH_EXPANDED,
        8 => WIDTH_EXTRAEXPANDED,
        _ => WIDTH_ULTRAEXPANDED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn name_decoding() {
        assert_eq!(decode_utf16_be(&[0, b'A', 0, b'b']), Some("Ab".to_string()));
        assert_eq!(decode_utf16_be(&[0xd8, 0x00]), None);
        assert_eq!(decode_mac_ascii(b"Serif"), Some("Serif".to_string()));
        assert_eq!(decode_mac_ascii(&[0xa5]), None);
    }

    #[test]
    fn name_selection() {
        let names = vec![
            (name_id::FAMILY, "Noto Sans".to_string(), "en-us".to_string()),
            (name_id::FAMILY, "Noto Sans US".to_string(), "en-us".to_string()),
            (name_id::TYPOGRAPHIC_FAMILY, "Noto".to_string(), "en-us".to_string()),
            (name_id::TYPOGRAPHIC_FAMILY, "ノト".to_string(), "ja".to_string()),
        ];
        assert_eq!(
            pick(&names, name_id::TYPOGRAPHIC_FAMILY, name_id::FAMILY),
            vec![
                ("Noto".to_string(), "en-us".to_string()),
                ("ノト".to_string(), "ja".to_string()),
            ]
        );
        assert_eq!(
            pick(&names, name_id::TYPOGRAPHIC_SUBFAMILY, name_id::FAMILY),
            vec![("Noto Sans".to_string(), "en-us".to_string())]
        );
    }

    #[test]
    fn classes() {
        assert_eq!(windows_lang(0x0807), "de-ch");
        assert_eq!(windows_lang(0x7fff), "und");
        assert_eq!(width_from_opentype(5), WIDTH_NORMAL);
        assert_eq!(width_from_opentype(3), WIDTH_CONDENSED);
    }
}

use crate::common::TagExt;
use crate::face::FontFace;
use crate::{script, Script, Tag};

use super::TableIndex;

/// Scripts whose fonts may carry a second (or third) generation Indic tag.
const NEW_STYLE_TAGS: &[(Script, &[&[u8; 4]])] = &[
    (script::BENGALI, &[b"bng3", b"bng2"]),
    (script::DEVANAGARI, &[b"dev3", b"dev2"]),
    (script::GUJARATI, &[b"gjr3", b"gjr2"]),
    (script::GURMUKHI, &[b"gur3", b"gur2"]),
    (script::KANNADA, &[b"knd3", b"knd2"]),
    (script::MALAYALAM, &[b"mlm3", b"mlm2"]),
    (script::ORIYA, &[b"ory3", b"ory2"]),
    (script::TAMIL, &[b"tml3", b"tml2"]),
    (script::TELUGU, &[b"tel3", b"tel2"]),
    (script::MYANMAR, &[b"mym2"]),
];

/// Returns the OpenType script tags to try for `script`, most preferred first.
pub(crate) fn script_tags(script: Option<Script>) -> Vec<Tag> {
    let mut tags = Vec::new();
    let script = match script {
        Some(script) if script != script::COMMON && script != script::INHERITED => script,
        _ => return tags,
    };

    if let Some((_, new_tags)) = NEW_STYLE_TAGS.iter().find(|(s, _)| *s == script) {
        tags.extend(new_tags.iter().map(|t| Tag::from_bytes(t)));
    }

    tags.push(old_tag_from_script(script));
    tags
}

fn old_tag_from_script(script: Script) -> Tag {
    match script {
        script::HIRAGANA => Tag::from_bytes(b"kana"),
        script::LAO => Tag::from_bytes(b"lao "),
        script::YI => Tag::from_bytes(b"yi  "),
        script::NKO => Tag::from_bytes(b"nko "),
        // Zawgyi is an encoding, not a script, fonts use the regular tag.
        script::MYANMAR_ZAWGYI => Tag::from_bytes(b"mymr"),
        _ => script.tag().to_lowercase(),
    }
}

/// Picks the script tag a layout table will be queried with.
///
/// Returns the chosen tag and whether it was one of the requested ones.
pub(crate) fn select_script(face: &dyn FontFace, table: TableIndex, tags: &[Tag]) -> (Option<Tag>, bool) {
    for &tag in tags {
        if face.has_script(table, tag) {
            return (Some(tag), true);
        }
    }

    // Try finding 'DFLT'.
    let dflt = Tag::default_script();
    if face.has_script(table, dflt) {
        return (Some(dflt), false);
    }

    // Try with 'dflt'; MS site has had typos and many fonts use it now :(.
    let dflt = Tag::default_language();
    if face.has_script(table, dflt) {
        return (Some(dflt), false);
    }

    // Try with 'latn'; some old fonts put their features there even though
    // they're really trying to support Thai, for example :(.
    let latn = Tag::from_bytes(b"latn");
    if face.has_script(table, latn) {
        return (Some(latn), false);
    }

    (None, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn myanmar_prefers_new_tag() {
        assert_eq!(
            script_tags(Some(script::MYANMAR)),
            vec![Tag::from_bytes(b"mym2"), Tag::from_bytes(b"mymr")]
        );
    }

    #[test]
    fn special_old_tags() {
        assert_eq!(script_tags(Some(script::LAO)), vec![Tag::from_bytes(b"lao ")]);
        assert_eq!(script_tags(Some(script::HEBREW)), vec![Tag::from_bytes(b"hebr")]);
        assert!(script_tags(Some(script::COMMON)).is_empty());
        assert!(script_tags(None).is_empty());
    }
}

use serde::{Deserialize, Serialize};

/// A font property, the key of a [`Pattern`](super::Pattern) entry.
///
/// The built-in objects are listed as associated constants. Identifiers
/// from [`Object::FIRST_CUSTOM`] on name caller-defined objects, which
/// accept values of any kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Object(pub u16);

bitflags::bitflags! {
    /// The value kinds an object accepts.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct ValueKinds: u8 {
        const BOOL     = 1 << 0;
        const INT      = 1 << 1;
        const FLOAT    = 1 << 2;
        const STRING   = 1 << 3;
        const MATRIX   = 1 << 4;
        const CHARSET  = 1 << 5;
        const RANGE    = 1 << 6;
        const LANG_SET = 1 << 7;

        const NUMBER = Self::INT.bits() | Self::FLOAT.bits();
        const NUMBER_OR_RANGE = Self::NUMBER.bits() | Self::RANGE.bits();
        const LANG_OR_STRING = Self::LANG_SET.bits() | Self::STRING.bits();
    }
}

macro_rules! objects {
    ($($name:ident = $id:literal, $text:literal, $kinds:ident;)+) => {
        impl Object {
            $(pub const $name: Object = Object($id);)+

            const BUILTIN: &'static [(Object, &'static str, ValueKinds)] = &[
                $((Object::$name, $text, ValueKinds::$kinds),)+
            ];
        }
    };
}

objects! {
    FAMILY = 1, "family", STRING;
    FAMILY_LANG = 2, "familylang", STRING;
    STYLE = 3, "style", STRING;
    STYLE_LANG = 4, "stylelang", STRING;
    FULLNAME = 5, "fullname", STRING;
    FULLNAME_LANG = 6, "fullnamelang", STRING;
    SLANT = 7, "slant", NUMBER;
    WEIGHT = 8, "weight", NUMBER_OR_RANGE;
    WIDTH = 9, "width", NUMBER_OR_RANGE;
    SIZE = 10, "size", NUMBER_OR_RANGE;
    ASPECT = 11, "aspect", NUMBER;
    PIXEL_SIZE = 12, "pixelsize", NUMBER;
    SPACING = 13, "spacing", NUMBER;
    FOUNDRY = 14, "foundry", STRING;
    ANTIALIAS = 15, "antialias", BOOL;
    HINT_STYLE = 16, "hintstyle", NUMBER;
    HINTING = 17, "hinting", BOOL;
    VERTICAL_LAYOUT = 18, "verticallayout", BOOL;
    AUTOHINT = 19, "autohint", BOOL;
    GLOBAL_ADVANCE = 20, "globaladvance", BOOL;
    FILE = 21, "file", STRING;
    INDEX = 22, "index", NUMBER;
    RASTERIZER = 23, "rasterizer", STRING;
    OUTLINE = 24, "outline", BOOL;
    SCALABLE = 25, "scalable", BOOL;
    DPI = 26, "dpi", NUMBER;
    RGBA = 27, "rgba", NUMBER;
    SCALE = 28, "scale", NUMBER;
    MINSPACE = 29, "minspace", BOOL;
    CHAR_WIDTH = 30, "charwidth", NUMBER;
    CHAR_HEIGHT = 31, "charheight", NUMBER;
    MATRIX = 32, "matrix", MATRIX;
    CHARSET = 33, "charset", CHARSET;
    LANG = 34, "lang", LANG_OR_STRING;
    FONT_VERSION = 35, "fontversion", NUMBER;
    CAPABILITY = 36, "capability", STRING;
    FONT_FORMAT = 37, "fontformat", STRING;
    EMBOLDEN = 38, "embolden", BOOL;
    EMBEDDED_BITMAP = 39, "embeddedbitmap", BOOL;
    DECORATIVE = 40, "decorative", BOOL;
    LCD_FILTER = 41, "lcdfilter", NUMBER;
    NAME_LANG = 42, "namelang", STRING;
    FONT_FEATURES = 43, "fontfeatures", STRING;
    PRGNAME = 44, "prgname", STRING;
    HASH = 45, "hash", STRING;
    POSTSCRIPT_NAME = 46, "postscriptname", STRING;
    COLOR = 47, "color", BOOL;
    SYMBOL = 48, "symbol", BOOL;
    FONT_VARIATIONS = 49, "fontvariations", STRING;
    VARIABLE = 50, "variable", BOOL;
    FONT_HAS_HINT = 51, "fonthashint", BOOL;
    ORDER = 52, "order", NUMBER;
}

impl Object {
    /// The first identifier available for caller-defined objects.
    pub const FIRST_CUSTOM: Object = Object(256);

    /// Looks up a built-in object by its fontconfig name.
    pub fn from_name(name: &str) -> Option<Object> {
        Self::BUILTIN
            .iter()
            .find(|(_, n, _)| n.eq_ignore_ascii_case(name))
            .map(|(o, _, _)| *o)
    }

    /// The fontconfig name of a built-in object.
    pub fn name(self) -> Option<&'static str> {
        Self::BUILTIN.iter().find(|(o, _, _)| *o == self).map(|(_, n, _)| *n)
    }

    #[inline]
    pub fn is_custom(self) -> bool {
        self >= Self::FIRST_CUSTOM
    }

    /// The value kinds this object accepts.
    ///
    /// Custom and unknown objects accept everything.
    pub fn kinds(self) -> ValueKinds {
        Self::BUILTIN
            .iter()
            .find(|(o, _, _)| *o == self)
            .map_or(ValueKinds::all(), |(_, _, k)| *k)
    }
}

/// Names of caller-defined objects, numbered from [`Object::FIRST_CUSTOM`].
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ObjectRegistry {
    names: Vec<String>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        ObjectRegistry::default()
    }

    /// Resolves a built-in or already registered name.
    pub fn lookup(&self, name: &str) -> Option<Object> {
        Object::from_name(name).or_else(|| {
            self.names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
                .map(|i| Object(Object::FIRST_CUSTOM.0 + i as u16))
        })
    }

    /// Resolves `name`, registering it as a custom object when unknown.
    ///
    /// Returns `None` once the identifier space is exhausted.
    pub fn register(&mut self, name: &str) -> Option<Object> {
        if let Some(object) = self.lookup(name) {
            return Some(object);
        }

        let id = u16::try_from(self.names.len())
            .ok()
            .and_then(|i| Object::FIRST_CUSTOM.0.checked_add(i))?;
        log::debug!("registered custom object '{}' as {}", name, id);
        self.names.push(name.to_ascii_lowercase());
        Some(Object(id))
    }

    /// The name of a built-in or registered object.
    pub fn name(&self, object: Object) -> Option<&str> {
        object.name().or_else(|| {
            let idx = object.0.checked_sub(Object::FIRST_CUSTOM.0)?;
            self.names.get(usize::from(idx)).map(String::as_str)
        })
    }

    pub fn custom_names(&self) -> &[String] {
        &self.names
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "object#{}", self.0),
        }
    }
}

pub const WEIGHT_THIN: i32 = 0;
pub const WEIGHT_EXTRALIGHT: i32 = 40;
pub const WEIGHT_LIGHT: i32 = 50;
pub const WEIGHT_DEMILIGHT: i32 = 55;
pub const WEIGHT_BOOK: i32 = 75;
pub const WEIGHT_REGULAR: i32 = 80;
pub const WEIGHT_NORMAL: i32 = WEIGHT_REGULAR;
pub const WEIGHT_MEDIUM: i32 = 100;
pub const WEIGHT_DEMIBOLD: i32 = 180;
pub const WEIGHT_BOLD: i32 = 200;
pub const WEIGHT_EXTRABOLD: i32 = 205;
pub const WEIGHT_BLACK: i32 = 210;
pub const WEIGHT_EXTRABLACK: i32 = 215;

pub const SLANT_ROMAN: i32 = 0;
pub const SLANT_ITALIC: i32 = 100;
pub const SLANT_OBLIQUE: i32 = 110;

pub const WIDTH_ULTRACONDENSED: i32 = 50;
pub const WIDTH_EXTRACONDENSED: i32 = 63;
pub const WIDTH_CONDENSED: i32 = 75;
pub const WIDTH_SEMICONDENSED: i32 = 87;
pub const WIDTH_NORMAL: i32 = 100;
pub const WIDTH_SEMIEXPANDED: i32 = 113;
pub const WIDTH_EXPANDED: i32 = 125;
pub const WIDTH_EXTRAEXPANDED: i32 = 150;
pub const WIDTH_ULTRAEXPANDED: i32 = 200;

pub const PROPORTIONAL: i32 = 0;
pub const DUAL: i32 = 90;
pub const MONO: i32 = 100;
pub const CHARCELL: i32 = 110;

pub const HINT_NONE: i32 = 0;
pub const HINT_SLIGHT: i32 = 1;
pub const HINT_MEDIUM: i32 = 2;
pub const HINT_FULL: i32 = 3;

/// Symbolic constants usable in rule expressions, with the object they
/// belong to.
const CONSTANTS: &[(&str, Object, i32)] = &[
    ("thin", Object::WEIGHT, WEIGHT_THIN),
    ("extralight", Object::WEIGHT, WEIGHT_EXTRALIGHT),
    ("ultralight", Object::WEIGHT, WEIGHT_EXTRALIGHT),
    ("light", Object::WEIGHT, WEIGHT_LIGHT),
    ("demilight", Object::WEIGHT, WEIGHT_DEMILIGHT),
    ("semilight", Object::WEIGHT, WEIGHT_DEMILIGHT),
    ("book", Object::WEIGHT, WEIGHT_BOOK),
    ("regular", Object::WEIGHT, WEIGHT_REGULAR),
    ("normal", Object::WEIGHT, WEIGHT_NORMAL),
    ("medium", Object::WEIGHT, WEIGHT_MEDIUM),
    ("demibold", Object::WEIGHT, WEIGHT_DEMIBOLD),
    ("semibold", Object::WEIGHT, WEIGHT_DEMIBOLD),
    ("bold", Object::WEIGHT, WEIGHT_BOLD),
    ("extrabold", Object::WEIGHT, WEIGHT_EXTRABOLD),
    ("ultrabold", Object::WEIGHT, WEIGHT_EXTRABOLD),
    ("black", Object::WEIGHT, WEIGHT_BLACK),
    ("heavy", Object::WEIGHT, WEIGHT_BLACK),
    ("extrablack", Object::WEIGHT, WEIGHT_EXTRABLACK),
    ("ultrablack", Object::WEIGHT, WEIGHT_EXTRABLACK),
    ("roman", Object::SLANT, SLANT_ROMAN),
    ("italic", Object::SLANT, SLANT_ITALIC),
    ("oblique", Object::SLANT, SLANT_OBLIQUE),
    ("ultracondensed", Object::WIDTH, WIDTH_ULTRACONDENSED),
    ("extracondensed", Object::WIDTH, WIDTH_EXTRACONDENSED),
    ("condensed", Object::WIDTH, WIDTH_CONDENSED),
    ("semicondensed", Object::WIDTH, WIDTH_SEMICONDENSED),
    ("semiexpanded", Object::WIDTH, WIDTH_SEMIEXPANDED),
    ("expanded", Object::WIDTH, WIDTH_EXPANDED),
    ("extraexpanded", Object::WIDTH, WIDTH_EXTRAEXPANDED),
    ("ultraexpanded", Object::WIDTH, WIDTH_ULTRAEXPANDED),
    ("proportional", Object::SPACING, PROPORTIONAL),
    ("dual", Object::SPACING, DUAL),
    ("mono", Object::SPACING, MONO),
    ("charcell", Object::SPACING, CHARCELL),
    ("unknown", Object::RGBA, 0),
    ("rgb", Object::RGBA, 1),
    ("bgr", Object::RGBA, 2),
    ("vrgb", Object::RGBA, 3),
    ("vbgr", Object::RGBA, 4),
    ("none", Object::RGBA, 5),
    ("hintnone", Object::HINT_STYLE, HINT_NONE),
    ("hintslight", Object::HINT_STYLE, HINT_SLIGHT),
    ("hintmedium", Object::HINT_STYLE, HINT_MEDIUM),
    ("hintfull", Object::HINT_STYLE, HINT_FULL),
    ("lcdnone", Object::LCD_FILTER, 0),
    ("lcddefault", Object::LCD_FILTER, 1),
    ("lcdlight", Object::LCD_FILTER, 2),
    ("lcdlegacy", Object::LCD_FILTER, 3),
];

/// Resolves a symbolic constant such as `bold` or `hintfull`.
pub fn constant(name: &str) -> Option<(Object, i32)> {
    CONSTANTS
        .iter()
        .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, o, v)| (*o, *v))
}

// OpenType usWeightClass to fontconfig weight, piecewise linear.
const WEIGHT_MAP: &[(f64, f64)] = &[
    (0.0, WEIGHT_THIN as f64),
    (100.0, WEIGHT_THIN as f64),
    (200.0, WEIGHT_EXTRALIGHT as f64),
    (300.0, WEIGHT_LIGHT as f64),
    (350.0, WEIGHT_DEMILIGHT as f64),
    (380.0, WEIGHT_BOOK as f64),
    (400.0, WEIGHT_REGULAR as f64),
    (500.0, WEIGHT_MEDIUM as f64),
    (600.0, WEIGHT_DEMIBOLD as f64),
    (700.0, WEIGHT_BOLD as f64),
    (800.0, WEIGHT_EXTRABOLD as f64),
    (900.0, WEIGHT_BLACK as f64),
    (1000.0, WEIGHT_EXTRABLACK as f64),
];

fn lerp(x: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    y1 + (x - x1) * (y2 - y1) / (x2 - x1)
}

/// Converts an OpenType weight (`usWeightClass`) to a fontconfig weight.
///
/// Returns `None` for negative input; weights above 1000 clamp.
pub fn weight_from_opentype(ot_weight: f64) -> Option<f64> {
    if !(ot_weight >= 0.0) {
        return None;
    }

    let ot_weight = ot_weight.min(1000.0);
    let mut i = 1;
    while ot_weight > WEIGHT_MAP[i].0 {
        i += 1;
    }

    let (x2, y2) = WEIGHT_MAP[i];
    if ot_weight == x2 {
        return Some(y2);
    }

    let (x1, y1) = WEIGHT_MAP[i - 1];
    Some(lerp(ot_weight, x1, x2, y1, y2))
}

/// Converts a fontconfig weight to an OpenType weight.
///
/// Returns `None` outside of `WEIGHT_THIN..=WEIGHT_EXTRABLACK`.
pub fn weight_to_opentype(fc_weight: f64) -> Option<f64> {
    if !(0.0..=WEIGHT_EXTRABLACK as f64).contains(&fc_weight) {
        return None;
    }

    let mut i = 0;
    while fc_weight > WEIGHT_MAP[i].1 {
        i += 1;
    }

    let (x2, y2) = WEIGHT_MAP[i];
    if fc_weight == y2 {
        return Some(x2);
    }

    let (x1, y1) = WEIGHT_MAP[i - 1];
    Some(lerp(fc_weight, y1, y2, x1, x2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(Object::from_name("pixelsize"), Some(Object::PIXEL_SIZE));
        assert_eq!(Object::from_name("Family"), Some(Object::FAMILY));
        assert_eq!(Object::from_name("nope"), None);
        assert_eq!(Object::ORDER.to_string(), "order");
        assert_eq!(Object(300).to_string(), "object#300");
    }

    #[test]
    fn kinds() {
        assert_eq!(Object::FAMILY.kinds(), ValueKinds::STRING);
        assert!(Object::WEIGHT.kinds().contains(ValueKinds::RANGE));
        assert!(!Object::SLANT.kinds().contains(ValueKinds::RANGE));
        assert_eq!(Object(300).kinds(), ValueKinds::all());
    }

    #[test]
    fn custom_objects() {
        let mut reg = ObjectRegistry::new();
        assert_eq!(reg.register("weight"), Some(Object::WEIGHT));
        let custom = reg.register("myrendering").unwrap();
        assert_eq!(custom, Object::FIRST_CUSTOM);
        assert_eq!(reg.register("MyRendering"), Some(custom));
        assert_eq!(reg.lookup("other"), None);
        assert_eq!(reg.name(custom), Some("myrendering"));
        assert_eq!(reg.name(Object::SLANT), Some("slant"));
    }

    #[test]
    fn constants() {
        assert_eq!(constant("bold"), Some((Object::WEIGHT, 200)));
        assert_eq!(constant("HintFull"), Some((Object::HINT_STYLE, 3)));
        assert_eq!(constant("sans"), None);
    }

    #[test]
    fn opentype_weights() {
        assert_eq!(weight_from_opentype(400.0), Some(80.0));
        assert_eq!(weight_from_opentype(700.0), Some(200.0));
        assert_eq!(weight_from_opentype(450.0), Some(90.0));
        assert_eq!(weight_from_opentype(5000.0), Some(215.0));
        assert_eq!(weight_from_opentype(-1.0), None);

        assert_eq!(weight_to_opentype(80.0), Some(400.0));
        assert_eq!(weight_to_opentype(0.0), Some(0.0));
        assert_eq!(weight_to_opentype(90.0), Some(450.0));
        assert_eq!(weight_to_opentype(300.0), None);
    }
}

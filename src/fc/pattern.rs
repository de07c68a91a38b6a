use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::charset::Charset;
use super::lang::{Environment, LangSet};
use super::matching::cmp_ignore_blanks_and_case;
use super::object::*;
use super::value::{write_list_hash, Binding, Matrix, Range, Value, ValueElt, ValueList};

/// Why a pattern lookup produced no value.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum GetError {
    #[error("object is not set")]
    NoMatch,
    #[error("no value at this index")]
    NoId,
    #[error("value has another kind")]
    TypeMismatch,
}

/// The canonical content of a pattern, usable as a map key.
///
/// Two patterns have the same key exactly when they are equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PatternKey(Vec<u8>);

/// A multi-valued property bag.
///
/// Queries, candidate fonts and match results all share this type.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct Pattern {
    elts: BTreeMap<Object, ValueList>,
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.hash_key() == other.hash_key()
    }
}

impl Eq for Pattern {}

impl std::hash::Hash for Pattern {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash_key().hash(state);
    }
}

fn admits(object: Object, value: &Value) -> bool {
    object.kinds().intersects(value.kind()) && value.is_finite()
}

macro_rules! typed_getters {
    ($($name:ident, $name_at:ident, $ty:ty, $pat:pat => $out:expr;)+) => {
        $(
            pub fn $name_at(&self, object: Object, id: usize) -> Result<$ty, GetError> {
                match self.get_at(object, id)? {
                    $pat => Ok($out),
                    _ => Err(GetError::TypeMismatch),
                }
            }

            #[inline]
            pub fn $name(&self, object: Object) -> Result<$ty, GetError> {
                self.$name_at(object, 0)
            }
        )+
    };
}

impl Pattern {
    pub fn new() -> Self {
        Pattern::default()
    }

    /// Builds a pattern from `(object, value)` pairs, appending strong values.
    pub fn build(elements: impl IntoIterator<Item = (Object, Value)>) -> Self {
        let mut p = Pattern::new();
        for (object, value) in elements {
            p.add(object, value, true);
        }
        p
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elts.is_empty()
    }

    #[inline]
    pub fn contains(&self, object: Object) -> bool {
        self.elts.contains_key(&object)
    }

    /// Adds a strong value.
    #[inline]
    pub fn add(&mut self, object: Object, value: impl Into<Value>, append: bool) -> bool {
        self.add_with_binding(object, value.into(), Binding::Strong, append)
    }

    pub fn add_with_binding(
        &mut self,
        object: Object,
        value: Value,
        binding: Binding,
        append: bool,
    ) -> bool {
        self.insert_list(object, None, append, &[ValueElt::new(value, binding)])
    }

    /// Adds several values at once.
    ///
    /// When any value has a kind the object does not accept, nothing is
    /// added, a warning is logged and `false` is returned.
    #[inline]
    pub fn add_list(&mut self, object: Object, list: &[ValueElt], append: bool) -> bool {
        self.insert_list(object, None, append, list)
    }

    /// Checks every value against the kinds `object` admits, logging the
    /// first mismatch.
    pub(crate) fn accepts(object: Object, list: &[ValueElt]) -> bool {
        match list.iter().find(|elt| !admits(object, &elt.value)) {
            Some(bad) => {
                log::warn!("{:?} is not a valid value for '{}', ignored", bad.value, object);
                false
            }
            None => true,
        }
    }

    /// Inserts values after (`append`) or before the value at `pos`,
    /// or at the end or start of the list when `pos` is `None`.
    pub(crate) fn insert_list(
        &mut self,
        object: Object,
        pos: Option<usize>,
        append: bool,
        list: &[ValueElt],
    ) -> bool {
        if !Self::accepts(object, list) {
            return false;
        }

        if list.is_empty() {
            return true;
        }

        let values = self.elts.entry(object).or_default();
        let at = match (pos, append) {
            (Some(i), true) => (i + 1).min(values.len()),
            (Some(i), false) => i.min(values.len()),
            (None, true) => values.len(),
            (None, false) => 0,
        };
        values.insert_many(at, list.iter().cloned());
        true
    }

    /// Removes every value of `object`.
    pub fn del(&mut self, object: Object) -> bool {
        self.elts.remove(&object).is_some()
    }

    /// Removes the value at `id`, dropping the object once it has no values.
    pub(crate) fn remove_at(&mut self, object: Object, id: usize) {
        if let Some(values) = self.elts.get_mut(&object) {
            if id < values.len() {
                values.remove(id);
            }
            if values.is_empty() {
                self.elts.remove(&object);
            }
        }
    }

    /// The values of `object`, empty when unset.
    pub fn values(&self, object: Object) -> &[ValueElt] {
        self.elts.get(&object).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Object, &[ValueElt])> {
        self.elts.iter().map(|(o, v)| (*o, v.as_slice()))
    }

    /// The value at position `id` of `object`, without conversion.
    pub fn get_at(&self, object: Object, id: usize) -> Result<&Value, GetError> {
        let values = self.elts.get(&object).ok_or(GetError::NoMatch)?;
        values.get(id).map(|elt| &elt.value).ok_or(GetError::NoId)
    }

    typed_getters! {
        get_bool, get_bool_at, bool, Value::Bool(b) => *b;
        get_int, get_int_at, i32, Value::Int(i) => *i;
        get_string, get_string_at, &str, Value::String(s) => s.as_str();
        get_matrix, get_matrix_at, Matrix, Value::Matrix(m) => *m;
        get_charset, get_charset_at, &Charset, Value::Charset(cs) => cs;
        get_range, get_range_at, Range, Value::Range(r) => *r;
        get_lang_set, get_lang_set_at, &LangSet, Value::LangSet(ls) => ls;
    }

    /// A number at position `id`; integers are widened.
    pub fn get_float_at(&self, object: Object, id: usize) -> Result<f64, GetError> {
        self.get_at(object, id)?
            .as_number()
            .ok_or(GetError::TypeMismatch)
    }

    #[inline]
    pub fn get_float(&self, object: Object) -> Result<f64, GetError> {
        self.get_float_at(object, 0)
    }

    /// All strings of `object`, skipping other kinds.
    pub fn strings(&self, object: Object) -> impl Iterator<Item = &str> {
        self.values(object).iter().filter_map(|elt| elt.value.as_str())
    }

    /// The canonical byte content: objects sorted by id, each followed by
    /// its length-prefixed value list encoding.
    pub fn hash_key(&self) -> PatternKey {
        let mut out = Vec::new();
        let mut tmp = Vec::new();
        for (object, values) in &self.elts {
            if values.is_empty() {
                continue;
            }

            tmp.clear();
            write_list_hash(values, &mut tmp);
            out.extend_from_slice(&object.0.to_be_bytes());
            out.extend_from_slice(&(tmp.len() as u32).to_be_bytes());
            out.extend_from_slice(&tmp);
        }
        PatternKey(out)
    }

    /// Appends every value of `other`, keeping bindings.
    pub fn append(&mut self, other: &Pattern) {
        for (object, values) in other.iter() {
            self.insert_list(object, None, true, values);
        }
    }

    /// Synthesizes full names from family and style names when no full
    /// name is present.
    ///
    /// One name is produced per family language that also has a style,
    /// a "Regular" style being omitted. Variable fonts are left alone.
    pub fn add_fullname(&mut self) -> bool {
        if self.get_bool(Object::VARIABLE) == Ok(true) {
            return true;
        }

        if self.contains(Object::FULLNAME) {
            return true;
        }

        let join = |family: &str, style: &str| {
            let family = family.trim_end();
            let style = style.trim_start();
            if cmp_ignore_blanks_and_case(style, "Regular").is_eq() {
                family.to_string()
            } else {
                format!("{} {}", family, style)
            }
        };

        let mut names: Vec<(String, String)> = Vec::new();
        let family_langs: Vec<&str> = self.strings(Object::FAMILY_LANG).collect();
        if family_langs.is_empty() {
            let (Ok(family), Ok(style)) = (
                self.get_string(Object::FAMILY),
                self.get_string(Object::STYLE),
            ) else {
                return false;
            };
            names.push((join(family, style), "en".to_string()));
        } else {
            for (i, lang) in family_langs.iter().enumerate() {
                let Ok(family) = self.get_string_at(Object::FAMILY, i) else {
                    continue;
                };
                let style_idx = self
                    .strings(Object::STYLE_LANG)
                    .position(|l| l == *lang)
                    .unwrap_or(0);
                let Ok(style) = self.get_string_at(Object::STYLE, style_idx) else {
                    continue;
                };
                names.push((join(family, style), lang.to_string()));
            }
        }

        if names.is_empty() {
            return false;
        }

        for (name, lang) in names {
            self.add(Object::FULLNAME, name, true);
            self.add(Object::FULLNAME_LANG, lang, true);
        }
        true
    }

    /// Supplies defaults for everything matching needs and the query left
    /// unspecified.
    ///
    /// Only absent objects are filled in, so running it twice changes
    /// nothing.
    pub fn substitute_default(&mut self, env: &Environment) {
        const BOOL_DEFAULTS: &[(Object, bool)] = &[
            (Object::HINTING, true),
            (Object::VERTICAL_LAYOUT, false),
            (Object::AUTOHINT, false),
            (Object::GLOBAL_ADVANCE, true),
            (Object::EMBEDDED_BITMAP, true),
            (Object::DECORATIVE, false),
            (Object::SYMBOL, false),
            (Object::VARIABLE, false),
        ];

        if !self.contains(Object::WEIGHT) {
            self.add(Object::WEIGHT, WEIGHT_NORMAL, true);
        }

        if !self.contains(Object::SLANT) {
            self.add(Object::SLANT, SLANT_ROMAN, true);
        }

        if !self.contains(Object::WIDTH) {
            self.add(Object::WIDTH, WIDTH_NORMAL, true);
        }

        for &(object, value) in BOOL_DEFAULTS {
            if !self.contains(object) {
                self.add(object, value, true);
            }
        }

        self.resolve_size();

        if !self.contains(Object::FONT_VERSION) {
            self.add(Object::FONT_VERSION, 0x7fff_ffff, true);
        }

        if !self.contains(Object::HINT_STYLE) {
            self.add(Object::HINT_STYLE, HINT_FULL, true);
        }

        if !self.contains(Object::NAME_LANG) {
            self.add(Object::NAME_LANG, env.lang.as_str(), true);
        }

        if let Ok(namelang) = self.get_at(Object::NAME_LANG, 0).cloned() {
            for object in [Object::FAMILY_LANG, Object::STYLE_LANG, Object::FULLNAME_LANG] {
                if !self.contains(object) {
                    self.add(object, namelang.clone(), true);
                    // Keeps an English name resolvable without outranking
                    // an exact "en" match.
                    self.add_with_binding(object, "en-us".into(), Binding::Weak, true);
                }
            }
        }

        if !self.contains(Object::PRGNAME) && !env.prgname.is_empty() {
            self.add(Object::PRGNAME, env.prgname.as_str(), true);
        }

        if !self.contains(Object::ORDER) {
            self.add(Object::ORDER, 0, true);
        }
    }

    fn resolve_size(&mut self) {
        let size = match self.get_at(Object::SIZE, 0) {
            Ok(Value::Range(r)) => (r.begin + r.end) * 0.5,
            Ok(v) => v.as_number().unwrap_or(12.0),
            Err(_) => 12.0,
        };
        let scale = self.get_float(Object::SCALE).unwrap_or(1.0);
        let dpi = self.get_float(Object::DPI).unwrap_or(75.0);

        let size = match self.get_float(Object::PIXEL_SIZE) {
            Err(GetError::NoMatch) => {
                self.del(Object::SCALE);
                self.add(Object::SCALE, scale, true);
                self.del(Object::DPI);
                self.add(Object::DPI, dpi, true);
                self.add(Object::PIXEL_SIZE, size * scale * dpi / 72.0, true);
                size
            }
            Ok(pixel_size) => {
                let derived = pixel_size / dpi * 72.0 / scale;
                // A size we stored earlier already agrees with the pixel
                // size up to rounding.
                match self.get_at(Object::SIZE, 0) {
                    Ok(Value::Float(f)) if (f - derived).abs() <= 1e-9 * derived.abs().max(1.0) => {
                        return;
                    }
                    _ => derived,
                }
            }
            Err(_) => size,
        };

        self.del(Object::SIZE);
        self.add(Object::SIZE, size, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_checked_insertion() {
        let mut p = Pattern::new();
        assert!(p.add(Object::FAMILY, "DejaVu Sans", true));
        assert!(!p.add(Object::FAMILY, 3, true));
        assert!(!p.add(Object::WEIGHT, "bold", true));
        assert!(p.add(Object::WEIGHT, Range::new(80.0, 200.0), true));
        assert!(p.add(Object(300), Matrix::IDENTITY, true));

        assert_eq!(p.values(Object::FAMILY).len(), 1);
        assert_eq!(p.get_string(Object::FAMILY), Ok("DejaVu Sans"));
        assert_eq!(p.get_int(Object::WEIGHT), Err(GetError::TypeMismatch));
        assert_eq!(p.get_string_at(Object::FAMILY, 1), Err(GetError::NoId));
        assert_eq!(p.get_bool(Object::HINTING), Err(GetError::NoMatch));
    }

    #[test]
    fn list_insertion_is_all_or_nothing() {
        let mut p = Pattern::new();
        let list = [
            ValueElt::new("a".into(), Binding::Strong),
            ValueElt::new(Value::Bool(true), Binding::Strong),
        ];
        assert!(!p.add_list(Object::FAMILY, &list, true));
        assert!(!p.contains(Object::FAMILY));
    }

    #[test]
    fn prepend_and_positional_insert() {
        let mut p = Pattern::build([(Object::FAMILY, "b".into())]);
        p.add(Object::FAMILY, "a", false);
        p.add(Object::FAMILY, "d", true);
        p.insert_list(
            Object::FAMILY,
            Some(1),
            true,
            &[ValueElt::new("c".into(), Binding::Weak)],
        );
        assert_eq!(p.strings(Object::FAMILY).collect::<Vec<_>>(), ["a", "b", "c", "d"]);
        assert_eq!(p.values(Object::FAMILY)[2].binding, Binding::Weak);

        p.remove_at(Object::FAMILY, 0);
        assert_eq!(p.get_string(Object::FAMILY), Ok("b"));
    }

    #[test]
    fn hash_ignores_object_insertion_order() {
        let a = Pattern::build([(Object::FAMILY, "x".into()), (Object::STYLE, "y".into())]);
        let b = Pattern::build([(Object::STYLE, "y".into()), (Object::FAMILY, "x".into())]);
        assert_eq!(a.hash_key(), b.hash_key());
        assert_eq!(a, b);

        let c = Pattern::build([(Object::FAMILY, "x".into()), (Object::FAMILY, "z".into())]);
        let d = Pattern::build([(Object::FAMILY, "z".into()), (Object::FAMILY, "x".into())]);
        assert_ne!(c, d);
    }

    #[test]
    fn fullname_synthesis() {
        let mut p = Pattern::build([
            (Object::FAMILY, "Noto Sans".into()),
            (Object::FAMILY_LANG, "en".into()),
            (Object::STYLE, "Bold".into()),
            (Object::STYLE_LANG, "en".into()),
        ]);
        assert!(p.add_fullname());
        assert_eq!(p.get_string(Object::FULLNAME), Ok("Noto Sans Bold"));
        assert_eq!(p.get_string(Object::FULLNAME_LANG), Ok("en"));

        let mut p = Pattern::build([
            (Object::FAMILY, "Noto Sans ".into()),
            (Object::STYLE, "regular".into()),
        ]);
        assert!(p.add_fullname());
        assert_eq!(p.get_string(Object::FULLNAME), Ok("Noto Sans"));

        let mut p = Pattern::build([
            (Object::FAMILY, "Noto Sans".into()),
            (Object::VARIABLE, true.into()),
        ]);
        assert!(p.add_fullname());
        assert!(!p.contains(Object::FULLNAME));
    }

    #[test]
    fn defaults() {
        let env = Environment::new("de_CH", "viewer");
        let mut p = Pattern::build([(Object::FAMILY, "Arial".into()), (Object::SIZE, 12.into())]);
        p.substitute_default(&env);

        assert_eq!(p.get_int(Object::WEIGHT), Ok(WEIGHT_NORMAL));
        assert_eq!(p.get_int(Object::SLANT), Ok(SLANT_ROMAN));
        assert_eq!(p.get_bool(Object::HINTING), Ok(true));
        assert_eq!(p.get_bool(Object::VARIABLE), Ok(false));
        assert_eq!(p.get_float(Object::PIXEL_SIZE), Ok(12.5));
        assert_eq!(p.get_float(Object::SIZE), Ok(12.0));
        assert_eq!(p.get_string(Object::NAME_LANG), Ok("de-ch"));
        assert_eq!(p.get_string(Object::PRGNAME), Ok("viewer"));
        assert_eq!(p.values(Object::FAMILY_LANG)[1].binding, Binding::Weak);
        assert_eq!(p.get_string_at(Object::FAMILY_LANG, 1), Ok("en-us"));

        let once = p.clone();
        p.substitute_default(&env);
        assert_eq!(p, once);
    }

    #[test]
    fn size_from_pixel_size() {
        let mut p = Pattern::build([(Object::PIXEL_SIZE, 25.0.into()), (Object::DPI, 150.into())]);
        p.substitute_default(&Environment::default());
        let size = p.get_float(Object::SIZE).unwrap();
        assert!((size - 12.0).abs() < 1e-9);
        assert_eq!(p.get_float(Object::PIXEL_SIZE), Ok(25.0));

        let once = p.clone();
        p.substitute_default(&Environment::default());
        assert_eq!(p, once);
    }
}

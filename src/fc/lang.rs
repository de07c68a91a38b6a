use serde::{Deserialize, Serialize};

/// How close two language tags are.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum LangResult {
    Equal = 0,
    DifferentTerritory = 1,
    DifferentLang = 2,
}

/// Lowercases a tag and turns `_` into `-`.
pub fn normalize_lang(tag: &str) -> String {
    tag.trim()
        .chars()
        .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
        .collect()
}

fn primary(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// Compares two language tags, ignoring case and `_`/`-` differences.
///
/// `und` never matches anything.
pub fn lang_compare(a: &str, b: &str) -> LangResult {
    let a = normalize_lang(a);
    let b = normalize_lang(b);

    if primary(&a) == "und" {
        return LangResult::DifferentLang;
    }

    if a == b {
        LangResult::Equal
    } else if primary(&a) == primary(&b) {
        LangResult::DifferentTerritory
    } else {
        LangResult::DifferentLang
    }
}

/// An ordered set of normalized language tags.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct LangSet {
    tags: Vec<String>,
}

impl LangSet {
    pub fn new() -> Self {
        LangSet::default()
    }

    pub fn from_tags<S: AsRef<str>>(tags: impl IntoIterator<Item = S>) -> Self {
        let mut set = LangSet::new();
        for tag in tags {
            set.add(tag.as_ref());
        }
        set
    }

    pub fn add(&mut self, tag: &str) {
        let tag = normalize_lang(tag);
        if tag.is_empty() {
            return;
        }

        if let Err(idx) = self.tags.binary_search(&tag) {
            self.tags.insert(idx, tag);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The best match of `lang` against the set.
    pub fn has_lang(&self, lang: &str) -> LangResult {
        self.iter()
            .map(|tag| lang_compare(lang, tag))
            .min()
            .unwrap_or(LangResult::DifferentLang)
    }

    /// The best match between any two members.
    pub fn compare(&self, other: &LangSet) -> LangResult {
        self.iter()
            .map(|tag| other.has_lang(tag))
            .min()
            .unwrap_or(LangResult::DifferentLang)
    }

    /// Checks that every tag of `other` is covered by a tag of `self`,
    /// a bare language covering all its territories.
    pub fn contains(&self, other: &LangSet) -> bool {
        other.iter().all(|tag| {
            self.iter()
                .any(|own| own == tag || (!own.contains('-') && own == primary(tag)))
        })
    }
}

/// The process-wide inputs of default substitution, made explicit.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Environment {
    /// The default name language, e.g. `de-ch`.
    pub lang: String,
    /// The program name, empty if unknown.
    pub prgname: String,
}

impl Environment {
    pub fn new(lang: &str, prgname: &str) -> Self {
        Environment {
            lang: normalize_lang(lang),
            prgname: prgname.to_string(),
        }
    }

    /// Reads the locale from `LC_ALL`, `LC_CTYPE` and `LANG`, in that order,
    /// and the program name from the first process argument.
    pub fn from_process() -> Self {
        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.is_empty())
            .unwrap_or_default();

        let prgname = std::env::args()
            .next()
            .and_then(|arg0| {
                std::path::Path::new(&arg0)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_default();

        Environment::new(&lang_from_locale(&locale), &prgname)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new("en", "")
    }
}

/// Strips the encoding and modifier of a POSIX locale name.
fn lang_from_locale(locale: &str) -> String {
    let end = locale.find(['.', '@']).unwrap_or(locale.len());
    let lang = &locale[..end];
    if lang.is_empty() || lang == "C" || lang == "POSIX" {
        "en".to_string()
    } else {
        normalize_lang(lang)
    }
}

//! Cached font and fontset lookup on top of a [`Config`].

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use super::config::Config;
use super::lang::Environment;
use super::matching::FontSet;
use super::object::*;
use super::pattern::{Pattern, PatternKey};
use super::value::Matrix;

/// Font sizes are stored in 1/1024 of a point (or pixel, when absolute).
pub const SIZE_SCALE: i32 = 1024;

const FONTSET_CACHE_SIZE: usize = 256;

/// Slant of a requested face.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub enum Style {
    #[default]
    Normal,
    Oblique,
    Italic,
}

/// Width of a requested face.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub enum Stretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    #[default]
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

impl Stretch {
    fn to_width(self) -> i32 {
        match self {
            Stretch::UltraCondensed => WIDTH_ULTRACONDENSED,
            Stretch::ExtraCondensed => WIDTH_EXTRACONDENSED,
            Stretch::Condensed => WIDTH_CONDENSED,
            Stretch::SemiCondensed => WIDTH_SEMICONDENSED,
            Stretch::Normal => WIDTH_NORMAL,
            Stretch::SemiExpanded => WIDTH_SEMIEXPANDED,
            Stretch::Expanded => WIDTH_EXPANDED,
            Stretch::ExtraExpanded => WIDTH_EXTRAEXPANDED,
            Stretch::UltraExpanded => WIDTH_ULTRAEXPANDED,
        }
    }
}

/// A logical font request.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FontDescription {
    /// Family names, most preferred first.
    pub families: Vec<String>,
    /// OpenType weight, 100 to 1000.
    pub weight: u16,
    pub style: Style,
    pub stretch: Stretch,
    /// In units of [`SIZE_SCALE`].
    pub size: i32,
    /// `size` is in device pixels rather than points.
    pub size_is_absolute: bool,
    /// Comma-separated `tag=value` axis settings.
    pub variations: String,
    pub vertical: bool,
}

impl Default for FontDescription {
    fn default() -> Self {
        FontDescription {
            families: Vec::new(),
            weight: 400,
            style: Style::Normal,
            stretch: Stretch::Normal,
            size: 12 * SIZE_SCALE,
            size_is_absolute: false,
            variations: String::new(),
            vertical: false,
        }
    }
}

impl FontDescription {
    /// Creates a description for a comma-separated family list.
    pub fn new(families: &str, size_pt: f64) -> Self {
        FontDescription {
            families: families
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            size: (size_pt * f64::from(SIZE_SCALE)).round() as i32,
            ..FontDescription::default()
        }
    }
}

fn matrix_bits(m: &Matrix) -> [u64; 4] {
    [m.xx.to_bits(), m.xy.to_bits(), m.yx.to_bits(), m.yy.to_bits()]
}

/// Everything that determines a fontset.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FontsetKey {
    desc: FontDescription,
    language: String,
    matrix: [u64; 4],
    pixel_size: i32,
    resolution: u64,
    variations: String,
}

impl FontsetKey {
    fn new(desc: &FontDescription, language: &str, matrix: &Matrix, dpi: f64) -> Self {
        let pixel_size = if desc.size_is_absolute {
            desc.size
        } else {
            (f64::from(desc.size) * dpi / 72.0).round() as i32
        };

        FontsetKey {
            desc: desc.clone(),
            language: language.to_string(),
            matrix: matrix_bits(matrix),
            pixel_size,
            resolution: dpi.to_bits(),
            variations: desc.variations.clone(),
        }
    }

    fn matrix(&self) -> Matrix {
        Matrix {
            xx: f64::from_bits(self.matrix[0]),
            xy: f64::from_bits(self.matrix[1]),
            yx: f64::from_bits(self.matrix[2]),
            yy: f64::from_bits(self.matrix[3]),
        }
    }

    /// The query pattern this request matches with.
    pub fn query_pattern(&self) -> Pattern {
        let desc = &self.desc;
        let mut p = Pattern::new();

        for family in &desc.families {
            p.add(Object::FAMILY, family.as_str(), true);
        }

        if let Some(weight) = weight_from_opentype(f64::from(desc.weight)) {
            p.add(Object::WEIGHT, weight, true);
        }

        let slant = match desc.style {
            Style::Normal => SLANT_ROMAN,
            Style::Oblique => SLANT_OBLIQUE,
            Style::Italic => SLANT_ITALIC,
        };
        p.add(Object::SLANT, slant, true);
        p.add(Object::WIDTH, desc.stretch.to_width(), true);
        p.add(
            Object::PIXEL_SIZE,
            f64::from(self.pixel_size) / f64::from(SIZE_SCALE),
            true,
        );
        p.add(Object::DPI, f64::from_bits(self.resolution), true);

        if !self.language.is_empty() {
            p.add(Object::LANG, self.language.as_str(), true);
        }

        let matrix = self.matrix();
        if matrix != Matrix::IDENTITY {
            p.add(Object::MATRIX, matrix, true);
        }

        if desc.vertical {
            p.add(Object::VERTICAL_LAYOUT, true, true);
        }

        if !self.variations.is_empty() {
            p.add(Object::VARIABLE, true, true);
            p.add(Object::FONT_VARIATIONS, self.variations.as_str(), true);
        }

        p
    }
}

/// Only SFNT flavours can be shaped.
fn is_sfnt(font: &Pattern) -> bool {
    matches!(font.get_string(Object::FONT_FORMAT), Ok("TrueType" | "CFF"))
}

/// The candidates for one substituted query.
///
/// The best match is found up front; the full ranking is computed on
/// first use. Candidates that are not TrueType or CFF are never returned.
pub struct Patterns {
    config: Arc<Config>,
    query: Pattern,
    best: Option<usize>,
    sorted: OnceLock<Vec<usize>>,
}

impl Patterns {
    fn new(config: Arc<Config>, mut query: Pattern, env: &Environment) -> Self {
        config.substitute(&mut query);
        query.substitute_default(env);

        let best = config
            .fonts()
            .best_match(&query)
            .filter(|i| config.fonts().get(*i).map_or(false, is_sfnt));

        Patterns {
            config,
            query,
            best,
            sorted: OnceLock::new(),
        }
    }

    /// The substituted query.
    pub fn query(&self) -> &Pattern {
        &self.query
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn sorted(&self) -> &[usize] {
        self.sorted.get_or_init(|| {
            let supported: Vec<usize> = (0..self.config.fonts().len())
                .filter(|i| self.config.fonts().get(*i).map_or(false, is_sfnt))
                .collect();
            let filtered: FontSet = supported
                .iter()
                .filter_map(|i| self.config.fonts().get(*i).cloned())
                .collect();
            filtered
                .sort(&self.query, true)
                .order
                .into_iter()
                .map(|i| supported[i])
                .collect()
        })
    }

    /// The `i`-th candidate, unprepared.
    pub fn get(&self, i: usize) -> Option<&Pattern> {
        let idx = match (i, self.best) {
            (0, Some(best)) => best,
            _ => *self.sorted().get(i)?,
        };
        self.config.fonts().get(idx)
    }
}

/// Identifies a realized font.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FontKey {
    pattern: PatternKey,
    matrix: [u64; 4],
    variations: String,
}

/// A realized font: a prepared match result plus its rendering transform.
#[derive(Debug)]
pub struct Font {
    pattern: Pattern,
    matrix: Matrix,
    variations: String,
}

impl Font {
    /// The prepared pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn matrix(&self) -> Matrix {
        self.matrix
    }

    pub fn variations(&self) -> &str {
        &self.variations
    }

    pub fn family(&self) -> Option<&str> {
        self.pattern.get_string(Object::FAMILY).ok()
    }

    pub fn file(&self) -> Option<&str> {
        self.pattern.get_string(Object::FILE).ok()
    }

    pub fn index(&self) -> u32 {
        self.pattern.get_int(Object::INDEX).map_or(0, |i| i.max(0) as u32)
    }

    pub fn pixel_size(&self) -> Option<f64> {
        self.pattern.get_float(Object::PIXEL_SIZE).ok()
    }

    /// Checks that the font covers `c`.
    pub fn has_char(&self, c: char) -> bool {
        self.pattern
            .get_charset(Object::CHARSET)
            .map_or(false, |cs| cs.contains(c as u32))
    }
}

type FontCache = Mutex<HashMap<FontKey, Arc<Font>>>;

/// An ordered list of fonts for one request, realized on demand.
pub struct Fontset {
    patterns: Arc<Patterns>,
    font_cache: Arc<FontCache>,
    matrix: Matrix,
    variations: String,
    fonts: Mutex<Vec<Option<Arc<Font>>>>,
}

impl Fontset {
    pub fn patterns(&self) -> &Arc<Patterns> {
        &self.patterns
    }

    /// Realizes the `i`-th font, or returns `None` past the end.
    pub fn font_at(&self, i: usize) -> Option<Arc<Font>> {
        if let Some(Some(font)) = self.fonts.lock().get(i) {
            return Some(font.clone());
        }

        let candidate = self.patterns.get(i)?;
        let prepared = self
            .patterns
            .config()
            .prepare_render(self.patterns.query(), candidate);

        let key = FontKey {
            pattern: prepared.hash_key(),
            matrix: matrix_bits(&self.matrix),
            variations: self.variations.clone(),
        };

        let font = self
            .font_cache
            .lock()
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Font {
                    pattern: prepared,
                    matrix: self.matrix,
                    variations: self.variations.clone(),
                })
            })
            .clone();

        let mut fonts = self.fonts.lock();
        if fonts.len() <= i {
            fonts.resize(i + 1, None);
        }
        fonts[i] = Some(font.clone());
        Some(font)
    }

    /// Iterates over all fonts, realizing them in order.
    pub fn iter(&self) -> impl Iterator<Item = Arc<Font>> + '_ {
        (0..).map_while(move |i| self.font_at(i))
    }

    /// The first font covering `c`.
    pub fn font_for_char(&self, c: char) -> Option<Arc<Font>> {
        self.iter().find(|font| font.has_char(c))
    }
}

/// Maps font requests to fontsets, caching every stage.
pub struct FontMap {
    config: ArcSwap<Config>,
    env: Environment,
    dpi: f64,
    patterns: RwLock<HashMap<PatternKey, Arc<Patterns>>>,
    fonts: Mutex<Arc<FontCache>>,
    fontsets: Mutex<LruCache<FontsetKey, Arc<Fontset>>>,
}

impl FontMap {
    pub fn new(config: Config, env: Environment) -> Self {
        FontMap {
            config: ArcSwap::from_pointee(config),
            env,
            dpi: 96.0,
            patterns: RwLock::new(HashMap::new()),
            fonts: Mutex::new(Arc::default()),
            fontsets: Mutex::new(LruCache::new(
                NonZeroUsize::new(FONTSET_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Sets the resolution used to convert point sizes to pixels.
    pub fn with_resolution(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn resolution(&self) -> f64 {
        self.dpi
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The current configuration.
    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Replaces the configuration and drops every cached result.
    ///
    /// Fontsets handed out earlier keep working against the old
    /// configuration.
    pub fn set_config(&self, config: Config) {
        // Held across the swap so no lookup can cache a result built
        // against the old configuration after the caches are cleared.
        let mut patterns = self.patterns.write();
        let mut fonts = self.fonts.lock();
        let mut fontsets = self.fontsets.lock();

        self.config.store(Arc::new(config));
        patterns.clear();
        *fonts = Arc::default();
        fontsets.clear();
        log::debug!("configuration replaced, font caches cleared");
    }

    fn is_current(&self, config: &Arc<Config>) -> bool {
        Arc::ptr_eq(config, &self.config.load_full())
    }

    /// Returns the fontset for a request, `language` being a tag like
    /// `my` or empty.
    pub fn load_fontset(
        &self,
        desc: &FontDescription,
        language: &str,
        matrix: &Matrix,
    ) -> Arc<Fontset> {
        let key = FontsetKey::new(desc, language, matrix, self.dpi);
        if let Some(fontset) = self.fontsets.lock().get(&key) {
            return fontset.clone();
        }

        let fontset = Arc::new(Fontset {
            patterns: self.patterns_for(key.query_pattern()),
            font_cache: self.fonts.lock().clone(),
            matrix: *matrix,
            variations: key.variations.clone(),
            fonts: Mutex::new(Vec::new()),
        });

        let mut fontsets = self.fontsets.lock();
        if self.is_current(fontset.patterns.config()) {
            fontsets.put(key, fontset.clone());
        }
        fontset
    }

    /// The first font of the request's fontset.
    pub fn load_font(
        &self,
        desc: &FontDescription,
        language: &str,
        matrix: &Matrix,
    ) -> Option<Arc<Font>> {
        self.load_fontset(desc, language, matrix).font_at(0)
    }

    fn patterns_for(&self, query: Pattern) -> Arc<Patterns> {
        let hash = query.hash_key();
        if let Some(patterns) = self.patterns.read().get(&hash) {
            return patterns.clone();
        }

        log::debug!("matching a new query with {} objects", query.len());
        let patterns = Arc::new(Patterns::new(self.config(), query, &self.env));
        let mut cache = self.patterns.write();
        if !self.is_current(patterns.config()) {
            return patterns;
        }
        cache.entry(hash).or_insert(patterns).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fc::Charset;
    use pretty_assertions::assert_eq;

    fn font(family: &str, weight: i32, format: &str, chars: (u32, u32)) -> Pattern {
        let mut p = Pattern::new();
        p.add(Object::FAMILY, family, true);
        p.add(Object::WEIGHT, weight, true);
        p.add(Object::SLANT, SLANT_ROMAN, true);
        p.add(Object::FONT_FORMAT, format, true);
        p.add(Object::CHARSET, Charset::from_ranges([chars]), true);
        p.add(Object::FILE, format!("{}.ttf", family.to_lowercase()), true);
        p
    }

    fn font_map() -> FontMap {
        let mut config = Config::new();
        config.add_font(font("Latin", WEIGHT_REGULAR, "TrueType", (0x20, 0x7e)));
        config.add_font(font("Burmese", WEIGHT_REGULAR, "CFF", (0x1000, 0x109f)));
        config.add_font(font("Legacy", WEIGHT_REGULAR, "Type 1", (0x20, 0x7e)));
        FontMap::new(config, Environment::default())
    }

    #[test]
    fn query_from_description() {
        let mut desc = FontDescription::new("Latin, Burmese", 12.0);
        desc.style = Style::Italic;
        desc.variations = "wght=500".to_string();
        let key = FontsetKey::new(&desc, "my", &Matrix::IDENTITY, 96.0);
        let q = key.query_pattern();

        assert_eq!(q.strings(Object::FAMILY).collect::<Vec<_>>(), vec!["Latin", "Burmese"]);
        assert_eq!(q.get_float(Object::PIXEL_SIZE), Ok(16.0));
        assert_eq!(q.get_float(Object::WEIGHT), Ok(f64::from(WEIGHT_REGULAR)));
        assert_eq!(q.get_int(Object::SLANT), Ok(SLANT_ITALIC));
        assert_eq!(q.get_string(Object::LANG), Ok("my"));
        assert_eq!(q.get_bool(Object::VARIABLE), Ok(true));
        assert!(!q.contains(Object::MATRIX));
    }

    #[test]
    fn fontsets_are_cached() {
        let map = font_map();
        let desc = FontDescription::new("Latin", 12.0);
        let a = map.load_fontset(&desc, "en", &Matrix::IDENTITY);
        let b = map.load_fontset(&desc, "en", &Matrix::IDENTITY);
        assert!(Arc::ptr_eq(&a, &b));

        let c = map.load_fontset(&desc, "de", &Matrix::IDENTITY);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn fonts_are_shared_between_fontsets() {
        let map = font_map();
        let a = map.load_font(&FontDescription::new("Latin", 12.0), "", &Matrix::IDENTITY);
        let b = map.load_font(&FontDescription::new("Latin, Nothing", 12.0), "", &Matrix::IDENTITY);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.family(), Some("Latin"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn non_sfnt_candidates_are_skipped() {
        let map = font_map();
        let fontset = map.load_fontset(&FontDescription::new("Legacy", 12.0), "", &Matrix::IDENTITY);
        let families: Vec<String> = fontset
            .iter()
            .filter_map(|f| f.family().map(str::to_string))
            .collect();
        assert_eq!(families, vec!["Latin".to_string(), "Burmese".to_string()]);
    }

    #[test]
    fn candidates_without_format_are_skipped() {
        let mut unknown = font("Unknown", WEIGHT_REGULAR, "", (0x20, 0x7e));
        unknown.del(Object::FONT_FORMAT);
        let mut config = Config::new();
        config.add_font(unknown);
        config.add_font(font("Latin", WEIGHT_REGULAR, "TrueType", (0x20, 0x7e)));
        let map = FontMap::new(config, Environment::default());

        let fontset = map.load_fontset(&FontDescription::new("Unknown", 12.0), "", &Matrix::IDENTITY);
        let families: Vec<String> = fontset
            .iter()
            .filter_map(|f| f.family().map(str::to_string))
            .collect();
        assert_eq!(families, vec!["Latin".to_string()]);
    }

    #[test]
    fn fallback_by_coverage() {
        let map = font_map();
        let fontset = map.load_fontset(&FontDescription::new("Latin", 12.0), "", &Matrix::IDENTITY);
        let font = fontset.font_for_char('\u{1000}').unwrap();
        assert_eq!(font.family(), Some("Burmese"));
        assert!(fontset.font_for_char('\u{0E01}').is_none());
    }

    #[test]
    fn set_config_clears_caches() {
        let map = font_map();
        let desc = FontDescription::new("Latin", 12.0);
        let before = map.load_fontset(&desc, "", &Matrix::IDENTITY);
        let old_font = before.font_at(0).unwrap();

        map.set_config(map.config().as_ref().clone());
        let after = map.load_fontset(&desc, "", &Matrix::IDENTITY);
        assert!(!Arc::ptr_eq(&before, &after));

        let new_font = after.font_at(0).unwrap();
        assert!(!Arc::ptr_eq(&old_font, &new_font));
        assert_eq!(old_font.pattern(), new_font.pattern());
    }

    #[test]
    fn set_config_under_concurrent_lookups() {
        let map = font_map();
        let old = map.config();
        let mut replacement = Config::new();
        replacement.add_font(font("Padauk", WEIGHT_REGULAR, "TrueType", (0x1000, 0x109f)));

        let desc = FontDescription::new("Latin", 12.0);
        std::thread::scope(|s| {
            for lang in ["", "en", "my", "de"] {
                let (map, old, desc) = (&map, &old, &desc);
                s.spawn(move || {
                    for _ in 0..500 {
                        let fontset = map.load_fontset(desc, lang, &Matrix::IDENTITY);
                        let families: Vec<String> = fontset
                            .iter()
                            .filter_map(|f| f.family().map(str::to_string))
                            .collect();
                        if Arc::ptr_eq(fontset.patterns().config(), old) {
                            assert_eq!(families, vec!["Latin".to_string(), "Burmese".to_string()]);
                        } else {
                            assert_eq!(families, vec!["Padauk".to_string()]);
                        }
                    }
                });
            }

            s.spawn(|| {
                std::thread::yield_now();
                map.set_config(replacement);
            });
        });

        let current = map.config();
        assert!(!Arc::ptr_eq(&current, &old));
        assert!(map.patterns.read().values().all(|p| Arc::ptr_eq(p.config(), &current)));
        assert!(map
            .fontsets
            .lock()
            .iter()
            .all(|(_, f)| Arc::ptr_eq(f.patterns().config(), &current)));

        map.set_config(current.as_ref().clone());
        assert!(map.patterns.read().is_empty());
        assert!(map.fonts.lock().lock().is_empty());
        assert_eq!(map.fontsets.lock().len(), 0);
    }
}

use serde::{Deserialize, Serialize};

use super::lang::{lang_compare, Environment};
use super::matching::{FontSet, SortedFonts};
use super::object::{Object, ObjectRegistry};
use super::parse::parse_rules;
use super::pattern::Pattern;
use super::rules::{apply_rules, MatchKind, Rule};
use super::value::{Value, ValueElt};
use crate::Error;

/// The text of one rule file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RuleSource {
    /// Used in error messages.
    pub name: String,
    pub text: String,
}

impl RuleSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        RuleSource {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// The rules used when no usable configuration could be loaded.
const FALLBACK_RULES: &str = r#"
# Make sure every query ends with a generic family.
match pattern {
    test all family != "sans-serif";
    test all family != "serif";
    test all family != "monospace";
    edit family append_last weak "sans-serif";
}

match pattern {
    test family == "sans-serif";
    edit family append weak "DejaVu Sans", "Noto Sans", "Liberation Sans";
}

match pattern {
    test family == "serif";
    edit family append weak "DejaVu Serif", "Noto Serif", "Liberation Serif";
}

match pattern {
    test family == "monospace";
    edit family append weak "DejaVu Sans Mono", "Noto Sans Mono", "Liberation Mono";
}

# Synthetic oblique for upright faces.
match font {
    test pattern.slant != roman;
    test font.slant == roman;
    edit matrix assign matrix * matrix(1, 0.2, 0, 1);
    edit slant assign oblique;
}

# Synthetic bold for light faces.
match font {
    test pattern.weight >= demibold;
    test font.weight <= medium;
    edit embolden assign true;
    edit weight assign bold;
}
"#;

/// An immutable rule set and candidate pool.
///
/// Replace the whole value to reconfigure; see
/// [`FontMap::set_config`](super::FontMap::set_config).
#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct Config {
    rules: Vec<Rule>,
    fonts: FontSet,
    objects: ObjectRegistry,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Parses the sources in order into one rule list.
    pub fn load(sources: &[RuleSource]) -> Result<Config, Error> {
        let mut config = Config::new();
        for source in sources {
            config.add_rules(source)?;
        }
        Ok(config)
    }

    /// Like [`load`](Self::load), substituting the built-in rules on failure.
    pub fn load_or_fallback(sources: &[RuleSource]) -> Config {
        match Config::load(sources) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}, using the fallback configuration", e);
                Config::fallback()
            }
        }
    }

    /// The built-in rule set: generic family completion and synthetic
    /// emboldening and obliquing.
    pub fn fallback() -> Config {
        let mut config = Config::new();
        if let Err(e) = config.add_rules(&RuleSource::new("<fallback>", FALLBACK_RULES)) {
            log::error!("{}", e);
        }
        config
    }

    /// Appends the rules of another source.
    ///
    /// On error the configuration is left unchanged.
    pub fn add_rules(&mut self, source: &RuleSource) -> Result<(), Error> {
        let mut objects = self.objects.clone();
        let rules = parse_rules(&source.name, &source.text, &mut objects)?;
        log::debug!("loaded {} rules from '{}'", rules.len(), source.name);
        self.rules.extend(rules);
        self.objects = objects;
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    /// Adds a candidate font after running the `scan` rules on it.
    pub fn add_font(&mut self, mut font: Pattern) {
        apply_rules(&self.rules, MatchKind::Scan, &mut font, None);
        self.fonts.add(font);
    }

    /// Runs the `pattern` stage rules on a query.
    pub fn substitute(&self, query: &mut Pattern) {
        apply_rules(&self.rules, MatchKind::Pattern, query, None);
    }

    /// Runs the `font` stage rules on a match result.
    pub fn substitute_with_pat(&self, font: &mut Pattern, query: &Pattern) {
        apply_rules(&self.rules, MatchKind::Font, font, Some(query));
    }

    /// The prepared best match for an already substituted query.
    pub fn font_match(&self, query: &Pattern) -> Option<Pattern> {
        let idx = self.fonts.best_match(query)?;
        let font = self.fonts.get(idx)?;
        Some(self.prepare_render(query, font))
    }

    /// Ranks the pool for an already substituted query.
    pub fn font_sort(&self, query: &Pattern, trim: bool) -> SortedFonts {
        self.fonts.sort(query, trim)
    }

    /// Builds the pattern describing how `font` renders `query`.
    pub fn prepare_render(&self, query: &Pattern, font: &Pattern) -> Pattern {
        let mut out = Pattern::new();

        for (object, values) in font.iter() {
            match object {
                Object::FAMILY => copy_localized(&mut out, query, font, object, Object::FAMILY_LANG),
                Object::STYLE => copy_localized(&mut out, query, font, object, Object::STYLE_LANG),
                Object::FULLNAME => {
                    copy_localized(&mut out, query, font, object, Object::FULLNAME_LANG)
                }
                Object::FAMILY_LANG | Object::STYLE_LANG | Object::FULLNAME_LANG => {}
                Object::MATRIX => {
                    let composed = match (query.get_matrix(object), font.get_matrix(object)) {
                        (Ok(q), Ok(f)) => q.multiply(&f),
                        (_, Ok(f)) => f,
                        _ => continue,
                    };
                    out.add(object, composed, true);
                }
                _ => {
                    out.add_list(object, values, true);
                }
            }
        }

        for (object, values) in query.iter() {
            let is_lang = matches!(
                object,
                Object::FAMILY_LANG | Object::STYLE_LANG | Object::FULLNAME_LANG
            );
            if !is_lang && !font.contains(object) {
                out.add_list(object, values, true);
            }
        }

        self.substitute_with_pat(&mut out, query);
        out.substitute_default(&environment_of(query));
        out
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Config, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Copies a localized name object, the value whose language best matches
/// the query first, along with its language object.
fn copy_localized(out: &mut Pattern, query: &Pattern, font: &Pattern, object: Object, lang_object: Object) {
    let names = font.values(object);
    let langs = font.values(lang_object);
    let wanted: Vec<&str> = query.strings(lang_object).collect();

    // Best (language match, query preference) over the font's languages.
    let best = langs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < names.len())
        .filter_map(|(i, elt)| {
            let lang = elt.value.as_str()?;
            wanted
                .iter()
                .enumerate()
                .map(|(j, w)| (lang_compare(w, lang), j))
                .min()
                .map(|score| (score, i))
        })
        .min()
        .map_or(0, |(_, i)| i);

    let reorder = |list: &[ValueElt]| -> Vec<ValueElt> {
        let mut list = list.to_vec();
        if best < list.len() {
            let chosen = list.remove(best);
            list.insert(0, chosen);
        }
        list
    };

    out.add_list(object, &reorder(names), true);
    if !langs.is_empty() {
        out.add_list(lang_object, &reorder(langs), true);
    }
}

/// Recovers the environment a defaulted query was built with.
fn environment_of(query: &Pattern) -> Environment {
    let lang = match query.get_at(Object::NAME_LANG, 0) {
        Ok(Value::String(s)) => s.as_str(),
        _ => "en",
    };
    Environment::new(lang, query.get_string(Object::PRGNAME).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fc::Matrix;
    use crate::fc::object::{SLANT_ITALIC, SLANT_OBLIQUE, SLANT_ROMAN, WEIGHT_BOLD, WEIGHT_REGULAR};
    use pretty_assertions::assert_eq;

    fn query(config: &Config, family: &str) -> Pattern {
        let mut p = Pattern::build([(Object::FAMILY, family.into())]);
        config.substitute(&mut p);
        p.substitute_default(&Environment::default());
        p
    }

    #[test]
    fn fallback_completes_generic_families() {
        let config = Config::fallback();
        assert_eq!(config.rules().len(), 6);

        let p = query(&config, "Comic Neue");
        let families: Vec<&str> = p.strings(Object::FAMILY).collect();
        assert_eq!(
            families,
            ["Comic Neue", "sans-serif", "DejaVu Sans", "Noto Sans", "Liberation Sans"]
        );

        let p = query(&config, "monospace");
        assert_eq!(p.get_string_at(Object::FAMILY, 1), Ok("DejaVu Sans Mono"));
    }

    #[test]
    fn load_failure_falls_back() {
        let bad = [RuleSource::new("broken.conf", "match pattern { edit }")];
        assert!(matches!(Config::load(&bad), Err(Error::Parse { line: 1, .. })));
        assert_eq!(Config::load_or_fallback(&bad), Config::fallback());

        let deep = format!(
            "match pattern {{ test family == {}1{}; }}",
            "(".repeat(20_000),
            ")".repeat(20_000)
        );
        let deep = [RuleSource::new("deep.conf", deep)];
        assert_eq!(Config::load_or_fallback(&deep), Config::fallback());
    }

    #[test]
    fn failed_source_leaves_config_untouched() {
        let mut config = Config::fallback();
        let before = config.clone();
        let bad = RuleSource::new("x.conf", "match pattern { test newobj == 1; edit }");
        assert!(config.add_rules(&bad).is_err());
        assert_eq!(config, before);
    }

    #[test]
    fn synthetic_styles() {
        let mut config = Config::fallback();
        config.add_font(Pattern::build([
            (Object::FAMILY, "Sans".into()),
            (Object::WEIGHT, WEIGHT_REGULAR.into()),
            (Object::SLANT, SLANT_ROMAN.into()),
        ]));

        let mut q = Pattern::build([
            (Object::FAMILY, "Sans".into()),
            (Object::WEIGHT, WEIGHT_BOLD.into()),
            (Object::SLANT, SLANT_ITALIC.into()),
        ]);
        config.substitute(&mut q);
        q.substitute_default(&Environment::default());

        let result = config.font_match(&q).unwrap();
        assert_eq!(result.get_bool(Object::EMBOLDEN), Ok(true));
        assert_eq!(result.get_int(Object::WEIGHT), Ok(WEIGHT_BOLD));
        assert_eq!(result.get_int(Object::SLANT), Ok(SLANT_OBLIQUE));
        assert_eq!(result.get_matrix(Object::MATRIX).map(|m| m.xy), Ok(0.2));
        assert_eq!(result.get_string(Object::FAMILY), Ok("Sans"));
    }

    #[test]
    fn localized_names_follow_the_query_language() {
        let config = Config::new();
        let font = Pattern::build([
            (Object::FAMILY, "Nuvola".into()),
            (Object::FAMILY, "Wolke".into()),
            (Object::FAMILY_LANG, "it".into()),
            (Object::FAMILY_LANG, "de".into()),
            (Object::WEIGHT, 80.into()),
        ]);

        let mut q = Pattern::build([(Object::FAMILY, "Wolke".into())]);
        q.substitute_default(&Environment::new("de_AT", ""));
        let out = config.prepare_render(&q, &font);
        assert_eq!(out.strings(Object::FAMILY).collect::<Vec<_>>(), ["Wolke", "Nuvola"]);
        assert_eq!(out.get_string(Object::FAMILY_LANG), Ok("de"));
        // Objects the font lacks come from the query.
        assert!(out.contains(Object::PIXEL_SIZE));
        assert_eq!(out.get_int(Object::WEIGHT), Ok(80));
    }

    #[test]
    fn snapshot_round_trip() {
        let mut config = Config::fallback();
        config
            .add_rules(&RuleSource::new(
                "custom.conf",
                "match scan { test myflag == true; edit myflag assign false; }",
            ))
            .unwrap();
        config.add_font(Pattern::build([
            (Object::FAMILY, "DejaVu Sans".into()),
            (Object::SIZE, crate::fc::Range::new(6.0, 72.0).into()),
            (Object::PIXEL_SIZE, 12.5.into()),
        ]));

        let json = config.to_json().unwrap();
        let restored = Config::from_json(&json).unwrap();
        assert_eq!(restored, config);
        assert_eq!(restored.objects().custom_names(), ["myflag"]);
        assert!(matches!(Config::from_json("{"), Err(Error::Snapshot(_))));
    }

    #[test]
    fn overflowing_edits_keep_snapshots_loadable() {
        let mut config = Config::load(&[RuleSource::new(
            "square.conf",
            "match pattern { edit pixelsize assign pixelsize * pixelsize; }",
        )])
        .unwrap();

        let mut q = Pattern::build([(Object::PIXEL_SIZE, 1e300.into())]);
        config.substitute(&mut q);
        assert_eq!(q.get_float(Object::PIXEL_SIZE), Ok(1e300));

        assert!(!q.add(Object::PIXEL_SIZE, f64::NAN, true));
        assert!(!q.add(Object::MATRIX, Matrix { xx: f64::INFINITY, ..Matrix::IDENTITY }, true));

        config.add_font(q);
        let restored = Config::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }
}

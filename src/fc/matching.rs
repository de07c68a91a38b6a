use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::charset::Charset;
use super::lang::{lang_compare, LangResult};
use super::object::Object;
use super::pattern::Pattern;
use super::value::{Binding, Value, ValueElt};

/// Compares two strings, ignoring spaces and case.
pub(crate) fn cmp_ignore_blanks_and_case(a: &str, b: &str) -> Ordering {
    let fold = |s: &str| {
        s.chars()
            .filter(|c| *c != ' ')
            .flat_map(char::to_lowercase)
            .collect::<Vec<_>>()
    };
    fold(a).cmp(&fold(b))
}

#[derive(Clone, Copy)]
enum Comparator {
    /// Exact string equality.
    Filename,
    /// Case-insensitive equality.
    String,
    /// Equality ignoring blanks and case.
    Family,
    /// Like `Family`, also ignoring `-` separators.
    PostScript,
    Bool,
    Number,
    /// Zero when the values overlap, otherwise the gap between them.
    Range,
    Charset,
    Lang,
}

impl Comparator {
    /// The distance between a query value and a font value, or `None` when
    /// their kinds cannot be compared.
    fn compare(self, query: &Value, font: &Value) -> Option<f64> {
        let query = query.clone().promote(font);
        let font = font.clone().promote(&query);
        let differs = |b: bool| if b { 1.0 } else { 0.0 };

        match self {
            Comparator::Filename => Some(differs(query.as_str()? != font.as_str()?)),
            Comparator::String => {
                let (a, b) = (query.as_str()?, font.as_str()?);
                Some(differs(!a.to_lowercase().eq(&b.to_lowercase())))
            }
            Comparator::Family => Some(differs(
                cmp_ignore_blanks_and_case(query.as_str()?, font.as_str()?).is_ne(),
            )),
            Comparator::PostScript => {
                let strip = |s: &str| s.replace('-', "");
                Some(differs(
                    cmp_ignore_blanks_and_case(&strip(query.as_str()?), &strip(font.as_str()?))
                        .is_ne(),
                ))
            }
            Comparator::Bool => match (query, font) {
                (Value::Bool(a), Value::Bool(b)) => Some(differs(a != b)),
                _ => None,
            },
            Comparator::Number => Some((query.as_number()? - font.as_number()?).abs()),
            Comparator::Range => match (query, font) {
                (Value::Range(a), Value::Range(b)) => {
                    if a.end < b.begin {
                        Some(b.begin - a.end)
                    } else if b.end < a.begin {
                        Some(a.begin - b.end)
                    } else {
                        Some(0.0)
                    }
                }
                (a, b) => Some((a.as_number()? - b.as_number()?).abs()),
            },
            Comparator::Charset => match (query, font) {
                (Value::Charset(need), Value::Charset(have)) => {
                    Some(f64::from(need.subtract_count(&have)))
                }
                _ => None,
            },
            Comparator::Lang => {
                let result = match (&query, &font) {
                    (Value::LangSet(a), Value::LangSet(b)) => a.compare(b),
                    (Value::LangSet(a), Value::String(b)) => a.has_lang(b),
                    (Value::String(a), Value::LangSet(b)) => b.has_lang(a),
                    (Value::String(a), Value::String(b)) => lang_compare(a, b),
                    _ => return None,
                };
                Some(match result {
                    LangResult::Equal => 0.0,
                    LangResult::DifferentTerritory => 1.0,
                    LangResult::DifferentLang => 2.0,
                })
            }
        }
    }
}

/// One entry of the priority list: an object, its comparator and the
/// score slots its strong and weak query values land in.
struct Matcher {
    object: Object,
    comparator: Comparator,
    strong: usize,
    weak: usize,
}

const fn matcher(object: Object, comparator: Comparator, slot: usize) -> Matcher {
    Matcher {
        object,
        comparator,
        strong: slot,
        weak: slot,
    }
}

const SLOT_COUNT: usize = 27;

#[rustfmt::skip]
const MATCHERS: &[Matcher] = &[
    matcher(Object::FILE, Comparator::Filename, 0),
    matcher(Object::FONT_FORMAT, Comparator::String, 1),
    matcher(Object::VARIABLE, Comparator::Bool, 2),
    matcher(Object::SCALABLE, Comparator::Bool, 3),
    matcher(Object::COLOR, Comparator::Bool, 4),
    matcher(Object::FOUNDRY, Comparator::String, 5),
    matcher(Object::CHARSET, Comparator::Charset, 6),
    Matcher { object: Object::FAMILY, comparator: Comparator::Family, strong: 7, weak: 10 },
    Matcher { object: Object::POSTSCRIPT_NAME, comparator: Comparator::PostScript, strong: 8, weak: 11 },
    matcher(Object::LANG, Comparator::Lang, 9),
    matcher(Object::SYMBOL, Comparator::Bool, 12),
    matcher(Object::SPACING, Comparator::Number, 13),
    matcher(Object::SIZE, Comparator::Range, 14),
    matcher(Object::PIXEL_SIZE, Comparator::Range, 15),
    matcher(Object::STYLE, Comparator::String, 16),
    matcher(Object::SLANT, Comparator::Number, 17),
    matcher(Object::WEIGHT, Comparator::Range, 18),
    matcher(Object::WIDTH, Comparator::Range, 19),
    matcher(Object::FONT_HAS_HINT, Comparator::Bool, 20),
    matcher(Object::DECORATIVE, Comparator::Bool, 21),
    matcher(Object::ANTIALIAS, Comparator::Bool, 22),
    matcher(Object::RASTERIZER, Comparator::String, 23),
    matcher(Object::OUTLINE, Comparator::Bool, 24),
    matcher(Object::ORDER, Comparator::Number, 25),
    matcher(Object::FONT_VERSION, Comparator::Number, 26),
];

/// The distance between a query and a font, one slot per priority level.
///
/// Scores order lexicographically, earlier slots dominating.
#[derive(Clone, Copy, Debug)]
pub struct Score([f64; SLOT_COUNT]);

impl Score {
    pub fn slots(&self) -> &[f64] {
        &self.0
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// Scores one object: the best `comparator * 1000 + j` over every query
/// value `j` and font value, overall and per query binding.
///
/// A binding with no query values scores zero; values that compare with
/// nothing score infinity.
fn compare_lists(comparator: Comparator, query: &[ValueElt], font: &[ValueElt]) -> (f64, f64, f64) {
    let mut best = f64::INFINITY;
    let mut best_strong = f64::INFINITY;
    let mut best_weak = f64::INFINITY;

    for (j, q) in query.iter().enumerate() {
        for f in font {
            let Some(d) = comparator.compare(&q.value, &f.value) else {
                continue;
            };
            let d = d * 1000.0 + j as f64;
            best = best.min(d);
            if q.binding == Binding::Weak {
                best_weak = best_weak.min(d);
            } else {
                best_strong = best_strong.min(d);
            }
        }
    }

    let has_weak = query.iter().any(|q| q.binding == Binding::Weak);
    let has_strong = query.iter().any(|q| q.binding != Binding::Weak);
    (
        best,
        if has_strong { best_strong } else { 0.0 },
        if has_weak { best_weak } else { 0.0 },
    )
}

/// Computes the distance vector between a query and a candidate font.
pub fn score(query: &Pattern, font: &Pattern) -> Score {
    let mut slots = [0.0; SLOT_COUNT];
    for m in MATCHERS {
        let q = query.values(m.object);
        let f = font.values(m.object);
        if q.is_empty() || f.is_empty() {
            continue;
        }

        let (best, strong, weak) = compare_lists(m.comparator, q, f);
        if m.strong == m.weak {
            slots[m.strong] += best;
        } else {
            slots[m.strong] += strong;
            slots[m.weak] += weak;
        }
    }
    Score(slots)
}

/// An ordered pool of candidate font patterns.
///
/// The pool order is the final tie-break of every ranking.
#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct FontSet {
    fonts: Vec<Pattern>,
}

/// The outcome of [`FontSet::sort`].
#[derive(Clone, PartialEq, Debug)]
pub struct SortedFonts {
    /// Indices into the pool, best first.
    pub order: Vec<usize>,
    /// The union of the listed fonts' charsets.
    pub coverage: Charset,
}

impl FontSet {
    pub fn new() -> Self {
        FontSet::default()
    }

    pub fn add(&mut self, font: Pattern) {
        self.fonts.push(font);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.fonts.get(index)
    }

    pub fn fonts(&self) -> &[Pattern] {
        &self.fonts
    }

    /// The index of the closest font, the earliest one on ties.
    ///
    /// Only an empty pool has no match.
    pub fn best_match(&self, query: &Pattern) -> Option<usize> {
        let mut best: Option<(usize, Score)> = None;
        for (i, font) in self.fonts.iter().enumerate() {
            let s = score(query, font);
            if best.as_ref().map_or(true, |(_, b)| s < *b) {
                best = Some((i, s));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Ranks the whole pool, preserving pool order between equal scores.
    ///
    /// With `trim`, fonts after the first that add no code points to the
    /// coverage gathered so far are dropped.
    pub fn sort(&self, query: &Pattern, trim: bool) -> SortedFonts {
        let mut scored: Vec<(usize, Score)> = self
            .fonts
            .iter()
            .enumerate()
            .map(|(i, font)| (i, score(query, font)))
            .collect();
        scored.sort_by(|a, b| a.1.cmp(&b.1));

        let mut coverage = Charset::new();
        let mut order = Vec::with_capacity(scored.len());
        for (i, _) in scored {
            let charset = self.fonts[i].get_charset(Object::CHARSET).ok();
            let adds = charset.map_or(false, |cs| !cs.is_subset(&coverage));
            if !trim || order.is_empty() || adds {
                if let Some(cs) = charset {
                    coverage = coverage.union(cs);
                }
                order.push(i);
            }
        }

        SortedFonts { order, coverage }
    }
}

impl FromIterator<Pattern> for FontSet {
    fn from_iter<T: IntoIterator<Item = Pattern>>(iter: T) -> Self {
        FontSet {
            fonts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fc::object::{WEIGHT_BOLD, WEIGHT_MEDIUM};
    use crate::fc::Range;
    use pretty_assertions::assert_eq;

    fn family(name: &str) -> Pattern {
        Pattern::build([(Object::FAMILY, name.into())])
    }

    #[test]
    fn blanks_and_case() {
        assert!(cmp_ignore_blanks_and_case("Deja Vu SANS", "dejavusans").is_eq());
        assert!(cmp_ignore_blanks_and_case("a", "b").is_lt());
    }

    #[test]
    fn family_dominates_weight() {
        let query = Pattern::build([
            (Object::FAMILY, "Arial".into()),
            (Object::WEIGHT, WEIGHT_BOLD.into()),
        ]);
        let fonts: FontSet = [
            Pattern::build([
                (Object::FAMILY, "Helvetica".into()),
                (Object::WEIGHT, WEIGHT_BOLD.into()),
            ]),
            Pattern::build([
                (Object::FAMILY, "arial".into()),
                (Object::WEIGHT, WEIGHT_MEDIUM.into()),
            ]),
        ]
        .into_iter()
        .collect();
        assert_eq!(fonts.best_match(&query), Some(1));
    }

    #[test]
    fn earlier_query_values_win() {
        let mut query = family("Foo");
        query.add(Object::FAMILY, "Bar", true);
        let s_foo = score(&query, &family("Foo"));
        let s_bar = score(&query, &family("Bar"));
        assert!(s_foo < s_bar);
        assert_eq!(s_bar.slots()[7], 1.0);
    }

    #[test]
    fn weak_family_uses_its_own_slot() {
        let mut query = family("Foo");
        query.add_with_binding(Object::FAMILY, "Bar".into(), Binding::Weak, true);
        let s = score(&query, &family("Bar"));
        assert_eq!(s.slots()[7], 1000.0);
        assert_eq!(s.slots()[10], 1.0);
    }

    #[test]
    fn ranges_and_incomparable_kinds() {
        let query = Pattern::build([(Object::WEIGHT, Range::new(80.0, 100.0).into())]);
        let inside = Pattern::build([(Object::WEIGHT, 90.into())]);
        let outside = Pattern::build([(Object::WEIGHT, 200.into())]);
        assert_eq!(score(&query, &inside).slots()[18], 0.0);
        assert_eq!(score(&query, &outside).slots()[18], 100_000.0);

        let q = [ValueElt::new(Value::Bool(true), Binding::Strong)];
        let f = [ValueElt::new(Value::Int(1), Binding::Strong)];
        let (best, strong, weak) = compare_lists(Comparator::Bool, &q, &f);
        assert!(best.is_infinite() && strong.is_infinite());
        assert_eq!(weak, 0.0);

        let query = Pattern::build([(Object::STYLE, "Bold".into())]);
        let mut font = Pattern::new();
        font.add(Object::STYLE, 1, true);
        assert!(!font.contains(Object::STYLE));
        assert_eq!(score(&query, &font).slots()[16], 0.0);
    }

    #[test]
    fn sort_is_stable_and_trims() {
        let cs = |a: u32, b: u32| -> Value { Charset::from_ranges([(a, b)]).into() };
        let fonts: FontSet = [
            Pattern::build([(Object::FAMILY, "A".into()), (Object::CHARSET, cs(0x41, 0x5a))]),
            Pattern::build([(Object::FAMILY, "B".into()), (Object::CHARSET, cs(0x41, 0x50))]),
            Pattern::build([(Object::FAMILY, "C".into()), (Object::CHARSET, cs(0x30, 0x39))]),
        ]
        .into_iter()
        .collect();

        let query = family("Z");
        let all = fonts.sort(&query, false);
        assert_eq!(all.order, vec![0, 1, 2]);

        let trimmed = fonts.sort(&query, true);
        assert_eq!(trimmed.order, vec![0, 2]);
        assert_eq!(trimmed.coverage.ranges(), &[(0x30, 0x39), (0x41, 0x5a)]);
    }

    #[test]
    fn empty_pool() {
        assert_eq!(FontSet::new().best_match(&family("A")), None);
        assert!(FontSet::new().sort(&family("A"), true).order.is_empty());
    }
}

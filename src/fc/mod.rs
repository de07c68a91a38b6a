/*!
Font description, matching and configuration.

A [`Pattern`] describes either a request or a candidate font. A [`Config`]
rewrites requests with its rules and ranks its candidate pool against them;
[`FontMap`] caches the results per logical [`FontDescription`].

```
use fontweave::fc::{Config, Object, Pattern};

let mut config = Config::fallback();
let mut font = Pattern::new();
font.add(Object::FAMILY, "DejaVu Sans", true);
config.add_font(font);

let mut query = Pattern::new();
query.add(Object::FAMILY, "sans-serif", true);
config.substitute(&mut query);

let found = config.font_match(&query).unwrap();
assert_eq!(found.get_string(Object::FAMILY), Ok("DejaVu Sans"));
```
*/

mod charset;
mod config;
mod expr;
mod fontmap;
mod lang;
mod matching;
pub mod object;
mod parse;
mod pattern;
mod rules;
pub mod scan;
mod value;

pub use charset::Charset;
pub use config::{Config, RuleSource};
pub use expr::{BinaryOp, CompareOp, Expr, Qualifier, UnaryOp};
pub use fontmap::{
    Font, FontDescription, FontKey, FontMap, Fontset, FontsetKey, Patterns, Stretch, Style,
    SIZE_SCALE,
};
pub use lang::{lang_compare, normalize_lang, Environment, LangResult, LangSet};
pub use matching::{score, FontSet, Score, SortedFonts};
pub use object::{weight_from_opentype, weight_to_opentype, Object, ObjectRegistry, ValueKinds};
pub use pattern::{GetError, Pattern, PatternKey};
pub use rules::{Edit, EditMode, MatchKind, Rule, Test, TestQual};
pub use value::{Binding, Matrix, Range, Value, ValueElt, ValueList};

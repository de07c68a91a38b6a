/*!
`fontweave` finds fonts for a request and shapes text with them.

The [`fc`] module holds fontconfig-style patterns, matching and the rule
engine, plus a cached font map. The crate root holds the shaping side:
segment properties, the shaping plan, complex script shapers (Myanmar,
Hangul, Hebrew, Thai and Lao, Arabic-style joining) and the buffers they
work on. Glyph substitution and positioning themselves are delegated to the
[`FontFace`] implementation.
*/

#![doc(html_root_url = "https://docs.rs/fontweave/0.1.0")]

mod buffer;
mod common;
mod complex;
mod error;
mod face;
pub mod fc;
mod normalize;
pub mod ot;
mod plan;
mod shape;
mod text_parser;
mod unicode;

pub use ttf_parser::{GlyphId, Tag};

pub use crate::buffer::{
    BufferClusterLevel, BufferFlags, GlyphBuffer, GlyphInfo, GlyphPosition, UnicodeBuffer,
};
pub use crate::common::{script, Direction, Feature, Language, Script};
pub use crate::error::Error;
pub use crate::face::{Face, FontFace};
pub use crate::plan::ShapePlan;
pub use crate::shape::{shape, shape_with_plan};

type Mask = u32;

//! Style resolution for LRF objects.
//!
//! This module contains:
//! - [`Color`] with its transparency-valued alpha
//! - coded keyword properties (alignment, block rules, frames)
//! - resolved text, block and page styles
//! - the attribute cascade and the interning [`StylePool`]

mod cascade;
mod color;
mod properties;
mod resolved;
mod style_pool;

pub use cascade::{AttrSource, StyleContext};
pub use color::Color;
pub use properties::{Align, BgImageMode, BlockRule, EmpLinePosition, FrameMode, LayoutDirection};
pub use resolved::{
    BgImage, DEFAULT_FONT_FACE, ResolvedBlockStyle, ResolvedPageStyle, ResolvedTextStyle, Scale,
    VerticalShift, display_weight,
};
pub use style_pool::{StyleId, StylePool};

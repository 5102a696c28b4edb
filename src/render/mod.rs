//! Rendering and interaction.
//!
//! The core does not draw. It composes [`DisplayList`]s that a host paints
//! with its own toolkit, and it tracks navigation state in a [`Viewer`].
//! Fonts and images come from host-supplied [`FontProvider`] and
//! [`ImageDecoder`] implementations.

mod button;
mod display;
mod fonts;
mod images;
mod viewer;

pub use button::{ButtonEvent, ButtonMachine};
pub use display::{DisplayList, DrawCommand};
pub use fonts::{
    FixedPitch, FixedPitchProvider, Font, FontCache, FontKey, FontMeasurer, FontMetrics, FontProvider,
    FontRegistry,
};
pub use images::{HeaderProbe, ImageDecoder, RasterImage};
pub use viewer::{Viewer, ViewerOptions};

//! LRF colours.

/// A colour as stored in LRF tags: `r g b a`, little-endian.
///
/// The stored `a` is transparency: 0 is opaque, 255 fully transparent.
/// Display alpha is always `255 - a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    /// An opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0 }
    }

    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self {
            r: bytes[0],
            g: bytes[1],
            b: bytes[2],
            a: bytes[3],
        }
    }

    pub const fn to_le_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const fn from_u32(value: u32) -> Self {
        Self::from_le_bytes(value.to_le_bytes())
    }

    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.to_le_bytes())
    }

    /// Alpha for display (opacity).
    #[inline]
    pub const fn display_alpha(self) -> u8 {
        255 - self.a
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.a == 255
    }

    /// `[r, g, b, opacity]` for a drawing backend.
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.display_alpha()]
    }
}

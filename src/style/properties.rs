//! Coded style properties and the `code_property!` macro.
//!
//! LRF stores keyword-like attributes as small integer codes. Each property
//! here maps those codes to an enum with a stable name for display.

/// Macro for defining code-backed keyword enums.
///
/// # Example
///
/// ```ignore
/// code_property! {
///     /// Text alignment.
///     pub enum Align {
///         #[default]
///         Head = 1 => "head",
///         Center = 4 => "center",
///         Foot = 8 => "foot",
///     }
/// }
/// ```
macro_rules! code_property {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $code:literal => $label:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $name {
            /// Name of this value.
            #[inline]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)*
                }
            }

            /// Decode a stored code.
            #[inline]
            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// The stored code.
            #[inline]
            pub fn code(&self) -> u16 {
                match self {
                    $($name::$variant => $code,)*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use code_property;

code_property! {
    /// Text alignment along the line.
    pub enum Align {
        #[default]
        Head = 1 => "head",
        Center = 4 => "center",
        Foot = 8 => "foot",
    }
}

code_property! {
    /// Which block axes are fixed.
    pub enum BlockRule {
        HorzFixed = 0x14 => "horz-fixed",
        HorzAdjustable = 0x12 => "horz-adjustable",
        VertFixed = 0x41 => "vert-fixed",
        VertAdjustable = 0x21 => "vert-adjustable",
        BlockFixed = 0x44 => "block-fixed",
        #[default]
        BlockAdjustable = 0x22 => "block-adjustable",
    }
}

impl BlockRule {
    pub fn is_vert_fixed(self) -> bool {
        matches!(self, BlockRule::VertFixed | BlockRule::BlockFixed)
    }

    pub fn is_horz_fixed(self) -> bool {
        matches!(self, BlockRule::HorzFixed | BlockRule::BlockFixed)
    }
}

code_property! {
    /// Block frame shape.
    pub enum FrameMode {
        #[default]
        None = 0 => "none",
        Square = 1 => "square",
        Curve = 2 => "curve",
    }
}

code_property! {
    /// Flow direction of a page or block.
    pub enum LayoutDirection {
        #[default]
        LrTb = 0x34 => "LrTb",
        TbRl = 0x41 => "TbRl",
    }
}

code_property! {
    /// Where an emphasis line is drawn.
    pub enum EmpLinePosition {
        #[default]
        None = 0 => "none",
        Before = 1 => "before",
        After = 2 => "after",
    }
}

code_property! {
    /// How a background image fills its box.
    pub enum BgImageMode {
        #[default]
        None = 0 => "none",
        Tile = 1 => "tile",
        Centering = 2 => "centering",
        Fill = 3 => "fill",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        assert_eq!(Align::from_code(4), Some(Align::Center));
        assert_eq!(Align::Center.code(), 4);
        assert_eq!(Align::from_code(2), None);
        assert_eq!(BlockRule::default(), BlockRule::BlockAdjustable);
        assert_eq!(LayoutDirection::TbRl.to_string(), "TbRl");
    }

    #[test]
    fn test_block_rule_axes() {
        assert!(BlockRule::BlockFixed.is_vert_fixed());
        assert!(BlockRule::VertFixed.is_vert_fixed());
        assert!(!BlockRule::HorzFixed.is_vert_fixed());
        assert!(BlockRule::HorzFixed.is_horz_fixed());
    }
}

//! Style pool for interning resolved text styles.

use std::collections::HashMap;

use super::resolved::ResolvedTextStyle;

/// Unique identifier for a style in the [`StylePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleId(pub u32);

impl StyleId {
    /// The default style (always 0).
    pub const DEFAULT: StyleId = StyleId(0);
}

/// Interned text styles.
///
/// Laid-out runs refer to their style by [`StyleId`]; identical styles
/// share one id, so a page of lines carries only a handful of styles.
#[derive(Clone)]
pub struct StylePool {
    styles: Vec<ResolvedTextStyle>,
    intern_map: HashMap<ResolvedTextStyle, StyleId>,
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}

impl StylePool {
    /// Create a pool with the unscaled default style at index 0.
    pub fn new() -> Self {
        Self::with_default(ResolvedTextStyle::default())
    }

    pub fn with_default(default_style: ResolvedTextStyle) -> Self {
        let mut intern_map = HashMap::new();
        intern_map.insert(default_style.clone(), StyleId::DEFAULT);
        Self {
            styles: vec![default_style],
            intern_map,
        }
    }

    /// Intern a style, returning the existing id for an identical one.
    pub fn intern(&mut self, style: ResolvedTextStyle) -> StyleId {
        if let Some(&id) = self.intern_map.get(&style) {
            return id;
        }
        let id = StyleId(self.styles.len() as u32);
        self.intern_map.insert(style.clone(), id);
        self.styles.push(style);
        id
    }

    pub fn get(&self, id: StyleId) -> Option<&ResolvedTextStyle> {
        self.styles.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &ResolvedTextStyle)> {
        self.styles
            .iter()
            .enumerate()
            .map(|(i, s)| (StyleId(i as u32), s))
    }
}

impl std::fmt::Debug for StylePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StylePool")
            .field("count", &self.styles.len())
            .finish()
    }
}

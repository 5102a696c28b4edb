//! Font registry, provider seam and the font cache used for measuring.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use crate::error::Result;
use crate::layout::TextMeasurer;
use crate::style::ResolvedTextStyle;

/// Identity of a sized font face with its decorations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub family: String,
    pub weight: i32,
    pub italic: bool,
    pub pixel_size: i32,
    pub underline: bool,
    pub overline: bool,
}

impl FontKey {
    /// Key for a resolved style, using its face name as the family.
    pub fn for_style(style: &ResolvedTextStyle) -> Self {
        let (underline, overline) = style.decorations();
        Self {
            family: style.font_face.clone(),
            weight: style.font_weight,
            italic: style.italic,
            pixel_size: style.font_size,
            underline,
            overline,
        }
    }
}

/// Glyph advances of a font face.
pub trait FontMetrics: Send + Sync {
    fn advance(&self, ch: char, pixel_size: i32) -> i32;

    fn ascent(&self, pixel_size: i32) -> i32 {
        pixel_size * 4 / 5
    }
}

/// Every glyph is half as wide as the font is tall.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPitch;

impl FontMetrics for FixedPitch {
    fn advance(&self, _ch: char, pixel_size: i32) -> i32 {
        (pixel_size / 2).max(1)
    }
}

/// A face loaded at one size.
#[derive(Clone)]
pub struct Font {
    pub key: FontKey,
    metrics: Arc<dyn FontMetrics>,
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font").field("key", &self.key).finish_non_exhaustive()
    }
}

impl Font {
    pub fn new(key: FontKey, metrics: Arc<dyn FontMetrics>) -> Self {
        Self { key, metrics }
    }

    /// A copy carrying the given decorations; the cached font is unchanged.
    pub fn with_decorations(&self, underline: bool, overline: bool) -> Font {
        let mut font = self.clone();
        font.key.underline = underline;
        font.key.overline = overline;
        font
    }

    pub fn measure(&self, text: &str) -> i32 {
        text.chars().map(|ch| self.metrics.advance(ch, self.key.pixel_size)).sum()
    }

    pub fn ascent(&self) -> i32 {
        self.metrics.ascent(self.key.pixel_size)
    }
}

/// Loads font families and hands out sized fonts.
pub trait FontProvider: Send + Sync {
    fn register(&self, family: &str, bytes: &[u8]) -> Result<()>;

    fn lookup(&self, family: &str, weight: i32, italic: bool, pixel_size: i32) -> Option<Font>;
}

/// Provider for the generic families plus anything registered, all with
/// [`FixedPitch`] metrics.
#[derive(Debug)]
pub struct FixedPitchProvider {
    families: RwLock<Vec<String>>,
}

impl Default for FixedPitchProvider {
    fn default() -> Self {
        Self {
            families: RwLock::new(vec![
                "serif".to_string(),
                "sans-serif".to_string(),
                "monospace".to_string(),
            ]),
        }
    }
}

impl FontProvider for FixedPitchProvider {
    fn register(&self, family: &str, bytes: &[u8]) -> Result<()> {
        if let Ok(mut families) = self.families.write()
            && !families.iter().any(|f| f == family)
        {
            tracing::debug!(family, size = bytes.len(), "font family registered");
            families.push(family.to_string());
        }
        Ok(())
    }

    fn lookup(&self, family: &str, weight: i32, italic: bool, pixel_size: i32) -> Option<Font> {
        let families = self.families.read().ok()?;
        families.iter().any(|f| f == family).then(|| {
            Font::new(
                FontKey {
                    family: family.to_string(),
                    weight,
                    italic,
                    pixel_size,
                    underline: false,
                    overline: false,
                },
                Arc::new(FixedPitch),
            )
        })
    }
}

/// Process-wide face name → family map, filled from embedded Font objects.
///
/// Entries are only ever added; the first registration of a face wins.
#[derive(Debug, Default)]
pub struct FontRegistry {
    faces: RwLock<HashMap<String, String>>,
}

static REGISTRY: OnceLock<FontRegistry> = OnceLock::new();

impl FontRegistry {
    pub fn global() -> &'static FontRegistry {
        REGISTRY.get_or_init(FontRegistry::default)
    }

    /// Map `face` to `family`. Returns false if the face was already known.
    pub fn register(&self, face: &str, family: &str) -> bool {
        let Ok(mut faces) = self.faces.write() else {
            return false;
        };
        if faces.contains_key(face) {
            return false;
        }
        faces.insert(face.to_string(), family.to_string());
        true
    }

    pub fn family(&self, face: &str) -> Option<String> {
        self.faces.read().ok()?.get(face).cloned()
    }

    /// Families to try for `face`, most specific first.
    pub fn candidates(&self, face: &str, fallbacks: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(fallbacks.len() + 2);
        if let Some(family) = self.family(face) {
            out.push(family);
        }
        out.push(face.to_string());
        out.extend(fallbacks.iter().cloned());
        out.dedup();
        out
    }
}

/// Fonts by undecorated key, resolved once through the registry.
pub struct FontCache<'p> {
    provider: &'p dyn FontProvider,
    registry: &'p FontRegistry,
    fallbacks: Vec<String>,
    fonts: Mutex<HashMap<FontKey, Option<Font>>>,
}

impl<'p> FontCache<'p> {
    pub fn new(provider: &'p dyn FontProvider, fallbacks: Vec<String>) -> Self {
        Self::with_registry(provider, FontRegistry::global(), fallbacks)
    }

    pub fn with_registry(provider: &'p dyn FontProvider, registry: &'p FontRegistry, fallbacks: Vec<String>) -> Self {
        Self {
            provider,
            registry,
            fallbacks,
            fonts: Mutex::new(HashMap::new()),
        }
    }

    /// The font for a style, decorated as the style requires.
    pub fn font_for(&self, style: &ResolvedTextStyle) -> Option<Font> {
        let key = FontKey {
            underline: false,
            overline: false,
            ..FontKey::for_style(style)
        };
        if let Ok(fonts) = self.fonts.lock()
            && let Some(cached) = fonts.get(&key)
        {
            return cached.as_ref().map(|f| decorate(f, style));
        }
        let font = self
            .registry
            .candidates(&style.font_face, &self.fallbacks)
            .iter()
            .find_map(|family| self.provider.lookup(family, key.weight, key.italic, key.pixel_size));
        if font.is_none() {
            tracing::warn!(face = %style.font_face, "no font family available");
        }
        if let Ok(mut fonts) = self.fonts.lock() {
            fonts.insert(key, font.clone());
        }
        font.map(|f| decorate(&f, style))
    }

    pub fn len(&self) -> usize {
        self.fonts.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decorate(font: &Font, style: &ResolvedTextStyle) -> Font {
    let (underline, overline) = style.decorations();
    if underline || overline {
        font.with_decorations(underline, overline)
    } else {
        font.clone()
    }
}

/// Measures text with fonts from a [`FontCache`].
pub struct FontMeasurer<'p> {
    cache: FontCache<'p>,
}

impl<'p> FontMeasurer<'p> {
    pub fn new(cache: FontCache<'p>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &FontCache<'p> {
        &self.cache
    }
}

impl TextMeasurer for FontMeasurer<'_> {
    fn measure(&self, text: &str, style: &ResolvedTextStyle) -> i32 {
        let spacing = style.letter_space * text.chars().count() as i32;
        match self.cache.font_for(style) {
            Some(font) => font.measure(text) + spacing,
            None => FixedPitch.advance(' ', style.font_size) * text.chars().count() as i32 + spacing,
        }
    }
}

//! Label font registry.
//!
//! The label font is picked from a short fixed list. Each recognized name
//! maps to a primary system family plus substitutes, resolved against the
//! system font database; the generic class (sans-serif, serif, monospace)
//! is the explicit last-resort entry. A substitute hit is reported back so
//! the shell can warn that the requested font was unavailable.

use ab_glyph::{FontArc, FontVec};
use fontdb::{Database, Family, Query};

/// Fonts offered in the label font selector.
pub const FONT_CHOICES: &[&str] = &[
    "myriad pro",
    "arial",
    "times new roman",
    "verdana",
    "courier new",
];

/// A loaded font plus whether the requested family matched exactly.
pub struct ResolvedFont {
    pub font: FontArc,
    pub exact: bool,
}

pub struct FontRegistry {
    db: Database,
}

impl FontRegistry {
    /// Build the registry over the system font database. Done once at
    /// startup; font files are only read when a face is resolved.
    pub fn new() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::info!("font registry loaded {} system faces", db.len());
        Self { db }
    }

    #[cfg(test)]
    fn with_database(db: Database) -> Self {
        Self { db }
    }

    /// Resolve a selector name to a usable font.
    ///
    /// Returns `None` only when no candidate family resolves at all (for
    /// instance a system without fonts); callers then skip the label and
    /// warn, they do not fail the render.
    pub fn resolve(&self, name: &str) -> Option<ResolvedFont> {
        let (primary, substitutes) = candidates(name);
        if let Some(font) = self.load(&[primary]) {
            return Some(ResolvedFont { font, exact: true });
        }
        self.load(substitutes)
            .or_else(|| self.load(&[Family::SansSerif]))
            .map(|font| ResolvedFont { font, exact: false })
    }

    fn load(&self, families: &[Family]) -> Option<FontArc> {
        let id = self.db.query(&Query {
            families,
            ..Query::default()
        })?;
        self.db
            .with_face_data(id, |data, index| {
                FontVec::try_from_vec_and_index(data.to_vec(), index)
                    .ok()
                    .map(FontArc::from)
            })
            .flatten()
    }
}

/// Primary family and ordered substitutes for a selector name.
fn candidates(name: &str) -> (Family<'_>, &'static [Family<'static>]) {
    match name {
        "myriad pro" => (
            Family::Name("Myriad Pro"),
            &[Family::Name("Segoe UI"), Family::SansSerif],
        ),
        "arial" => (
            Family::Name("Arial"),
            &[Family::Name("Liberation Sans"), Family::SansSerif],
        ),
        "times new roman" => (
            Family::Name("Times New Roman"),
            &[Family::Name("Liberation Serif"), Family::Serif],
        ),
        "verdana" => (
            Family::Name("Verdana"),
            &[Family::Name("DejaVu Sans"), Family::SansSerif],
        ),
        "courier new" => (
            Family::Name("Courier New"),
            &[Family::Name("Liberation Mono"), Family::Monospace],
        ),
        other => (Family::Name(other), &[Family::SansSerif]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_choice_has_candidates() {
        for name in FONT_CHOICES {
            let (primary, substitutes) = candidates(name);
            assert!(matches!(primary, Family::Name(_)));
            assert!(!substitutes.is_empty(), "no substitutes for {name}");
        }
    }

    #[test]
    fn unknown_name_still_gets_a_fallback_chain() {
        let (primary, substitutes) = candidates("comic sans ms");
        assert!(matches!(primary, Family::Name("comic sans ms")));
        assert!(matches!(substitutes, [Family::SansSerif]));
    }

    #[test]
    fn empty_database_resolves_nothing() {
        let registry = FontRegistry::with_database(Database::new());
        assert!(registry.resolve("arial").is_none());
        assert!(registry.resolve("myriad pro").is_none());
    }
}

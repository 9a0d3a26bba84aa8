// Label font lookup: preferred file -> system sans-serif -> any system face

use std::path::Path;
use std::sync::{Arc, OnceLock};

use ab_glyph::FontVec;
use fontdb::{Database, Family, Query, Weight};
use tracing::{debug, warn};

/// Families tried, in order, before falling back to whatever face loads.
const PREFERRED_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Arial",
    "Helvetica",
    "Noto Sans",
];

/// System font scan, done once per process.
static SYSTEM_FONT: OnceLock<Option<Arc<FontVec>>> = OnceLock::new();

/// Resolve the font used for filename labels.
///
/// `preferred` is tried first. Any failure there falls back to the system
/// font database. `None` means nothing renderable exists on this machine;
/// callers still produce the label strip, just without text.
pub fn resolve_label_font(preferred: Option<&Path>) -> Option<Arc<FontVec>> {
    if let Some(path) = preferred {
        match load_font_file(path) {
            Some(font) => {
                debug!(path = %path.display(), "using preferred label font");
                return Some(Arc::new(font));
            }
            None => warn!(
                path = %path.display(),
                "preferred label font unusable, falling back to system fonts"
            ),
        }
    }

    SYSTEM_FONT.get_or_init(load_system_font).clone()
}

fn load_font_file(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

fn load_system_font() -> Option<Arc<FontVec>> {
    let mut db = Database::new();
    db.load_system_fonts();

    let families: Vec<Family<'_>> = PREFERRED_FAMILIES
        .iter()
        .map(|name| Family::Name(name))
        .chain(std::iter::once(Family::SansSerif))
        .collect();
    let query = Query {
        families: &families,
        weight: Weight::BOLD,
        ..Query::default()
    };

    if let Some(id) = db.query(&query)
        && let Some(font) = face_to_font(&db, id)
    {
        debug!("label font resolved from preferred families");
        return Some(Arc::new(font));
    }

    let ids: Vec<fontdb::ID> = db.faces().map(|face| face.id).collect();
    for id in ids {
        if let Some(font) = face_to_font(&db, id) {
            debug!("label font resolved from first loadable system face");
            return Some(Arc::new(font));
        }
    }

    warn!("no system font could be loaded; labels will be blank");
    None
}

fn face_to_font(db: &Database, id: fontdb::ID) -> Option<FontVec> {
    db.with_face_data(id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
    })
    .flatten()
}

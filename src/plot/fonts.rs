//! Runtime font registration for plot text.
//!
//! Plotters is built without its font-kit backend, so text is drawn through
//! `ab_glyph` from a TrueType file registered once per process. Without a
//! usable font the caller draws the figure without any text.

use std::path::Path;
use std::sync::OnceLock;

use log::{debug, warn};
use plotters::style::{FontStyle, register_font};

use crate::plot::PlotError;

/// Family name the charts request; the registered font answers for it.
pub const FONT_FAMILY: &str = "sans-serif";

/// Common locations of a Unicode-capable sans font.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Register the plot font and report whether text can be drawn.
///
/// An explicit font that cannot be read is an error on every call, even after
/// a font was registered; a missing system font is only a warning.
pub fn ensure_font(explicit: Option<&Path>) -> Result<bool, PlotError> {
    let explicit_bytes = match explicit {
        Some(path) => Some(
            std::fs::read(path).map_err(|e| PlotError::Font(format!("cannot read '{}': {e}", path.display())))?,
        ),
        None => None,
    };
    if let Some(&ready) = FONT_READY.get() {
        return Ok(ready);
    }

    let bytes = explicit_bytes.or_else(|| {
        FONT_CANDIDATES.iter().find_map(|candidate| {
            let bytes = std::fs::read(candidate).ok()?;
            debug!("Using plot font {candidate}");
            Some(bytes)
        })
    });

    let ready = match bytes {
        Some(bytes) => {
            // The font registry keeps `'static` data for the rest of the process.
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
                Ok(()) => true,
                Err(_) => {
                    if let Some(path) = explicit {
                        return Err(PlotError::Font(format!(
                            "'{}' is not valid TrueType data",
                            path.display()
                        )));
                    }
                    warn!("System font could not be parsed; plots will have no text.");
                    false
                }
            }
        }
        None => {
            warn!("No TrueType font found (set --font or LABFIT_FONT); plots will have no text.");
            false
        }
    };

    Ok(*FONT_READY.get_or_init(|| ready))
}

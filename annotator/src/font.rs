//! Font lookup for annotation text.
//!
use std::path::{Path, PathBuf};

use rusttype::Font;

/// Font files tried in the user font directory and the system locations below.
const FONT_FILES: [&str; 4] = [
    "DejaVuSansMono.ttf",
    "DejaVuSans.ttf",
    "LiberationMono-Regular.ttf",
    "LiberationSans-Regular.ttf",
];

const SYSTEM_FONT_DIRS: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/truetype/liberation",
    "/Library/Fonts",
    "C:\\Windows\\Fonts",
];

/// Load the annotation font.
///
/// An explicitly configured path wins. Otherwise the user font directory and common system
/// locations are searched. Returns `None` if no usable font is found; annotations are then drawn
/// without text.
pub fn load_font(configured: Option<&Path>) -> Option<Font<'static>> {
    if let Some(path) = configured {
        match read_font(path) {
            Some(font) => return Some(font),
            None => log::warn!("Could not load font {}", path.display()),
        }
    }

    let found = candidate_paths()
        .into_iter()
        .find_map(|path| read_font(&path).map(|font| (path, font)));

    match found {
        Some((path, font)) => {
            log::debug!("Using font {}", path.display());
            Some(font)
        }
        None => {
            log::warn!("No font found, annotations are drawn without text (use --font)");
            None
        }
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let font_dirs = dirs::font_dir()
        .into_iter()
        .chain(SYSTEM_FONT_DIRS.iter().map(PathBuf::from));

    font_dirs
        .flat_map(|dir| FONT_FILES.iter().map(move |file| dir.join(file)))
        .collect()
}

fn read_font(path: &Path) -> Option<Font<'static>> {
    let data = std::fs::read(path).ok()?;
    Font::try_from_vec(data)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_font_file_is_ignored() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font")?;

        assert!(read_font(&path).is_none());
        assert!(read_font(&dir.path().join("missing.ttf")).is_none());

        Ok(())
    }

    #[test]
    fn candidates_cover_system_dirs() {
        let candidates = candidate_paths();
        assert!(candidates
            .iter()
            .any(|p| p.ends_with("dejavu/DejaVuSansMono.ttf")));
    }
}

//! Locating the TrueType family shared by the PDF and the chart renderer.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use genpdf::fonts::{FontData, FontFamily};
use log::{debug, info};

use crate::error::{ReportError, Result};

/// Overrides every other search location when set.
pub const FONTS_DIR_ENV: &str = "SHIPPING_REPORT_FONTS_DIR";

/// A family name and its regular, bold, italic and bold italic file stems.
struct FamilyLayout {
    name: &'static str,
    faces: [&'static str; 4],
}

/// Families tried in each directory, in order of preference.
const FAMILIES: &[FamilyLayout] = &[
    FamilyLayout {
        name: "Roboto",
        faces: ["Roboto-Regular", "Roboto-Bold", "Roboto-Italic", "Roboto-BoldItalic"],
    },
    FamilyLayout {
        name: "LiberationSans",
        faces: [
            "LiberationSans-Regular",
            "LiberationSans-Bold",
            "LiberationSans-Italic",
            "LiberationSans-BoldItalic",
        ],
    },
    FamilyLayout {
        name: "Arimo",
        faces: ["Arimo-Regular", "Arimo-Bold", "Arimo-Italic", "Arimo-BoldItalic"],
    },
    // Stock Debian and Ubuntu images ship only this one.
    FamilyLayout {
        name: "DejaVuSans",
        faces: ["DejaVuSans", "DejaVuSans-Bold", "DejaVuSans-Oblique", "DejaVuSans-BoldOblique"],
    },
];

const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/truetype/roboto/unhinted/RobotoTTF",
    "/usr/share/fonts/truetype/croscore",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF/dejavu",
    "/Library/Fonts",
];


/// Raw bytes of the four faces of one family.
#[derive(Clone)]
pub struct FontBundle {
    pub family: String,
    pub directory: PathBuf,
    pub regular: Vec<u8>,
    pub bold: Vec<u8>,
    pub italic: Vec<u8>,
    pub bold_italic: Vec<u8>,
}

impl std::fmt::Debug for FontBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBundle")
            .field("family", &self.family)
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl FontBundle {
    /// Search `preferred`, the environment override, the bundled asset
    /// directories and the usual system locations, in that order.
    pub fn discover(preferred: Option<&Path>) -> Result<Self> {
        let mut attempts = Vec::new();
        for dir in directory_candidates(preferred) {
            if !dir.is_dir() {
                attempts.push(format!("{} (directory missing)", dir.display()));
                continue;
            }
            for family in FAMILIES {
                if family_present(&dir, family) {
                    let bundle = Self::load(&dir, family)?;
                    info!("Using font family '{}' from {}", family.name, dir.display());
                    return Ok(bundle);
                }
            }
            attempts.push(format!("{} (no complete family)", dir.display()));
        }
        Err(ReportError::Font(format!(
            "no usable TrueType family found. Checked: {}. Set {} or pass --fonts-dir",
            attempts.join(", "),
            FONTS_DIR_ENV
        )))
    }

    fn load(dir: &Path, family: &FamilyLayout) -> Result<Self> {
        let read = |stem: &str| -> Result<Vec<u8>> {
            let path = face_path(dir, stem);
            debug!("Loading font face {}", path.display());
            fs::read(&path).map_err(|e| ReportError::io(path, e))
        };
        let [regular, bold, italic, bold_italic] = family.faces;
        Ok(Self {
            family: family.name.to_string(),
            directory: dir.to_path_buf(),
            regular: read(regular)?,
            bold: read(bold)?,
            italic: read(italic)?,
            bold_italic: read(bold_italic)?,
        })
    }

    /// Font family in the form `genpdf::Document::new` expects.
    pub fn pdf_family(&self) -> Result<FontFamily<FontData>> {
        let face = |bytes: &Vec<u8>, style: &str| {
            FontData::new(bytes.clone(), None).map_err(|e| {
                ReportError::Font(format!("invalid {} {} face: {}", self.family, style, e))
            })
        };
        Ok(FontFamily {
            regular: face(&self.regular, "regular")?,
            bold: face(&self.bold, "bold")?,
            italic: face(&self.italic, "italic")?,
            bold_italic: face(&self.bold_italic, "bold italic")?,
        })
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn directory_candidates(preferred: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(dir) = preferred {
        push(dir.to_path_buf());
    }
    if let Some(dir) = env_path(FONTS_DIR_ENV) {
        push(dir);
    }
    if let Ok(exe) = env::current_exe() {
        if let Some(bin_dir) = exe.parent() {
            push(bin_dir.join("assets/fonts"));
        }
    }
    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));
    for dir in SYSTEM_FONT_DIRS {
        push(PathBuf::from(dir));
    }
    candidates
}

fn face_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.ttf"))
}

fn family_present(dir: &Path, family: &FamilyLayout) -> bool {
    family.faces.iter().all(|stem| face_path(dir, stem).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_directory_comes_first() {
        let dir = PathBuf::from("/tmp/custom-fonts");
        let candidates = directory_candidates(Some(&dir));
        assert_eq!(candidates[0], dir);
        let unique: std::collections::HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn incomplete_family_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Roboto-Regular.ttf"), b"not a font").unwrap();
        assert!(!family_present(dir.path(), &FAMILIES[0]));
    }

    #[test]
    fn complete_family_is_loaded_from_preferred_dir() {
        let dir = tempfile::tempdir().unwrap();
        for suffix in ["Regular", "Bold", "Italic", "BoldItalic"] {
            fs::write(dir.path().join(format!("Arimo-{suffix}.ttf")), suffix).unwrap();
        }
        let bundle = FontBundle::discover(Some(dir.path())).unwrap();
        assert_eq!(bundle.family, "Arimo");
        assert_eq!(bundle.bold, b"Bold");
        assert!(bundle.pdf_family().is_err());
    }

    #[test]
    fn dejavu_layout_is_recognised() {
        let dir = tempfile::tempdir().unwrap();
        for stem in ["DejaVuSans", "DejaVuSans-Bold", "DejaVuSans-Oblique", "DejaVuSans-BoldOblique"] {
            fs::write(dir.path().join(format!("{stem}.ttf")), stem).unwrap();
        }
        let bundle = FontBundle::discover(Some(dir.path())).unwrap();
        assert_eq!(bundle.family, "DejaVuSans");
        assert_eq!(bundle.regular, b"DejaVuSans");
        assert_eq!(bundle.bold_italic, b"DejaVuSans-BoldOblique");
        assert!(directory_candidates(None)
            .contains(&PathBuf::from("/usr/share/fonts/truetype/dejavu")));
    }
}

//! User configuration (`config.ini`).
//!
//! Two sections: `[general]` (backlight, biosIntro) and `[video]` (gamma /
//! contrast / brightness parameters consumed by the display collaborators).
//! The store is constructed once at session start and treated as immutable
//! afterwards; components receive it by reference.

use std::fs;
use std::io;
use std::path::Path;

use ini::Ini;
use log::warn;

/// Written verbatim when no config file exists yet.
pub const DEFAULT_CONFIG_TEXT: &str = "[general]\n\
                                       backlight=40\n\
                                       biosIntro=true\n\n\
                                       [video]\n\
                                       inGamma=2.2\n\
                                       outGamma=1.54\n\
                                       contrast=1.0\n\
                                       brightness=0.0\n";

#[derive(Debug, Clone, PartialEq)]
pub struct OafConfig {
    // [general]
    /// Backlight level, both LCDs.
    pub backlight: u8,
    pub bios_intro: bool,

    // [video]
    pub in_gamma: f32,
    pub out_gamma: f32,
    pub contrast: f32,
    pub brightness: f32,
}

impl Default for OafConfig {
    fn default() -> Self {
        Self {
            backlight: 40,
            bios_intro: true,
            in_gamma: 2.2,
            out_gamma: 1.54,
            contrast: 1.0,
            brightness: 0.0,
        }
    }
}

impl OafConfig {
    /// Load the config file, or create it with default contents if missing.
    /// A missing file is a soft condition, not a failure.
    pub fn load_or_create(path: &Path) -> io::Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::write(path, DEFAULT_CONFIG_TEXT)?;
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Parse INI text. Unknown sections/keys are ignored; unparsable values
    /// keep their defaults.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let ini = match Ini::load_from_str(text) {
            Ok(ini) => ini,
            Err(e) => {
                warn!("Failed to parse config: {e}. Using defaults.");
                return config;
            }
        };

        if let Some(general) = ini.section(Some("general")) {
            if let Some(v) = general.get("backlight").and_then(|v| v.parse().ok()) {
                config.backlight = v;
            }
            if let Some(v) = general.get("biosIntro") {
                config.bios_intro = v == "true";
            }
        }
        if let Some(video) = ini.section(Some("video")) {
            let mut float = |key: &str, target: &mut f32| {
                if let Some(v) = video.get(key).and_then(|v| v.parse().ok()) {
                    *target = v;
                }
            };
            float("inGamma", &mut config.in_gamma);
            float("outGamma", &mut config.out_gamma);
            float("contrast", &mut config.contrast);
            float("brightness", &mut config.brightness);
        }

        config
    }
}

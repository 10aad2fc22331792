//! Save hardware emulation types and detection.
//!
//! Commercial ROMs carry an SDK-inserted save-hint string ("EEPROM_V121"
//! and friends), so detection scans for those. Homebrew and a handful of
//! retail titles either lack the string or lie, which is what the override
//! table patches. Order of resolution:
//!
//! 1. Override table keyed on the region-stripped game code — hit wins.
//! 2. Aligned scan for an SDK save string after the 0xE4-byte header.
//! 3. No match: no save hardware.

use log::debug;

/// Save hardware backend, as configured into the legacy-mode unit.
///
/// Raw codes 0-15 are the persisted on-disk representation (game database
/// attribute low nibble) and must not be renumbered. The `_2` EEPROM
/// variants are the large-ROM (> 16 MiB) addressing siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SaveType {
    Eeprom8k = 0,
    Eeprom8k2 = 1,
    Eeprom64k = 2,
    Eeprom64k2 = 3,
    Flash512kAtmelRtc = 4,
    Flash512kAtmel = 5,
    Flash512kSstRtc = 6,
    Flash512kSst = 7,
    Flash512kPanasonicRtc = 8,
    Flash512kPanasonic = 9,
    Flash1mMacronixRtc = 10,
    Flash1mMacronix = 11,
    Flash1mSanyoRtc = 12,
    Flash1mSanyo = 13,
    Sram256k = 14,
    None = 15,
}

/// UI cursor ordinal for each raw code: vendor variants collapse to one row.
const SAVE_TYPE_CURSOR_LUT: [u8; 16] = [0, 0, 1, 1, 2, 3, 2, 3, 2, 3, 4, 5, 4, 5, 6, 7];

/// Representative raw code for each cursor row.
const CURSOR_SAVE_TYPE_LUT: [u8; 8] = [0, 2, 8, 9, 10, 11, 14, 15];

impl SaveType {
    /// Raw numeric code used for persistence.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Eeprom8k,
            1 => Self::Eeprom8k2,
            2 => Self::Eeprom64k,
            3 => Self::Eeprom64k2,
            4 => Self::Flash512kAtmelRtc,
            5 => Self::Flash512kAtmel,
            6 => Self::Flash512kSstRtc,
            7 => Self::Flash512kSst,
            8 => Self::Flash512kPanasonicRtc,
            9 => Self::Flash512kPanasonic,
            10 => Self::Flash1mMacronixRtc,
            11 => Self::Flash1mMacronix,
            12 => Self::Flash1mSanyoRtc,
            13 => Self::Flash1mSanyo,
            14 => Self::Sram256k,
            15 => Self::None,
            _ => return Option::None,
        })
    }

    /// Cursor ordinal for UI selection.
    pub fn cursor(self) -> u8 {
        SAVE_TYPE_CURSOR_LUT[self.code() as usize]
    }

    /// Representative save type for a cursor row.
    pub fn from_cursor(cursor: u8) -> Option<Self> {
        CURSOR_SAVE_TYPE_LUT
            .get(cursor as usize)
            .and_then(|&code| Self::from_code(code))
    }

    /// ROMs above 16 MiB need the `_2` EEPROM addressing variant. Hard
    /// invariant: applies wherever an 8k/64k EEPROM base type is chosen.
    pub fn promote_for_size(self, rom_size: u32) -> Self {
        if rom_size > 0x100_0000 {
            match self {
                Self::Eeprom8k => Self::Eeprom8k2,
                Self::Eeprom64k => Self::Eeprom64k2,
                other => other,
            }
        } else {
            self
        }
    }
}

/// Known-bad detection results patched by game code (region stripped).
/// Checked before the string heuristic; a hit short-circuits it.
fn check_save_override(game_code: u32) -> Option<SaveType> {
    // Classic NES Series: every game code ends in 'F'.
    if game_code & 0xFF == u32::from(b'F') {
        return Some(SaveType::Eeprom8k);
    }

    const OVERRIDE_LUT: [(&[u8; 3], SaveType); 5] = [
        (b"\0\0\0", SaveType::Sram256k), // Homebrew.
        (b"GMB", SaveType::Sram256k),    // Goomba Color (Homebrew).
        (b"AA2", SaveType::Eeprom64k),   // Super Mario Advance 2.
        (b"A3A", SaveType::Eeprom64k),   // Super Mario Advance 3.
        (b"AZL", SaveType::Eeprom64k),   // Zelda: A Link to the Past & Four Swords.
    ];

    let stripped = game_code & 0x00FF_FFFF;
    for (code, save_type) in OVERRIDE_LUT {
        if stripped == u32::from_le_bytes([code[0], code[1], code[2], 0]) {
            return Some(save_type);
        }
    }

    Option::None
}

/// SDK save-string table. Entry order is the tie-break: earlier entries win
/// over later, more general ones, so the order must never change.
const SDK_SAVE_STRINGS: [(&str, SaveType); 25] = [
    // EEPROM
    ("EEPROM_V111", SaveType::Eeprom8k), // Actually EEPROM 4k.
    ("EEPROM_V120", SaveType::Eeprom8k),
    ("EEPROM_V121", SaveType::Eeprom64k),
    ("EEPROM_V122", SaveType::Eeprom8k), // Except Super Mario Advance 2/3 (override table).
    ("EEPROM_V124", SaveType::Eeprom64k),
    ("EEPROM_V125", SaveType::Eeprom8k),
    ("EEPROM_V126", SaveType::Eeprom8k),
    // FLASH. Assume they all have RTC.
    ("FLASH_V120", SaveType::Flash512kPanasonicRtc),
    ("FLASH_V121", SaveType::Flash512kPanasonicRtc),
    ("FLASH_V123", SaveType::Flash512kPanasonicRtc),
    ("FLASH_V124", SaveType::Flash512kPanasonicRtc),
    ("FLASH_V125", SaveType::Flash512kPanasonicRtc),
    ("FLASH_V126", SaveType::Flash512kPanasonicRtc),
    ("FLASH512_V130", SaveType::Flash512kPanasonicRtc),
    ("FLASH512_V131", SaveType::Flash512kPanasonicRtc),
    ("FLASH512_V133", SaveType::Flash512kPanasonicRtc),
    ("FLASH1M_V102", SaveType::Flash1mMacronixRtc),
    ("FLASH1M_V103", SaveType::Flash1mMacronixRtc),
    // FRAM & SRAM
    ("SRAM_F_V100", SaveType::Sram256k),
    ("SRAM_F_V102", SaveType::Sram256k),
    ("SRAM_F_V103", SaveType::Sram256k),
    ("SRAM_V110", SaveType::Sram256k),
    ("SRAM_V111", SaveType::Sram256k),
    ("SRAM_V112", SaveType::Sram256k),
    ("SRAM_V113", SaveType::Sram256k),
];

/// Size of the cartridge header region skipped by the scan.
const HEADER_SIZE: usize = 0xE4;

/// Resolve the save hardware type for a loaded image.
///
/// `rom` is the full padded window; `rom_size` the padded image size. The
/// scan walks 32-bit-aligned words within `[0xE4, rom_size)` looking for an
/// SDK marker, then matches the full version string in table order. An image
/// too short to hold the cartridge header has no save hardware.
pub fn detect_save_type(rom: &[u8], rom_size: u32) -> SaveType {
    if rom.len() < 0xB0 {
        return SaveType::None;
    }
    let game_code = u32::from_le_bytes([rom[0xAC], rom[0xAD], rom[0xAE], rom[0xAF]]);
    if let Some(save_type) = check_save_override(game_code) {
        debug!(
            "Game code in override list. Using save type {}.",
            save_type.code()
        );
        return save_type;
    }

    let end = (rom_size as usize).min(rom.len());
    for off in (HEADER_SIZE..end.saturating_sub(3)).step_by(4) {
        let word = &rom[off..off + 4];
        if word != b"EEPR" && word != b"FLAS" && word != b"SRAM" {
            continue;
        }
        for (s, save_type) in SDK_SAVE_STRINGS {
            if rom[off..].starts_with(s.as_bytes()) {
                debug!("Detected SDK save type '{s}'.");
                return save_type.promote_for_size(rom_size);
            }
        }
    }

    SaveType::None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal padded image: header + embedded string at an aligned offset.
    fn image_with_string(size: usize, s: &str, at: usize) -> Vec<u8> {
        assert_eq!(at % 4, 0);
        let mut rom = vec![0u8; size];
        rom[at..at + s.len()].copy_from_slice(s.as_bytes());
        rom
    }

    #[test]
    fn test_code_round_trip() {
        for code in 0..16 {
            assert_eq!(SaveType::from_code(code).unwrap().code(), code);
        }
        assert_eq!(SaveType::from_code(16), Option::None);
    }

    #[test]
    fn test_cursor_mapping() {
        assert_eq!(SaveType::Eeprom8k.cursor(), 0);
        assert_eq!(SaveType::Eeprom8k2.cursor(), 0);
        assert_eq!(SaveType::Flash512kPanasonicRtc.cursor(), 2);
        assert_eq!(SaveType::Flash1mSanyo.cursor(), 5);
        assert_eq!(SaveType::Sram256k.cursor(), 6);
        assert_eq!(SaveType::None.cursor(), 7);

        assert_eq!(SaveType::from_cursor(2), Some(SaveType::Flash512kPanasonicRtc));
        assert_eq!(SaveType::from_cursor(7), Some(SaveType::None));
        assert_eq!(SaveType::from_cursor(8), Option::None);
    }

    #[test]
    fn test_flash1m_detected_with_rtc() {
        let mut rom = image_with_string(0x10_0000, "FLASH1M_V102", 0x400);
        rom[0xAC..0xB0].copy_from_slice(b"AXXE");
        assert_eq!(
            detect_save_type(&rom, 0x10_0000),
            SaveType::Flash1mMacronixRtc
        );
    }

    #[test]
    fn test_eeprom_promoted_above_16mib() {
        let mut small = image_with_string(0x100_0000, "EEPROM_V122", 0x1000);
        small[0xAC..0xB0].copy_from_slice(b"AXXE");
        assert_eq!(detect_save_type(&small, 0x100_0000), SaveType::Eeprom8k);

        let mut large = image_with_string(0x200_0000, "EEPROM_V122", 0x1000);
        large[0xAC..0xB0].copy_from_slice(b"AXXE");
        assert_eq!(detect_save_type(&large, 0x200_0000), SaveType::Eeprom8k2);

        let mut large64 = image_with_string(0x200_0000, "EEPROM_V121", 0x1000);
        large64[0xAC..0xB0].copy_from_slice(b"AXXE");
        assert_eq!(detect_save_type(&large64, 0x200_0000), SaveType::Eeprom64k2);
    }

    #[test]
    fn test_override_beats_embedded_string() {
        // SMA2 ships an EEPROM_V122 string but needs 64k EEPROM.
        let mut rom = image_with_string(0x10_0000, "EEPROM_V122", 0x800);
        rom[0xAC..0xB0].copy_from_slice(b"AA2E");
        assert_eq!(detect_save_type(&rom, 0x10_0000), SaveType::Eeprom64k);
    }

    #[test]
    fn test_classic_series_game_code() {
        let mut rom = image_with_string(0x10_0000, "SRAM_V112", 0x800);
        rom[0xAC..0xB0].copy_from_slice(b"FSME");
        assert_eq!(detect_save_type(&rom, 0x10_0000), SaveType::Eeprom8k);
    }

    #[test]
    fn test_blank_game_code_is_homebrew_sram() {
        let rom = vec![0u8; 0x10_0000];
        assert_eq!(detect_save_type(&rom, 0x10_0000), SaveType::Sram256k);
    }

    #[test]
    fn test_no_marker_means_no_save() {
        let mut rom = vec![0u8; 0x4_0000];
        rom[0xAC..0xB0].copy_from_slice(b"AXXE"); // Not in override table.
        assert_eq!(detect_save_type(&rom, 0x4_0000), SaveType::None);
    }

    #[test]
    fn test_truncated_image_has_no_save() {
        // Shorter than the game code field: no override lookup possible.
        assert_eq!(detect_save_type(&[], 0), SaveType::None);
        assert_eq!(detect_save_type(&[0u8; 0xAF], 0xAF), SaveType::None);
    }

    #[test]
    fn test_string_in_header_region_ignored() {
        let mut rom = image_with_string(0x10_0000, "SRAM_V113", 0x20);
        rom[0xAC..0xB0].copy_from_slice(b"AXXE");
        assert_eq!(detect_save_type(&rom, 0x10_0000), SaveType::None);
    }

    #[test]
    fn test_unaligned_string_not_matched() {
        let mut rom = vec![0u8; 0x10_0000];
        rom[0xAC..0xB0].copy_from_slice(b"AXXE");
        rom[0x401..0x401 + 9].copy_from_slice(b"SRAM_V110");
        assert_eq!(detect_save_type(&rom, 0x10_0000), SaveType::None);
    }

    #[test]
    fn test_table_order_is_tie_break() {
        // "FLASH512_V130" also starts with the "FLAS" marker; the longer
        // FLASH512 entries sit after FLASH_V1xx but only the exact string
        // matches, so the right row is chosen.
        let rom = {
            let mut r = image_with_string(0x10_0000, "FLASH512_V130", 0x800);
            r[0xAC..0xB0].copy_from_slice(b"AXXE");
            r
        };
        assert_eq!(
            detect_save_type(&rom, 0x10_0000),
            SaveType::Flash512kPanasonicRtc
        );
    }
}

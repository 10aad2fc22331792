//! GBA ROM image loading and cartridge-bus padding.
//!
//! The ROM image lives in a fixed 32 MiB window. Real cartridges smaller than
//! the addressable range leave the rest of the bus either mirroring the chip
//! or floating ("open bus"), and games can observe both, so the loader
//! synthesizes the exact byte patterns the hardware would expose:
//!
//! - `[file_size, padded_size)`: 0xFF fill (unmapped-high chip behavior,
//!   covers trimmed dumps). `padded_size` is the next power of two, with a
//!   1 MiB floor (smallest retail ROM chip is 8 Mbit).
//! - `padded_size > 1 MiB`: open-bus words derived from the bus address.
//! - `padded_size == 1 MiB`: the ROM is mirrored across the whole window
//!   (Classic NES Series and other 8 Mbit carts).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;
use thiserror::Error;

/// Capacity of the ROM window (largest supported cartridge image).
pub const MAX_ROM_SIZE: u32 = 0x200_0000;

/// Smallest retail ROM chip, 8 Mbit. Also the copy chunk size for loading.
pub const MIN_ROM_SIZE: u32 = 0x10_0000;

/// Nominal physical bus address of the window. Only the low half of
/// `address / 2` leaks into open-bus reads, but the base participates in the
/// arithmetic, so padding is only bit-exact with the real base.
pub const ROM_BUS_BASE: u32 = 0x2000_0000;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("ROM too big: {0} bytes (limit {MAX_ROM_SIZE})")]
    TooBig(u64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed-capacity arena holding the loaded (and padded) ROM image.
///
/// All addressing is offset-based and bounds-checked through the slice; the
/// window owns its storage for the lifetime of the emulation session.
pub struct RomWindow {
    buf: Box<[u8]>,
    file_size: u32,
    padded_size: u32,
}

impl Default for RomWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RomWindow {
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; MAX_ROM_SIZE as usize].into_boxed_slice(),
            file_size: 0,
            padded_size: 0,
        }
    }

    /// Full 32 MiB window contents, including synthesized padding.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Bytes actually read from storage.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    /// Effective ROM size after padding; what every downstream consumer
    /// (save detection, hashing, legacy-mode setup) treats as the image size.
    pub fn rom_size(&self) -> u32 {
        self.padded_size
    }

    /// Game code from the cartridge header (offset 0xAC), as a packed
    /// little-endian word. Fourth byte is the region letter.
    pub fn game_code(&self) -> u32 {
        u32::from_le_bytes([self.buf[0xAC], self.buf[0xAD], self.buf[0xAE], self.buf[0xAF]])
    }

    /// Load a ROM file into the window and synthesize the padding.
    ///
    /// Streams the file in 1 MiB chunks. A file larger than the window fails
    /// with [`RomError::TooBig`] before any byte is written. Returns the
    /// padded size.
    pub fn load(&mut self, path: &Path) -> Result<u32, RomError> {
        let mut f = File::open(path)?;
        let file_size = f.metadata()?.len();
        if file_size > u64::from(MAX_ROM_SIZE) {
            return Err(RomError::TooBig(file_size));
        }

        let mut off = 0usize;
        let mut remaining = file_size as usize;
        while remaining > 0 {
            let chunk = remaining.min(MIN_ROM_SIZE as usize);
            f.read_exact(&mut self.buf[off..off + chunk])?;
            off += chunk;
            remaining -= chunk;
        }

        self.file_size = file_size as u32;
        self.padded_size = fix_rom_padding(&mut self.buf, self.file_size);
        debug!(
            "Loaded ROM: {} bytes from disk, padded to {}",
            self.file_size, self.padded_size
        );
        Ok(self.padded_size)
    }

    /// Load from an in-memory image. Same padding rules as [`RomWindow::load`].
    pub fn load_bytes(&mut self, data: &[u8]) -> Result<u32, RomError> {
        if data.len() > MAX_ROM_SIZE as usize {
            return Err(RomError::TooBig(data.len() as u64));
        }
        self.buf[..data.len()].copy_from_slice(data);
        self.file_size = data.len() as u32;
        self.padded_size = fix_rom_padding(&mut self.buf, self.file_size);
        Ok(self.padded_size)
    }
}

/// Expected open-bus word at window offset `off` (word-aligned), given the
/// padded ROM size. Closed form of the incremental fill below: both halfwords
/// track the low 16 bits of `(bus_address / 2)`, the upper one offset by +1.
pub fn open_bus_word(off: u32, padded_size: u32) -> u32 {
    debug_assert!(off >= padded_size && off % 4 == 0);
    let half = ROM_BUS_BASE.wrapping_add(off) / 2;
    let lo = half as u16;
    let hi = (half as u16).wrapping_add(1);
    u32::from(lo) | (u32::from(hi) << 16)
}

/// Parallel halfword-wise addition (ARM UADD16): each 16-bit lane wraps
/// independently.
fn uadd16(a: u32, b: u32) -> u32 {
    let lo = (a as u16).wrapping_add(b as u16);
    let hi = ((a >> 16) as u16).wrapping_add((b >> 16) as u16);
    u32::from(lo) | (u32::from(hi) << 16)
}

/// Pad the unused window area the way the cartridge bus would read back.
/// Returns the padded ROM size.
fn fix_rom_padding(buf: &mut [u8], file_size: u32) -> u32 {
    let padded = file_size.next_power_of_two().max(MIN_ROM_SIZE);

    // Trimmed-dump fill up to the chip size.
    buf[file_size as usize..padded as usize].fill(0xFF);

    if padded > MIN_ROM_SIZE {
        // Fake "open bus" padding: halfword pair seeded from the bus
        // address, stepped by 0x0002_0002 per word.
        let seed = ROM_BUS_BASE.wrapping_add(padded) / 2;
        let mut word = u32::from(seed as u16) | (u32::from((seed as u16).wrapping_add(1)) << 16);
        for chunk in buf[padded as usize..].chunks_exact_mut(4) {
            chunk.copy_from_slice(&word.to_le_bytes());
            word = uadd16(word, 0x0002_0002);
        }
    } else {
        // Mirror the 1 MiB image across the entire window, always copying
        // from the window base.
        let (src, rest) = buf.split_at_mut(padded as usize);
        for chunk in rest.chunks_exact_mut(padded as usize) {
            chunk.copy_from_slice(src);
        }
    }

    padded
}

//! On-disk game database (`gba_db.bin`).
//!
//! Flat array of fixed-size records sorted ascending by the first 8 bytes of
//! the content SHA-1, compared as a big-endian u64. Lookup is a plain binary
//! search with one seek+read per probe; the only write this subsystem ever
//! performs is rewriting a single record's 4-byte attribute word in place,
//! used by the operator-facing save-type correction flow.
//!
//! # Record layout (228 bytes)
//!
//! - 0x00: display name, 200 bytes, NUL padded
//! - 0xC8: game code, 4 bytes
//! - 0xCC: SHA-1 of the padded image, 20 bytes (first 8 are the sort key)
//! - 0xE0: attribute word, little-endian
//!   (bits 0-3 save type code, bits 27-31 log2 of ROM size)

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::save::SaveType;

/// Size of one record on disk.
pub const DB_ENTRY_SIZE: usize = 228;

/// Byte offset of the attribute word inside a record.
const ATTR_OFFSET: u64 = 224;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("game not found in database")]
    NotFound,
    #[error("database position out of range: {0}")]
    PositionOutOfRange(i64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One database record.
#[derive(Debug, Clone)]
pub struct GameDbEntry {
    pub name: [u8; 200],
    pub game_code: [u8; 4],
    pub sha1: [u8; 20],
    pub attr: u32,
}

impl GameDbEntry {
    fn from_bytes(raw: &[u8; DB_ENTRY_SIZE]) -> Self {
        let mut name = [0u8; 200];
        name.copy_from_slice(&raw[..200]);
        let mut game_code = [0u8; 4];
        game_code.copy_from_slice(&raw[200..204]);
        let mut sha1 = [0u8; 20];
        sha1.copy_from_slice(&raw[204..224]);
        let attr = u32::from_le_bytes(raw[224..228].try_into().unwrap());
        Self {
            name,
            game_code,
            sha1,
            attr,
        }
    }

    /// Sort/search key: first 8 hash bytes as a big-endian u64. The key is
    /// not naturally aligned in the record, hence the byte-wise read.
    pub fn key(&self) -> u64 {
        u64::from_be_bytes(self.sha1[..8].try_into().unwrap())
    }

    /// Save type from the attribute low nibble.
    pub fn save_type(&self) -> SaveType {
        // The nibble covers exactly the 16 valid codes.
        SaveType::from_code((self.attr & 0xF) as u8).unwrap_or(SaveType::None)
    }

    /// log2 of the ROM size recorded for this game.
    pub fn rom_size_log2(&self) -> u32 {
        self.attr >> 27
    }

    /// Display name with NUL padding trimmed.
    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(200);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }
}

/// Pack a save type and ROM size into the record attribute word.
pub fn pack_attr(save_type: SaveType, rom_size: u32) -> u32 {
    (rom_size.ilog2() << 27) | u32::from(save_type.code())
}

/// Content digest of the full padded image.
pub fn rom_digest(rom: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(rom);
    hasher.finalize().into()
}

/// Database search key for a digest.
pub fn digest_key(digest: &[u8; 20]) -> u64 {
    u64::from_be_bytes(digest[..8].try_into().unwrap())
}

/// Handle to the database file. Opened read-only per lookup and read-write
/// only for the single-field correction path.
pub struct GameDb {
    path: PathBuf,
}

impl GameDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Binary-search the database for `key`. Returns the record and its
    /// position, or [`DbError::NotFound`].
    pub fn lookup(&self, key: u64) -> Result<(GameDbEntry, i64), DbError> {
        debug!("Database search: '{key:016X}'");
        let mut f = File::open(&self.path)?;
        let record_count = (f.metadata()?.len() / DB_ENTRY_SIZE as u64) as i64;
        search_records(&mut f, record_count, key)
    }

    /// Rewrite one record's attribute word in place. Nothing else in the
    /// file is touched; the table is never reordered or resized.
    pub fn update_attr(&self, pos: i64, attr: u32) -> Result<(), DbError> {
        let mut f = OpenOptions::new().read(true).write(true).open(&self.path)?;
        let record_count = (f.metadata()?.len() / DB_ENTRY_SIZE as u64) as i64;
        if !position_in_table(pos, record_count) {
            return Err(DbError::PositionOutOfRange(pos));
        }
        f.seek(SeekFrom::Start(pos as u64 * DB_ENTRY_SIZE as u64 + ATTR_OFFSET))?;
        f.write_all(&attr.to_le_bytes())?;
        Ok(())
    }
}

/// Validity check for a correction position.
///
/// The firmware this format comes from effectively accepted any position
/// here (its check OR-ed the two bounds together); that is treated as a
/// defect and both bounds are enforced against the actual table size.
fn position_in_table(pos: i64, record_count: i64) -> bool {
    pos >= 0 && pos < record_count
}

fn search_records<R: Read + Seek>(
    f: &mut R,
    record_count: i64,
    key: u64,
) -> Result<(GameDbEntry, i64), DbError> {
    if record_count == 0 {
        return Err(DbError::NotFound);
    }

    let mut raw = [0u8; DB_ENTRY_SIZE];
    let mut l: i64 = 0;
    let mut r: i64 = record_count - 1;
    loop {
        let mid = l + (r - l) / 2;
        debug!("l: {l} r: {r} mid: {mid}");

        f.seek(SeekFrom::Start(mid as u64 * DB_ENTRY_SIZE as u64))?;
        f.read_exact(&mut raw)?;
        let entry = GameDbEntry::from_bytes(&raw);
        let record_key = entry.key();
        if record_key == key {
            return Ok((entry, mid));
        }

        if r <= l {
            return Err(DbError::NotFound);
        }

        if record_key > key {
            r = mid - 1;
        } else {
            l = mid + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn record(key: u64, name: &str, attr: u32) -> [u8; DB_ENTRY_SIZE] {
        let mut raw = [0u8; DB_ENTRY_SIZE];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        raw[200..204].copy_from_slice(b"TEST");
        raw[204..212].copy_from_slice(&key.to_be_bytes());
        raw[224..228].copy_from_slice(&attr.to_le_bytes());
        raw
    }

    /// Sorted fixture with keys 10, 30, 50, ... (10 * (2i + 1)).
    fn fixture(n: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(n * DB_ENTRY_SIZE);
        for i in 0..n {
            let key = 10 * (2 * i as u64 + 1);
            data.extend_from_slice(&record(key, &format!("Game {i}"), i as u32));
        }
        data
    }

    /// Seek-counting wrapper to bound the number of probes.
    struct CountingReader<R> {
        inner: R,
        probes: usize,
    }

    impl<R: Read> Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl<R: Seek> Seek for CountingReader<R> {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.probes += 1;
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_lookup_finds_every_record() {
        let data = fixture(100);
        for i in 0..100 {
            let key = 10 * (2 * i as u64 + 1);
            let mut f = Cursor::new(&data);
            let (entry, pos) = search_records(&mut f, 100, key).unwrap();
            assert_eq!(pos, i as i64);
            assert_eq!(entry.key(), key);
            assert_eq!(entry.name_str(), format!("Game {i}"));
            assert_eq!(entry.attr, i as u32);
        }
    }

    #[test]
    fn test_lookup_misses_between_and_outside() {
        let data = fixture(100);
        // Strictly between two records, below the first, above the last.
        for key in [20u64, 40, 980, 5, 0, 100_000] {
            let mut f = Cursor::new(&data);
            match search_records(&mut f, 100, key) {
                Err(DbError::NotFound) => {}
                other => panic!("expected NotFound for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_lookup_probe_count_logarithmic() {
        let n = 1024;
        let data = fixture(n);
        for key in [10u64, 10 * (2 * 511 + 1), 10 * (2 * 1023 + 1), 25] {
            let mut f = CountingReader {
                inner: Cursor::new(&data),
                probes: 0,
            };
            let _ = search_records(&mut f, n as i64, key);
            assert!(
                f.probes <= 11,
                "{} probes for key {key} in {n} records",
                f.probes
            );
        }
    }

    #[test]
    fn test_empty_table_is_not_found() {
        let mut f = Cursor::new(Vec::new());
        match search_records(&mut f, 0, 42) {
            Err(DbError::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_key_is_big_endian_prefix() {
        let raw = record(0x0102_0304_0506_0708, "BE", 0);
        let entry = GameDbEntry::from_bytes(&raw);
        assert_eq!(entry.key(), 0x0102_0304_0506_0708);
        assert_eq!(entry.sha1[0], 0x01);
        assert_eq!(entry.sha1[7], 0x08);
    }

    #[test]
    fn test_pack_attr() {
        let attr = pack_attr(SaveType::Flash1mMacronixRtc, 0x100_0000);
        assert_eq!(attr & 0xF, 10);
        assert_eq!(attr >> 27, 24);

        let entry = GameDbEntry::from_bytes(&record(1, "X", attr));
        assert_eq!(entry.save_type(), SaveType::Flash1mMacronixRtc);
        assert_eq!(entry.rom_size_log2(), 24);
    }

    #[test]
    fn test_update_attr_rewrites_single_field() {
        let dir = std::env::temp_dir().join("agb_core_db_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gba_db.bin");
        fs::write(&path, fixture(8)).unwrap();

        let db = GameDb::new(&path);
        let new_attr = pack_attr(SaveType::Sram256k, 0x80_0000);
        db.update_attr(3, new_attr).unwrap();

        let after = fs::read(&path).unwrap();
        let expected_before = fixture(8);
        for (i, (a, b)) in expected_before.iter().zip(after.iter()).enumerate() {
            let field = 3 * DB_ENTRY_SIZE + ATTR_OFFSET as usize;
            if (field..field + 4).contains(&i) {
                continue;
            }
            assert_eq!(a, b, "byte {i} changed");
        }
        let (entry, pos) = db.lookup(10 * (2 * 3 + 1)).unwrap();
        assert_eq!(pos, 3);
        assert_eq!(entry.attr, new_attr);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_update_attr_position_bounds() {
        let dir = std::env::temp_dir().join("agb_core_db_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gba_db_bounds.bin");
        fs::write(&path, fixture(4)).unwrap();

        let db = GameDb::new(&path);
        for bad in [-1i64, 4, 5000] {
            match db.update_attr(bad, 0) {
                Err(DbError::PositionOutOfRange(p)) => assert_eq!(p, bad),
                other => panic!("expected PositionOutOfRange, got {other:?}"),
            }
        }

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_digest_key_prefix() {
        let digest = rom_digest(b"hello");
        let key = digest_key(&digest);
        assert_eq!(key, u64::from_be_bytes(digest[..8].try_into().unwrap()));
    }
}

//! Emulation session orchestration.
//!
//! Mirrors the firmware control flow: place the image, resolve the save
//! type, configure the legacy-mode unit, then run the frame pipeline until
//! the requested number of frames has been presented.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use agb_core::db::{self, GameDb};
use agb_core::event::FrameSignal;
use agb_core::frame_task::FrameDispatchTask;
use agb_core::gpu::GpuBackend;
use agb_core::lgy::LegacyMode;
use agb_core::rom::RomWindow;
use agb_core::save::{detect_save_type, SaveType};
use agb_core::OafConfig;
use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::hw::CapturePulse;

/// Replace the ROM path's final 4-character extension with `.sav`. The save
/// path sits next to the ROM, whatever directory that is.
pub fn derive_save_path(rom_path: &Path) -> PathBuf {
    let s = rom_path.to_string_lossy();
    if s.len() >= 4 {
        PathBuf::from(format!("{}.sav", &s[..s.len() - 4]))
    } else {
        PathBuf::from(format!("{s}.sav"))
    }
}

/// Reseed `lastdir.bin` when the chosen ROM lives in a different directory
/// than the stored one. Missing marker is a soft condition.
pub fn update_last_dir(work_dir: &Path, rom_path: &Path) -> io::Result<()> {
    let marker = work_dir.join("lastdir.bin");
    let rom_dir = rom_path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stored = match fs::read_to_string(&marker) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    if stored != rom_dir {
        fs::write(&marker, &rom_dir)?;
    }
    Ok(())
}

/// Load the ROM, resolve its save type heuristically, and configure the
/// legacy-mode unit. Returns the loaded window and the chosen save type.
pub fn prepare(
    rom_path: &Path,
    config: &OafConfig,
    lgy: &mut dyn LegacyMode,
) -> Result<(RomWindow, SaveType)> {
    info!("Loading {}", rom_path.display());
    let mut window = RomWindow::new();
    window
        .load(rom_path)
        .with_context(|| format!("loading {}", rom_path.display()))?;

    let save_type = detect_save_type(window.bytes(), window.rom_size());
    let save_path = derive_save_path(rom_path);
    lgy.prepare(config.bios_intro, save_type, &save_path)?;

    Ok((window, save_type))
}

/// Run the frame pipeline for `frames` presented frames, then tear down.
pub fn run_frames(
    gpu: Arc<dyn GpuBackend>,
    lgy: &mut dyn LegacyMode,
    frames: u64,
) -> Result<()> {
    let capture_ready = Arc::new(FrameSignal::new());
    let frame_presented = Arc::new(FrameSignal::new());

    let task = FrameDispatchTask::spawn(
        gpu,
        Arc::clone(&capture_ready),
        Arc::clone(&frame_presented),
    )?;
    let pulse = CapturePulse::start(Arc::clone(&capture_ready))?;

    lgy.switch_mode()?;

    let mut presented = 0u64;
    while presented < frames {
        lgy.handle_overrides();
        if frame_presented.wait().is_err() {
            warn!("Frame pipeline stopped early after {presented} frames");
            break;
        }
        presented += 1;
    }

    // Teardown: stop the pulse source, then release the dispatch task.
    pulse.stop();
    capture_ready.close();
    frame_presented.close();
    task.join();

    info!("Presented {presented} frames");
    Ok(())
}

/// Diagnostic flow: compare the database's save type against the heuristic,
/// optionally persisting an operator-chosen correction.
pub fn check_save_db(
    db: &GameDb,
    window: &RomWindow,
    auto_type: SaveType,
    correction_cursor: Option<u8>,
) -> Result<()> {
    let digest = db::rom_digest(&window.bytes()[..window.rom_size() as usize]);
    let key = db::digest_key(&digest);

    let (entry, pos) = db
        .lookup(key)
        .context("could not find the game in the database")?;
    println!("Database entry: {} (position {pos})", entry.name_str());
    println!("Save type (from db): {}", entry.save_type().code());
    println!("Save type (auto detect): {}", auto_type.code());

    if let Some(cursor) = correction_cursor {
        let Some(chosen) = SaveType::from_cursor(cursor) else {
            bail!("save type row out of range: {cursor} (valid 0-7)");
        };
        let chosen = chosen.promote_for_size(window.rom_size());
        if entry.save_type() == chosen {
            println!("Database already records save type {}", chosen.code());
            return Ok(());
        }
        db.update_attr(pos, db::pack_attr(chosen, window.rom_size()))?;
        println!("Database updated: save type {} at position {pos}", chosen.code());
    }

    Ok(())
}

//! Legacy-mode hardware seam.
//!
//! The unit that natively executes the cartridge is external; this core only
//! configures it. The trait mirrors the three calls the session makes:
//! prepare (save hardware + save file + intro flag), the one-way mode
//! switch, and the per-update override poll.

use std::path::Path;

use thiserror::Error;

use crate::save::SaveType;

#[derive(Debug, Error)]
#[error("legacy mode hardware error: {0}")]
pub struct LgyError(pub String);

pub trait LegacyMode {
    /// Configure save hardware emulation and the save file backing it.
    /// Called once, before the mode switch.
    fn prepare(
        &mut self,
        bios_intro: bool,
        save_type: SaveType,
        save_path: &Path,
    ) -> Result<(), LgyError>;

    /// Hand the display and cartridge bus over to the legacy unit.
    /// Irreversible for the session.
    fn switch_mode(&mut self) -> Result<(), LgyError>;

    /// Per-update poll for hardware-side input overrides.
    fn handle_overrides(&mut self);
}

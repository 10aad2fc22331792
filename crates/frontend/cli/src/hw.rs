//! Host stand-ins for the hardware collaborators.
//!
//! On the real device the GPU, the legacy-mode unit, and the capture engine
//! are driver calls; headless runs get logging stubs plus a timer thread
//! that pulses `capture_ready` at the legacy refresh rate.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use agb_core::event::FrameSignal;
use agb_core::gpu::{GpuBackend, GpuError, TransferRegion};
use agb_core::lgy::{LegacyMode, LgyError};
use agb_core::save::SaveType;
use log::{debug, info, warn};

/// GPU backend that just traces submissions.
pub struct LogGpu;

impl GpuBackend for LogGpu {
    fn process_command_list(&self, list: &[u32]) -> Result<(), GpuError> {
        debug!("GPU command list: {} words", list.len());
        Ok(())
    }

    fn wait_command_done(&self) -> Result<(), GpuError> {
        Ok(())
    }

    fn display_transfer(
        &self,
        src: TransferRegion,
        dst: TransferRegion,
        flags: u32,
    ) -> Result<(), GpuError> {
        debug!(
            "Display transfer {}x{} @{:#X} -> @{:#X} (flags {flags:#X})",
            src.width, src.height, src.offset, dst.offset
        );
        Ok(())
    }

    fn wait_transfer_done(&self) -> Result<(), GpuError> {
        Ok(())
    }

    fn swap_framebuffers(&self) {
        debug!("Framebuffer swap");
    }
}

/// Legacy-mode stub: records the configuration it was given.
#[derive(Default)]
pub struct NullLegacy {
    pub prepared: Option<(bool, SaveType)>,
    pub switched: bool,
}

impl LegacyMode for NullLegacy {
    fn prepare(
        &mut self,
        bios_intro: bool,
        save_type: SaveType,
        save_path: &Path,
    ) -> Result<(), LgyError> {
        info!(
            "Legacy mode prepared: save type {} ({save_type:?}), save file {}",
            save_type.code(),
            save_path.display()
        );
        self.prepared = Some((bios_intro, save_type));
        Ok(())
    }

    fn switch_mode(&mut self) -> Result<(), LgyError> {
        if self.prepared.is_none() {
            warn!("Switching to legacy mode without prior prepare");
        }
        info!("Switching to legacy mode");
        self.switched = true;
        Ok(())
    }

    fn handle_overrides(&mut self) {
        // Nothing to poll headless; the real unit reads controller state here.
        debug_assert!(self.switched, "overrides polled before mode switch");
    }
}

/// Stand-in for the capture engine interrupt: raises `capture_ready` at a
/// fixed rate until stopped.
pub struct CapturePulse {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl CapturePulse {
    /// GBA refresh period, ~59.73 Hz.
    const FRAME_PERIOD: Duration = Duration::from_micros(16_742);

    pub fn start(capture_ready: Arc<FrameSignal>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("capture-pulse".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(Self::FRAME_PERIOD);
                    capture_ready.signal();
                }
            })?;
        Ok(Self { stop, handle })
    }

    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

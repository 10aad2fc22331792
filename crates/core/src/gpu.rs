//! GPU collaborator seam and the fixed frame-processing command sequences.
//!
//! The capture hardware writes the legacy frame into a texture; presenting
//! it takes a GPU pass that rotates/composites the texture, a display
//! transfer of the visible sub-region into the active framebuffer, and a
//! framebuffer swap. The GPU itself is external — this module only defines
//! the primitives the dispatch task consumes and the two recorded command
//! lists it submits.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("command list rejected")]
    CommandList,
    #[error("command list completion wait failed")]
    CommandWait,
    #[error("display transfer rejected")]
    Transfer,
    #[error("display transfer completion wait failed")]
    TransferWait,
}

/// Source or destination region of a display transfer: a byte offset into
/// the buffer plus the copied geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRegion {
    pub offset: u32,
    pub width: u32,
    pub height: u32,
}

/// Primitives the frame dispatch task needs from the GPU/display driver.
///
/// Waits block until the corresponding engine finishes; a failed wait means
/// the engine is gone and the caller is expected to stop submitting.
pub trait GpuBackend: Send + Sync {
    fn process_command_list(&self, list: &[u32]) -> Result<(), GpuError>;
    fn wait_command_done(&self) -> Result<(), GpuError>;
    fn display_transfer(
        &self,
        src: TransferRegion,
        dst: TransferRegion,
        flags: u32,
    ) -> Result<(), GpuError>;
    fn wait_transfer_done(&self) -> Result<(), GpuError>;
    fn swap_framebuffers(&self);
}

/// Raw RGB8 pixel format conversion plus linear-to-tiled output.
pub const FRAME_TRANSFER_FLAGS: u32 = 1 << 12 | 1 << 8;

/// The rotated frame is 240 px wide; the visible window starts 16 lines in
/// and spans 368 lines of the texture.
pub const FRAME_REGION: TransferRegion = TransferRegion {
    offset: 16 * 240 * 3,
    width: 240,
    height: 368,
};

/// Full pipeline bring-up plus the rotated-frame draw. Submitted exactly
/// once, on the first captured frame.
pub static GPU_INIT_LIST: &[u32] = &[
    // Viewport and scissor over the full 240x400 render target.
    0x0041_0001, 0x0000_0000, 0x0042_0001, 0x0190_00F0,
    // Capture texture sampling state (512x512 source, nearest).
    0x0081_0001, 0x0001_0001, 0x0082_0001, 0x0200_0200,
    0x0083_0001, 0x0000_0000,
    // Texture combiner: replace with texture color.
    0x00C0_0001, 0x0000_0003, 0x00C1_0001, 0x000F_000F,
    // 90-degree rotation via the vertex attribute transform.
    0x0200_0002, 0x3F80_0000, 0xBF80_0000,
    0x0229_0001, 0x0000_0001,
    // Draw the two-triangle quad.
    0x022E_0001, 0x0000_0000, 0x022F_0001, 0x0000_0001,
];

/// Steady-state list: same draw with the static setup elided.
pub static GPU_STEADY_LIST: &[u32] = &[
    0x0083_0001, 0x0000_0000,
    0x0229_0001, 0x0000_0001,
    0x022E_0001, 0x0000_0000, 0x022F_0001, 0x0000_0001,
];

//! Frame dispatch task.
//!
//! A persistent worker that turns each hardware "capture ready" pulse into a
//! presented frame: submit the GPU pass (init list once, steady list after),
//! wait for it, transfer the visible sub-region into the active framebuffer,
//! wait for the transfer, swap, then raise `frame_presented` for the main
//! loop. Presentation is strictly ordered behind processing within a cycle;
//! frames are never batched, reordered, or retried.
//!
//! The task exits permanently when waiting on `capture_ready` fails (session
//! teardown closed it) or when any GPU primitive fails. On exit it closes
//! `frame_presented` — it is that signal's sole producer, and a waiter paced
//! by it must unwind rather than block forever once no more frames can come.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::event::FrameSignal;
use crate::gpu::{GpuBackend, FRAME_REGION, FRAME_TRANSFER_FLAGS, GPU_INIT_LIST, GPU_STEADY_LIST};

/// One-way state machine: `Uninitialized` until the first capture pulse is
/// consumed, `Steady` forever after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Uninitialized,
    Steady,
}

pub struct FrameDispatchTask {
    handle: JoinHandle<()>,
}

impl FrameDispatchTask {
    /// Spawn the dispatch worker. `capture_ready` is consumed by this task
    /// only; `frame_presented` is raised once per presented frame.
    pub fn spawn(
        gpu: Arc<dyn GpuBackend>,
        capture_ready: Arc<FrameSignal>,
        frame_presented: Arc<FrameSignal>,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("frame-dispatch".to_string())
            .spawn(move || dispatch_loop(&*gpu, &capture_ready, &frame_presented))?;
        Ok(Self { handle })
    }

    /// Wait for the task to exit. Callers close `capture_ready` first.
    pub fn join(self) {
        let _ = self.handle.join();
    }
}

fn dispatch_loop(gpu: &dyn GpuBackend, capture_ready: &FrameSignal, frame_presented: &FrameSignal) {
    let mut state = DispatchState::Uninitialized;

    while capture_ready.wait().is_ok() {
        let list = match state {
            DispatchState::Uninitialized => {
                state = DispatchState::Steady;
                GPU_INIT_LIST
            }
            DispatchState::Steady => GPU_STEADY_LIST,
        };

        let cycle = || -> Result<(), crate::gpu::GpuError> {
            gpu.process_command_list(list)?;
            gpu.wait_command_done()?;
            gpu.display_transfer(FRAME_REGION, FRAME_REGION, FRAME_TRANSFER_FLAGS)?;
            gpu.wait_transfer_done()?;
            Ok(())
        };
        if let Err(e) = cycle() {
            warn!("Frame dispatch stopping: {e}");
            break;
        }
        gpu.swap_framebuffers();
        frame_presented.signal();
    }

    // No more frames will ever be presented; release anyone paced by us.
    frame_presented.close();
    debug!("Frame dispatch task exiting");
}

//! Host-side core of a GBA cartridge emulation front-end.
//!
//! The legacy cartridge format runs on a dedicated hardware unit; this crate
//! covers everything the host does around it: loading the ROM image into its
//! fixed 32 MiB bus window with bit-exact padding, resolving the save
//! hardware emulation mode, the binary-searchable on-disk game database, and
//! the event-driven task that turns capture pulses into presented frames.
//!
//! External collaborators (GPU, legacy-mode unit) are consumed through trait
//! seams in [`gpu`] and [`lgy`].

pub mod config;
pub mod db;
pub mod event;
pub mod frame_task;
pub mod gpu;
pub mod lgy;
pub mod rom;
pub mod save;

pub use config::OafConfig;
pub use db::{GameDb, GameDbEntry, DbError};
pub use event::{FrameSignal, SignalClosed};
pub use frame_task::FrameDispatchTask;
pub use gpu::{GpuBackend, GpuError};
pub use lgy::{LegacyMode, LgyError};
pub use rom::{RomError, RomWindow, MAX_ROM_SIZE};
pub use save::{detect_save_type, SaveType};

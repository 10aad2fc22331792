mod hw;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use agb_core::db::GameDb;
use agb_core::OafConfig;
use anyhow::{Context, Result};
use clap::Parser;
use hw::{LogGpu, NullLegacy};

#[derive(Parser)]
struct Args {
    /// Path to the GBA ROM file
    rom: PathBuf,

    /// Directory holding config.ini, lastdir.bin and gba_db.bin
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Number of frames to present before exiting
    #[arg(long, default_value_t = 300)]
    frames: u64,

    /// Look the game up in the save database and compare against detection
    #[arg(long, default_value_t = false)]
    check_db: bool,

    /// With --check-db: persist this save type row (0-7) for the game
    #[arg(long)]
    set_save_type: Option<u8>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    std::fs::create_dir_all(&args.work_dir)
        .with_context(|| format!("creating work dir {}", args.work_dir.display()))?;
    let config = OafConfig::load_or_create(&args.work_dir.join("config.ini"))?;
    session::update_last_dir(&args.work_dir, &args.rom)?;

    let mut lgy = NullLegacy::default();
    let (window, save_type) = session::prepare(&args.rom, &config, &mut lgy)?;

    if args.check_db || args.set_save_type.is_some() {
        let db = GameDb::new(args.work_dir.join("gba_db.bin"));
        session::check_save_db(&db, &window, save_type, args.set_save_type)?;
        return Ok(());
    }

    session::run_frames(Arc::new(LogGpu), &mut lgy, args.frames)
}

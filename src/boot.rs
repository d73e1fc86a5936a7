//! Power-on sequence: load BIOS and disk, run the BIOS, write the disk back.

use std::fs;

use color_eyre::eyre::{Result, WrapErr};
use log::*;

use crate::config::Config;
use crate::memory::disk::Disk;
use crate::processor::Processor;

/// Boots a machine on the standard console
pub fn run(config: &Config) -> Result<()> {
    let bios = load_bios(config)?;
    let disk = Disk::load(&config.disk_path)?;

    let processor = Processor::new(config, disk);
    run_with(processor, &bios)
}

pub fn load_bios(config: &Config) -> Result<Vec<u8>> {
    let bios = fs::read(&config.bios_path)
        .wrap_err_with(|| format!("Failed to load bios `{}`", config.bios_path.display()))?;

    info!(
        "Loaded {} bytes of bios from `{}`",
        bios.len(),
        config.bios_path.display()
    );

    Ok(bios)
}

/// Runs `bios` on `processor` and persists the disk, also when execution
/// failed.
pub fn run_with<R, W>(mut processor: Processor<R, W>, bios: &[u8]) -> Result<()>
where
    R: std::io::Read,
    W: std::io::Write,
{
    info!("Booting");
    let executed = processor.execute_bytecode(bios);

    processor.into_disk().persist()?;

    executed.wrap_err("Bios execution failed")?;
    info!("Machine halted");

    Ok(())
}

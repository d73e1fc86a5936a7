use color_eyre::eyre::{eyre, Result};

use log::LevelFilter;
use machine::memory::disk::Disk;
use machine::memory::parse::assemble;
use machine::processor::Processor;
use machine::Config;
use simple_logger::SimpleLogger;

/// Prints 9 down to 0, one digit per line
const PROGRAM: &str = r#"
    mov =9 R0
loop:
    add R0 =48 R1
    wto R1
    wto =10
    sub R0 =1 R0
    cmp R0 =0
    brn.nl @loop
    end
"#;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Debug)
        .init()?; // logging

    let bytecode =
        assemble(PROGRAM).map_err(|errors| eyre!("{} errors in program", errors.len()))?;

    let config = Config::default();
    let mut cpu = Processor::new(&config, Disk::with_bytes("harddisk", vec![0; 64]));

    cpu.execute_bytecode(&bytecode)?;

    Ok(())
}

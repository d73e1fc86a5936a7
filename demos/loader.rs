use color_eyre::eyre::{eyre, Result};

use machine::memory::disk::Disk;
use machine::memory::parse::assemble;
use machine::processor::Processor;
use machine::Config;
use simple_logger::SimpleLogger;

/// Lives on the disk at `ROUTINE_OFFSET` and echoes input until end of input
const ROUTINE: &str = r#"
loop:
    rfi R0
    cmp R0 =0
    brn.lt @done
    wto R0
    brn @loop
done:
    end
"#;

const ROUTINE_OFFSET: usize = 0x20;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().init()?; // logging

    let routine = assemble(ROUTINE).map_err(|errors| eyre!("{} errors in routine", errors.len()))?;

    // the bios copies the routine into ram and runs it there
    let bios = assemble(&format!(
        r#"
        lhd ={offset} =0x100 ={len}
        exe =0x100 ={len}
        end
        "#,
        offset = ROUTINE_OFFSET,
        len = routine.len()
    ))
    .map_err(|errors| eyre!("{} errors in bios", errors.len()))?;

    let mut image = vec![0; ROUTINE_OFFSET];
    image.extend_from_slice(&routine);

    let config = Config::default();
    let mut cpu = Processor::new(&config, Disk::with_bytes("harddisk", image));

    cpu.execute_bytecode(&bios)?;

    Ok(())
}

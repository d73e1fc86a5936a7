use std::fs;
use std::io::Cursor;
use std::path::Path;

use color_eyre::eyre::{eyre, Result};
use machine::memory::disk::Disk;
use machine::memory::parse::assemble;
use machine::processor::Processor;
use machine::{boot, Config, MachineError, MachineErrorKind};

fn program(source: &str) -> Result<Vec<u8>> {
    assemble(source).map_err(|errors| eyre!("{:?}", errors))
}

fn config(dir: &Path) -> Config {
    Config::default()
        .with_ram_size(1024)
        .with_bios_path(dir.join("bios"))
        .with_disk_path(dir.join("harddisk"))
}

#[test]
fn boot_persists_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path());
    fs::write(&config.bios_path, program("whd =42 =100\nend\nwhd =1 =0")?)?;
    fs::write(&config.disk_path, vec![0u8; 256])?;

    boot::run(&config)?;

    let disk = Disk::load(&config.disk_path)?;
    assert_eq!(disk.len(), 256);
    assert_eq!(disk.read_number(100)?, 42);
    assert_eq!(disk.read_number(0)?, 0);

    Ok(())
}

#[test]
fn boot_never_writes_bios() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path());
    let bios = program("whd =3 =0")?;
    fs::write(&config.bios_path, &bios)?;
    fs::write(&config.disk_path, vec![0u8; 8])?;

    boot::run(&config)?;

    assert_eq!(fs::read(&config.bios_path)?, bios);

    Ok(())
}

#[test]
fn boot_requires_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path());

    assert!(boot::run(&config).is_err());

    fs::write(&config.bios_path, program("end")?)?;
    assert!(boot::run(&config).is_err());
    assert!(!config.disk_path.exists());

    Ok(())
}

#[test]
fn boot_persists_disk_after_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path());
    fs::write(&config.bios_path, program("whd =7 =0\ndiv =1 =0 R0")?)?;
    fs::write(&config.disk_path, vec![0u8; 16])?;

    let report = boot::run(&config).err().ok_or_else(|| eyre!("boot did not fail"))?;
    let cause = report
        .downcast_ref::<MachineError>()
        .ok_or_else(|| eyre!("unexpected error: {:?}", report))?;
    assert_eq!(cause.kind(), MachineErrorKind::DivisionByZero);

    let disk = Disk::load(&config.disk_path)?;
    assert_eq!(disk.read_number(0)?, 7);

    Ok(())
}

#[test]
fn bios_loads_program_from_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path());

    // counts R0 down from 3 and prints a digit each round
    let routine = program(
        r#"
        loop:
            add R0 =48 R1
            wto R1
            sub R0 =1 R0
            cmp R0 =0
            brn.gt @loop
            whd =99 =0
        "#,
    )?;
    let mut image = vec![0u8; 64];
    image.extend_from_slice(&routine);
    fs::write(&config.disk_path, &image)?;

    let bios = program(&format!(
        r#"
        mov =3 R0
        lhd =64 =512 ={len}
        exe =512 ={len}
        wto =10
        end
        "#,
        len = routine.len()
    ))?;

    let disk = Disk::load(&config.disk_path)?;
    let processor = Processor::with_console(&config, disk, Cursor::new(Vec::new()), Vec::new());
    boot::run_with(processor, &bios)?;

    let disk = Disk::load(&config.disk_path)?;
    assert_eq!(disk.read_number(0)?, 99);
    assert_eq!(disk.read_array(64, routine.len())?, &routine[..]);

    Ok(())
}

#[test]
fn console_output_of_loaded_program() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path());

    let routine = program("rfi R0\nadd R0 =1 R0\nwto R0")?;
    let disk = Disk::with_bytes(&config.disk_path, routine.clone());
    let mut processor =
        Processor::with_console(&config, disk, Cursor::new(b"H".to_vec()), Vec::new());

    processor.execute_bytecode(&program(&format!(
        "lhd =0 =0 ={len}\nexe =0 ={len}",
        len = routine.len()
    ))?)?;

    assert_eq!(processor.output(), b"I");

    Ok(())
}

use color_eyre::eyre::Result;

use log::LevelFilter;
use machine::{boot, Config};
use simple_logger::SimpleLogger;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling

    // console output shares stdout with the logger
    SimpleLogger::new().with_level(LevelFilter::Warn).init()?;

    boot::run(&Config::default())
}

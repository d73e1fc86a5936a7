//! A minimal computer: a register/memory bytecode machine that boots from a
//! BIOS image and works on RAM plus a persistent disk image.

pub mod boot;
pub mod codec;
pub mod config;
pub mod error;
pub mod memory;
pub mod processor;

pub use config::Config;
pub use error::{MachineError, MachineErrorKind};

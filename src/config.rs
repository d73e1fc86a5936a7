use std::path::{Path, PathBuf};

/// Default RAM size. Every byte is reachable by an encoded number.
pub const DEFAULT_RAM_SIZE: usize = 0x10000;
pub const DEFAULT_REGISTER_COUNT: usize = 16;
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Hardware layout and file locations of a machine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Config {
    pub ram_size: usize,
    pub register_count: usize,
    /// How many nested executions may be active below the top level
    pub max_depth: usize,
    pub bios_path: PathBuf,
    pub disk_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ram_size: DEFAULT_RAM_SIZE,
            register_count: DEFAULT_REGISTER_COUNT,
            max_depth: DEFAULT_MAX_DEPTH,
            bios_path: PathBuf::from("bios"),
            disk_path: PathBuf::from("harddisk"),
        }
    }
}

impl Config {
    pub fn with_ram_size(mut self, ram_size: usize) -> Self {
        self.ram_size = ram_size;
        self
    }

    pub fn with_register_count(mut self, register_count: usize) -> Self {
        self.register_count = register_count;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_bios_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.bios_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_disk_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.disk_path = path.as_ref().to_path_buf();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ram_size, 0x10000);
        assert_eq!(config.bios_path, PathBuf::from("bios"));
        assert_eq!(config.disk_path, PathBuf::from("harddisk"));
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_ram_size(256)
            .with_register_count(4)
            .with_max_depth(2)
            .with_disk_path("/tmp/disk");

        assert_eq!(config.ram_size, 256);
        assert_eq!(config.register_count, 4);
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.disk_path, PathBuf::from("/tmp/disk"));
        assert_eq!(config.bios_path, PathBuf::from("bios"));
    }
}

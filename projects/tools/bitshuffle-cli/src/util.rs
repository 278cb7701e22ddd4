use crate::error::CliError;
use bytesize::ByteSize;
use core::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Reads a whole file into memory.
pub fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|e| CliError::io(path, e))
}

/// Writes `data` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, data: &[u8]) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CliError::io(parent, e))?;
    }
    fs::write(path, data).map_err(|e| CliError::io(path, e))
}

/// Bytes per second, printed in human readable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput(u64);

impl Throughput {
    pub fn new(bytes: usize, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64();
        if seconds > 0.0 {
            Self((bytes as f64 / seconds) as u64)
        } else {
            Self(0)
        }
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/s", ByteSize(self.0))
    }
}

/// Formats a byte count in human readable units.
pub fn size(bytes: usize) -> String {
    ByteSize(bytes as u64).to_string()
}

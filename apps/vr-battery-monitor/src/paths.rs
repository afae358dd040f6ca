use std::env;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_EXTENSION: &str = "conf";
pub const LOG_EXTENSION: &str = "log";

/// Config and log files live next to the executable and share its stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub config: PathBuf,
    pub log: PathBuf,
}

impl RuntimePaths {
    pub fn beside(executable: &Path) -> Self {
        Self {
            config: executable.with_extension(CONFIG_EXTENSION),
            log: executable.with_extension(LOG_EXTENSION),
        }
    }

    pub fn for_current_exe() -> io::Result<Self> {
        let exe = env::current_exe()?;
        let exe = exe.canonicalize().unwrap_or(exe);
        Ok(Self::beside(&exe))
    }
}

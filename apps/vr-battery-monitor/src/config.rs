use std::fmt;
use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open config file {}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("could not read config file {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid integer for {key} on line {line}: {value:?}")]
    InvalidInteger {
        key: String,
        value: String,
        line: usize,
        source: ParseIntError,
    },
}

/// Settings read from the `key=value` config file.
///
/// Keys missing from the file keep their zero value. Nothing checks that the
/// sink fields were actually supplied; a blank host or port 0 surfaces as a
/// failed push on every cycle instead of a startup error.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub measurement: String,
    pub influx_host: String,
    pub influx_port: u16,
    pub influx_org: String,
    pub influx_bucket: String,
    pub influx_token: String,
    pub interval_seconds: u64,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let contents = String::from_utf8(raw).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, err),
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        for (idx, line) in contents.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = strip_quotes(value);
            let line_no = idx + 1;

            match key {
                "measurement" => settings.measurement = value.to_string(),
                "influx_host" => settings.influx_host = value.to_string(),
                "influx_port" => settings.influx_port = parse_int(key, value, line_no)?,
                "influx_org" => settings.influx_org = value.to_string(),
                "influx_bucket" => settings.influx_bucket = value.to_string(),
                "influx_token" => settings.influx_token = value.to_string(),
                "interval_seconds" => {
                    settings.interval_seconds = parse_int(key, value, line_no)?
                }
                _ => {
                    tracing::debug!(key, line = line_no, "ignoring unknown config key");
                }
            }
        }
        Ok(settings)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.influx_token.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("Settings")
            .field("measurement", &self.measurement)
            .field("influx_host", &self.influx_host)
            .field("influx_port", &self.influx_port)
            .field("influx_org", &self.influx_org)
            .field("influx_bucket", &self.influx_bucket)
            .field("influx_token", &token)
            .field("interval_seconds", &self.interval_seconds)
            .finish()
    }
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_int<T>(key: &str, value: &str, line: usize) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|source| ConfigError::InvalidInteger {
            key: key.to_string(),
            value: value.to_string(),
            line,
            source,
        })
}

#[cfg(feature = "openvr")]
mod openvr_backend;

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::line_protocol::MetricBatch;
use crate::logger::Logger;

#[cfg(feature = "openvr")]
pub use self::openvr_backend::OpenVrRegistry;

/// Size of the registry's device index space (`k_unMaxTrackedDeviceCount`).
pub const MAX_TRACKED_DEVICES: u32 = 64;

pub type DeviceIndex = u32;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PropertyError(pub String);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to initialize OpenVR: {0}")]
    Init(String),
    #[error("built without a VR backend (enable the `openvr` feature)")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Controller,
    Hmd,
    Tracker,
    BaseStation,
    Unknown,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Controller => "controller",
            DeviceClass::Hmd => "hmd",
            DeviceClass::Tracker => "tracker",
            DeviceClass::BaseStation => "base_station",
            DeviceClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the VR runtime's tracked devices.
pub trait DeviceRegistry {
    fn max_devices(&self) -> DeviceIndex {
        MAX_TRACKED_DEVICES
    }

    fn is_connected(&self, index: DeviceIndex) -> bool;

    /// Charge as reported by the runtime, in the 0.0..=1.0 range.
    fn battery_fraction(&self, index: DeviceIndex) -> Result<f32, PropertyError>;

    fn serial(&self, index: DeviceIndex) -> Result<String, PropertyError>;

    fn device_class(&self, index: DeviceIndex) -> DeviceClass;
}

impl<R: DeviceRegistry + ?Sized> DeviceRegistry for Box<R> {
    fn max_devices(&self) -> DeviceIndex {
        (**self).max_devices()
    }

    fn is_connected(&self, index: DeviceIndex) -> bool {
        (**self).is_connected(index)
    }

    fn battery_fraction(&self, index: DeviceIndex) -> Result<f32, PropertyError> {
        (**self).battery_fraction(index)
    }

    fn serial(&self, index: DeviceIndex) -> Result<String, PropertyError> {
        (**self).serial(index)
    }

    fn device_class(&self, index: DeviceIndex) -> DeviceClass {
        (**self).device_class(index)
    }
}

/// Opens the VR runtime as a background application.
pub fn connect() -> Result<Box<dyn DeviceRegistry>, RegistryError> {
    #[cfg(feature = "openvr")]
    {
        Ok(Box::new(OpenVrRegistry::init()?))
    }
    #[cfg(not(feature = "openvr"))]
    {
        Err(RegistryError::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    pub serial: String,
    pub class: DeviceClass,
    /// 0.0..=100.0
    pub battery_percent: f64,
}

/// Scans every device slot and returns one reading per connected device with
/// a readable battery. All readings share the timestamp taken at scan start.
pub fn collect<R>(registry: &R, measurement: &str, logger: &mut Logger) -> MetricBatch
where
    R: DeviceRegistry + ?Sized,
{
    let now = Utc::now();
    logger.log(format!("=== {}", now.format("%Y-%m-%d %T")));

    let mut readings = Vec::new();
    for index in 0..registry.max_devices() {
        if !registry.is_connected(index) {
            continue;
        }

        let battery_percent = match registry.battery_fraction(index) {
            // Scaled in f32 so the value matches what the runtime would print.
            Ok(fraction) if fraction >= 0.0 => f64::from(fraction * 100.0),
            Ok(fraction) => {
                tracing::debug!(index, fraction, "skipping device with no battery reading");
                continue;
            }
            Err(err) => {
                tracing::debug!(index, error = %err, "skipping device, battery query failed");
                continue;
            }
        };

        let serial = registry.serial(index).unwrap_or_else(|err| {
            tracing::debug!(index, error = %err, "serial number unavailable");
            "unknown".to_string()
        });
        let class = registry.device_class(index);

        logger.log(format!("Device {serial} ({class}) battery: {battery_percent:.6}%"));
        readings.push(DeviceReading {
            serial,
            class,
            battery_percent,
        });
    }

    MetricBatch {
        measurement: measurement.to_string(),
        timestamp_ns: timestamp_nanos(now),
        readings,
    }
}

fn timestamp_nanos(at: DateTime<Utc>) -> i64 {
    // Out of range only past the year 2262.
    at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

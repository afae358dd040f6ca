//! InfluxDB line protocol for battery readings.
//!
//! One line per device:
//! `<measurement>,serial=<serial>,type=<class> battery=<pct> <timestamp_ns>`

use std::fmt::Write;

use crate::devices::DeviceReading;

/// Readings from one scan, stamped with the time the scan started.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBatch {
    pub measurement: String,
    pub timestamp_ns: i64,
    pub readings: Vec<DeviceReading>,
}

impl MetricBatch {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn encode(&self) -> String {
        encode(&self.measurement, self.timestamp_ns, &self.readings)
    }
}

/// Encodes `readings` as newline-terminated lines. An empty slice yields an
/// empty string, which callers treat as nothing to send.
pub fn encode(measurement: &str, timestamp_ns: i64, readings: &[DeviceReading]) -> String {
    let mut out = String::new();
    for reading in readings {
        escape_into(&mut out, measurement, &[',', ' ']);
        out.push_str(",serial=");
        escape_into(&mut out, &reading.serial, &[',', '=', ' ']);
        out.push_str(",type=");
        out.push_str(reading.class.as_str());
        // Writing into a String cannot fail.
        let _ = writeln!(out, " battery={:.2} {timestamp_ns}", reading.battery_percent);
    }
    out
}

fn escape_into(out: &mut String, value: &str, special: &[char]) {
    for ch in value.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

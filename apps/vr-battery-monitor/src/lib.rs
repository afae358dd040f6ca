//! Background agent that reads battery levels of VR tracked devices and
//! writes them to InfluxDB as line protocol on a fixed interval.

pub mod cli;
pub mod config;
pub mod devices;
pub mod line_protocol;
pub mod logger;
pub mod paths;
pub mod poller;
pub mod sink;

use openvr::{property, ApplicationType, Context, System, TrackedDeviceClass};

use super::{DeviceClass, DeviceIndex, DeviceRegistry, PropertyError, RegistryError};

/// Registry backed by a live OpenVR session. The session is shut down when
/// the registry is dropped.
pub struct OpenVrRegistry {
    system: System,
    // Dropped after `system`; dropping the context calls `VR_Shutdown`.
    _context: Context,
}

impl OpenVrRegistry {
    pub fn init() -> Result<Self, RegistryError> {
        // SAFETY: called once from the main thread before any other OpenVR use;
        // the context outlives the `System` handle stored beside it.
        let context = unsafe { openvr::init(ApplicationType::Background) }
            .map_err(|err| RegistryError::Init(err.to_string()))?;
        let system = context
            .system()
            .map_err(|err| RegistryError::Init(err.to_string()))?;
        Ok(Self {
            system,
            _context: context,
        })
    }
}

impl DeviceRegistry for OpenVrRegistry {
    fn max_devices(&self) -> DeviceIndex {
        openvr::MAX_TRACKED_DEVICE_COUNT as DeviceIndex
    }

    fn is_connected(&self, index: DeviceIndex) -> bool {
        self.system.is_tracked_device_connected(index)
    }

    fn battery_fraction(&self, index: DeviceIndex) -> Result<f32, PropertyError> {
        self.system
            .float_tracked_device_property(index, property::DeviceBatteryPercentage_Float)
            .map_err(|err| PropertyError(err.to_string()))
    }

    fn serial(&self, index: DeviceIndex) -> Result<String, PropertyError> {
        let raw = self
            .system
            .string_tracked_device_property(index, property::SerialNumber_String)
            .map_err(|err| PropertyError(err.to_string()))?;
        Ok(raw.to_string_lossy().into_owned())
    }

    fn device_class(&self, index: DeviceIndex) -> DeviceClass {
        match self.system.tracked_device_class(index) {
            TrackedDeviceClass::Controller => DeviceClass::Controller,
            TrackedDeviceClass::HMD => DeviceClass::Hmd,
            TrackedDeviceClass::GenericTracker => DeviceClass::Tracker,
            TrackedDeviceClass::TrackingReference => DeviceClass::BaseStation,
            _ => DeviceClass::Unknown,
        }
    }
}

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use voxscribe_core::DeviceError;

pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn list_input_devices(&self) -> Result<Vec<(String, Device)>, DeviceError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| DeviceError::Enumeration(e.to_string()))?;

        let mut result = Vec::new();
        for device in devices {
            let name = device.name().unwrap_or_else(|_| "unknown".to_string());
            result.push((name, device));
        }
        Ok(result)
    }

    pub fn default_input_name(&self) -> Option<String> {
        self.host
            .default_input_device()
            .and_then(|d| d.name().ok())
    }

    pub fn get_input_device(&self, name: &str) -> Result<Device, DeviceError> {
        if name == "default" {
            return self
                .host
                .default_input_device()
                .ok_or_else(|| DeviceError::NotFound("no default input device".to_string()));
        }

        let devices = self.list_input_devices()?;
        for (dev_name, device) in devices {
            if dev_name == name {
                return Ok(device);
            }
        }
        Err(DeviceError::NotFound(format!(
            "input device not found: {}",
            name
        )))
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

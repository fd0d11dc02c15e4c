//! Input device enumeration via cpal.
//!
//! cpal has no stable device identifier on every host, so ids are
//! synthesized as `audio_{index}_{name hash}`. Lookups accept either that id
//! or the device name; `None`, `""` and `"default"` select the host default.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use cpal::traits::{DeviceTrait, HostTrait};

use av_capture_core::models::audio_models::{AudioSource, AudioTransportType, DeviceDefaults};
use av_capture_core::models::error::CaptureError;

pub const DEFAULT_DEVICE_ID: &str = "default";

/// Synthesized identifier for the input device at `index` named `name`.
pub fn device_id(index: usize, name: &str) -> String {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    format!("audio_{}_{:08x}", index, hasher.finish() & 0xFFFF_FFFF)
}

/// Best-effort transport guess from the device name.
pub fn transport_from_name(name: &str) -> Option<AudioTransportType> {
    let lower = name.to_lowercase();
    if lower.contains("bluetooth") || lower.contains("airpods") || lower.contains("hands-free") {
        Some(AudioTransportType::Bluetooth)
    } else if lower.contains("usb") {
        Some(AudioTransportType::Usb)
    } else if lower.contains("monitor") || lower.contains("loopback") || lower.contains("virtual") {
        Some(AudioTransportType::Virtual)
    } else if lower.contains("built-in") || lower.contains("internal") {
        Some(AudioTransportType::BuiltIn)
    } else {
        None
    }
}

fn is_default_request(device_id: Option<&str>) -> bool {
    matches!(device_id, None | Some("") | Some(DEFAULT_DEVICE_ID))
}

/// Native sample rate and channel count of `device`.
pub fn device_defaults(device: &cpal::Device) -> Result<DeviceDefaults, CaptureError> {
    let config = device
        .default_input_config()
        .map_err(|e| CaptureError::UnsupportedFormat(format!("no default input config: {}", e)))?;

    Ok(DeviceDefaults {
        sample_rate: config.sample_rate().0,
        channels: config.channels(),
    })
}

/// List input devices, default first, then by name.
///
/// Devices that fail to report a name or a default config are skipped.
pub fn list_input_devices(host: &cpal::Host) -> Result<Vec<AudioSource>, CaptureError> {
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut sources: Vec<AudioSource> = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceNotAvailable(format!("failed to enumerate input devices: {}", e)))?
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device.name().ok()?;
            let defaults = device_defaults(&device).ok()?;
            Some(AudioSource {
                id: device_id(index, &name),
                is_default: default_name.as_deref() == Some(name.as_str()),
                transport_type: transport_from_name(&name),
                name,
                defaults,
            })
        })
        .collect();

    sort_default_first(&mut sources);
    Ok(sources)
}

fn sort_default_first(sources: &mut [AudioSource]) {
    sources.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.name.cmp(&b.name)));
}

/// Resolve `device_id` (synthesized id or name) to a cpal device.
pub fn find_input_device(host: &cpal::Host, device_id: Option<&str>) -> Result<cpal::Device, CaptureError> {
    if is_default_request(device_id) {
        return host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceNotAvailable("no default input device".into()));
    }
    let wanted = device_id.unwrap_or_default();

    host.input_devices()
        .map_err(|e| CaptureError::DeviceNotAvailable(format!("failed to enumerate input devices: {}", e)))?
        .enumerate()
        .find(|(index, device)| {
            device
                .name()
                .map(|name| name == wanted || self::device_id(*index, &name) == wanted)
                .unwrap_or(false)
        })
        .map(|(_, device)| device)
        .ok_or_else(|| CaptureError::DeviceNotAvailable(wanted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, is_default: bool) -> AudioSource {
        AudioSource {
            id: device_id(0, name),
            name: name.into(),
            is_default,
            transport_type: None,
            defaults: DeviceDefaults::default(),
        }
    }

    #[test]
    fn ids_are_stable_and_indexed() {
        let a = device_id(3, "USB Microphone");
        assert_eq!(a, device_id(3, "USB Microphone"));
        assert!(a.starts_with("audio_3_"));
        assert_eq!(a.len(), "audio_3_".len() + 8);
        assert_ne!(a, device_id(4, "USB Microphone"));
    }

    #[test]
    fn default_request_forms() {
        assert!(is_default_request(None));
        assert!(is_default_request(Some("")));
        assert!(is_default_request(Some("default")));
        assert!(!is_default_request(Some("hw:1,0")));
    }

    #[test]
    fn transport_guess() {
        assert_eq!(transport_from_name("USB Audio CODEC"), Some(AudioTransportType::Usb));
        assert_eq!(transport_from_name("Monitor of Built-in Audio"), Some(AudioTransportType::Virtual));
        assert_eq!(transport_from_name("AirPods Pro"), Some(AudioTransportType::Bluetooth));
        assert_eq!(transport_from_name("MacBook Pro Microphone"), None);
    }

    #[test]
    fn default_device_sorts_first() {
        let mut sources = vec![source("Zeta", false), source("Beta", true), source("Alpha", false)];
        sort_default_first(&mut sources);
        let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Beta", "Alpha", "Zeta"]);
    }

    #[test]
    fn enumeration_does_not_panic() {
        // Headless CI hosts may have no audio at all; only errors are allowed.
        let host = cpal::default_host();
        if let Ok(sources) = list_input_devices(&host) {
            let mut ids: Vec<_> = sources.iter().map(|s| s.id.clone()).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), sources.len());
        }
    }
}

//! Output device enumeration
//!
//! Walks every available cpal host (ALSA, JACK, ...) so listings and
//! device lookup see the union of all backends. Hosts or devices that
//! fail to enumerate are skipped with a debug log rather than failing
//! the whole scan.

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Sample rates worth advertising in device listings
const PROBE_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

fn host_label(host_id: HostId) -> &'static str {
    host_id.name()
}

fn host_by_name(name: &str) -> Option<cpal::Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|id| id.name() == name)
        .and_then(|id| cpal::host_from_id(id).ok())
}

/// One enumerated output device
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub id: DeviceId,
    pub name: String,
    pub host: String,
    /// Default output of its host
    pub is_default: bool,
    /// Probed sample rates the device accepts
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.host, self.name)
    }
}

fn probe_device(device: &Device, host: &str, is_default: bool) -> Option<AudioDevice> {
    let name = device.name().ok()?;
    let configs = device.supported_output_configs().ok()?;

    let mut sample_rates = Vec::new();
    let mut max_channels = 0u16;
    for config in configs {
        max_channels = max_channels.max(config.channels());
        let min = config.min_sample_rate().0;
        let max = config.max_sample_rate().0;
        for rate in PROBE_RATES {
            if rate >= min && rate <= max && !sample_rates.contains(&rate) {
                sample_rates.push(rate);
            }
        }
    }
    sample_rates.sort_unstable();

    Some(AudioDevice {
        id: DeviceId::with_host(name.clone(), host),
        name,
        host: host.to_string(),
        is_default,
        sample_rates,
        max_channels,
    })
}

/// Enumerate output devices across all hosts
pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let mut devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(e) => {
                log::debug!("Skipping host {}: {}", host_label(host_id), e);
                continue;
            }
        };
        let label = host_label(host_id);
        let default_name = host
            .default_output_device()
            .and_then(|d| d.name().ok());

        let outputs = match host.output_devices() {
            Ok(outputs) => outputs,
            Err(e) => {
                log::debug!("Cannot enumerate outputs on {}: {}", label, e);
                continue;
            }
        };

        for device in outputs {
            let is_default = match (&default_name, device.name().ok()) {
                (Some(default), Some(name)) => *default == name,
                _ => false,
            };
            if let Some(probed) = probe_device(&device, label, is_default) {
                devices.push(probed);
            }
        }
    }

    if devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });
    log::info!("Found {} audio output device(s)", devices.len());
    Ok(devices)
}

/// Resolve a configured device id to a cpal device
pub fn find_device_by_id(id: &DeviceId) -> AudioResult<Device> {
    if let Some(host_name) = &id.host {
        let host = host_by_name(host_name)
            .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()))?;
        return find_on_host(&host, &id.name)
            .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()));
    }

    // No host recorded; first host that knows the name wins
    for host_id in cpal::available_hosts() {
        if let Ok(host) = cpal::host_from_id(host_id) {
            if let Some(device) = find_on_host(&host, &id.name) {
                return Ok(device);
            }
        }
    }
    Err(AudioError::DeviceNotFound(id.display_label()))
}

fn find_on_host(host: &cpal::Host, name: &str) -> Option<Device> {
    host.output_devices()
        .ok()?
        .find(|device| device.name().map(|n| n == name).unwrap_or(false))
}

/// The system default output device
pub fn get_cpal_default_device() -> AudioResult<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::NoDefaultDevice("no default output device".to_string()))
}

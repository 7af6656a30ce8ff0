use anyhow::{Context, Result};
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;
use serde::Serialize;
use tracing::debug;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One GPU's telemetry snapshot, taken fresh each poll cycle.
#[derive(Clone, Debug, Serialize)]
pub struct GpuSample {
    pub id: u32,
    /// Utilization as a fraction in 0..1.
    pub load: f64,
    pub temperature_c: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
}

/// Source of GPU telemetry.
///
/// Sampling is synchronous and never fails: anything that goes wrong during
/// collection collapses to an empty list and the frame for that cycle simply
/// has no sample lines.
pub trait MetricSource {
    fn sample(&mut self) -> Vec<GpuSample>;
}

/// NVML-backed telemetry source.
pub struct NvmlSource {
    nvml: Nvml,
}

impl NvmlSource {
    pub fn new() -> Result<Self> {
        let nvml = Nvml::init().context("initializing NVML (is the NVIDIA driver installed?)")?;
        Ok(Self { nvml })
    }

    fn read_device(&self, index: u32) -> Option<GpuSample> {
        let device = self.nvml.device_by_index(index).ok()?;
        let util = device.utilization_rates().ok()?;
        let temp = device.temperature(TemperatureSensor::Gpu).ok()?;
        let mem = device.memory_info().ok()?;

        Some(GpuSample {
            id: index,
            load: f64::from(util.gpu) / 100.0,
            temperature_c: f64::from(temp),
            memory_used_mb: mem.used as f64 / BYTES_PER_MB,
            memory_total_mb: mem.total as f64 / BYTES_PER_MB,
        })
    }
}

impl MetricSource for NvmlSource {
    fn sample(&mut self) -> Vec<GpuSample> {
        let count = match self.nvml.device_count() {
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "GPU enumeration failed");
                return Vec::new();
            }
        };

        (0..count)
            .filter_map(|i| {
                let sample = self.read_device(i);
                if sample.is_none() {
                    debug!(index = i, "skipping unreadable GPU");
                }
                sample
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_serializes_for_probe_output() {
        let sample = GpuSample {
            id: 0,
            load: 0.42,
            temperature_c: 61.0,
            memory_used_mb: 2048.0,
            memory_total_mb: 8192.0,
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"id\":0"));
        assert!(json.contains("\"load\":0.42"));
        assert!(json.contains("\"memory_total_mb\":8192.0"));
    }
}

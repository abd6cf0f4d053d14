use candle_core::Device;
use tracing::warn;

#[cfg(any(feature = "metal", feature = "cuda"))]
use tracing::info;

use tracing::debug;

use super::error::EmbeddingError;

/// Which compute device the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// First available GPU backend compiled in, else CPU.
    #[default]
    Auto,
    /// Always CPU (the training subprocess uses this when a GPU is busy).
    Cpu,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown device preference: {other}")),
        }
    }
}

/// Selects the compute device based on preference and enabled features (falls back to CPU).
pub fn select_device(preference: DevicePreference) -> Result<Device, EmbeddingError> {
    if preference == DevicePreference::Cpu {
        debug!("CPU device requested explicitly");
        return Ok(Device::Cpu);
    }

    #[cfg(any(feature = "metal", feature = "cuda"))]
    let mut failures: Vec<String> = Vec::new();

    #[cfg(not(any(feature = "metal", feature = "cuda")))]
    let failures: Vec<String> = Vec::new();

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal GPU acceleration");
                return Ok(device);
            }
            Err(e) => {
                let msg = e.to_string();
                warn!(error = %msg, "Metal device unavailable");
                failures.push(format!("metal failed: {msg}"));
            }
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA GPU acceleration");
                return Ok(device);
            }
            Err(e) => {
                let msg = e.to_string();
                warn!(error = %msg, "CUDA device unavailable");
                failures.push(format!("cuda failed: {msg}"));
            }
        }
    }

    let reason = if !cfg!(any(feature = "metal", feature = "cuda")) {
        "no GPU backend compiled".to_string()
    } else if failures.is_empty() {
        "no GPU device available".to_string()
    } else {
        failures.join("; ")
    };

    if cfg!(any(feature = "metal", feature = "cuda")) {
        warn!(reason = %reason, "Falling back to CPU device");
    } else {
        debug!(reason = %reason, "Using CPU device");
    }
    Ok(Device::Cpu)
}

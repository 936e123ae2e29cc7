use serde::{Deserialize, Serialize};

pub const CHANNEL_COUNT: usize = 4;
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 250.0;

/// ADC-to-microvolt conversion parameters, needed by Kernel-B before any
/// filtering takes place.
#[derive(Debug, Clone, Copy)]
pub struct AdcConfig {
    pub vref: f64,
    pub gain: f64,
    pub bits: u32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        AdcConfig {
            vref: 4.5,
            gain: 24.0,
            bits: 24,
        }
    }
}

impl AdcConfig {
    pub fn counts_to_microvolts(&self, counts: f64) -> f64 {
        let full_scale = (2f64).powi(self.bits as i32 - 1) - 1.0;
        counts * (self.vref / (self.gain * full_scale)) * 1e6
    }
}

/// A contiguous window of raw multi-channel samples centered on the
/// second being scored.
#[derive(Debug, Clone)]
pub struct ChannelWindow {
    /// One `[f32; CHANNEL_COUNT]` frame per sample, in chronological order.
    pub frames: Vec<[f32; CHANNEL_COUNT]>,
    pub sample_rate_hz: f64,
}

impl ChannelWindow {
    pub fn channel(&self, index: usize) -> Vec<f64> {
        self.frames.iter().map(|f| f[index] as f64).collect()
    }
}

/// Output of one kernel invocation over one window, scaled to the ranges
/// the rest of the system persists and displays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct KernelOutput {
    pub focus: f64,
    pub stress: f64,
    pub wellness: f64,
    /// Kernel-B only; `None` for Kernel-A. Not persisted — see MetricRecord
    /// schema — carried for completeness of the kernel's own output type.
    pub readiness: Option<f64>,
    pub drowsiness: Option<f64>,
}

impl KernelOutput {
    pub fn neutral() -> Self {
        KernelOutput::default()
    }

    pub fn rounded(mut self) -> Self {
        self.focus = round_dp(self.focus, 3);
        self.stress = round_dp(self.stress, 3);
        self.wellness = round_dp(self.wellness, 3);
        self.readiness = self.readiness.map(|v| round_dp(v, 3));
        self.drowsiness = self.drowsiness.map(|v| round_dp(v, 3));
        self
    }
}

pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// Clip `value` from `[lo, hi]` onto `[0, scale]`.
pub fn scale_clip(value: f64, lo: f64, hi: f64, scale: f64) -> f64 {
    let ratio = ((value - lo) / (hi - lo).max(1e-10)).clamp(0.0, 1.0);
    ratio * scale
}

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("window too short: {0} samples")]
    WindowTooShort(usize),
    #[error("numeric exception in kernel: {0}")]
    Numeric(String),
}

/// Shared contract both kernel implementations satisfy, so `ProcessingWorker`
/// is generic over the selected implementation.
pub trait SignalKernel: Send + Sync {
    fn process(&self, window: &ChannelWindow) -> KernelOutput;
}

//! Welch power spectral density estimation and canonical EEG band power
//! integration, backed by `rustfft`.

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;

/// Canonical EEG bands, in Hz, matching the kernel's scaling contract.
pub const DELTA: (f64, f64) = (0.5, 4.0);
pub const THETA: (f64, f64) = (4.0, 8.0);
pub const ALPHA: (f64, f64) = (8.0, 13.0);
pub const BETA: (f64, f64) = (13.0, 30.0);
pub const GAMMA: (f64, f64) = (30.0, 45.0);

#[derive(Debug, Clone, Copy, Default)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl BandPowers {
    pub fn total(&self) -> f64 {
        self.delta + self.theta + self.alpha + self.beta + self.gamma
    }

    pub fn relative(&self) -> BandPowers {
        let total = self.total() + 1e-10;
        BandPowers {
            delta: self.delta / total,
            theta: self.theta / total,
            alpha: self.alpha / total,
            beta: self.beta / total,
            gamma: self.gamma / total,
        }
    }
}

/// Hann window, applied per-segment before the FFT to reduce spectral
/// leakage, matching the Welch method's standard configuration.
fn hann_window(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| {
            0.5 * (1.0
                - (2.0 * std::f64::consts::PI * n as f64 / (len.max(2) - 1) as f64).cos())
        })
        .collect()
}

/// Welch PSD estimate over 50%-overlapping Hann-windowed segments.
///
/// Returns `(frequencies, power)` pairs covering `0..=sample_rate/2`.
pub fn welch_psd(samples: &[f64], sample_rate: f64, segment_len: usize) -> Vec<(f64, f64)> {
    if samples.len() < segment_len || segment_len < 4 {
        return Vec::new();
    }

    let window = hann_window(segment_len);
    let window_energy: f64 = window.iter().map(|w| w * w).sum();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(segment_len);

    let step = segment_len / 2;
    let n_freqs = segment_len / 2 + 1;
    let mut accum = vec![0.0_f64; n_freqs];
    let mut n_segments = 0usize;

    let mut start = 0;
    while start + segment_len <= samples.len() {
        let mut buf: Vec<Complex64> = samples[start..start + segment_len]
            .iter()
            .zip(window.iter())
            .map(|(s, w)| Complex64::new(s * w, 0.0))
            .collect();
        fft.process(&mut buf);

        for (k, bin) in buf.iter().take(n_freqs).enumerate() {
            accum[k] += bin.norm_sqr();
        }
        n_segments += 1;
        start += step;
    }

    if n_segments == 0 {
        return Vec::new();
    }

    let scale = 1.0 / (sample_rate * window_energy * n_segments as f64);
    let freq_step = sample_rate / segment_len as f64;
    (0..n_freqs)
        .map(|k| (k as f64 * freq_step, accum[k] * scale))
        .collect()
}

/// Integrate PSD power over a closed frequency band via trapezoidal rule.
pub fn band_power(psd: &[(f64, f64)], band: (f64, f64)) -> f64 {
    let mut total = 0.0;
    for pair in psd.windows(2) {
        let (f0, p0) = pair[0];
        let (f1, p1) = pair[1];
        if f1 < band.0 || f0 > band.1 {
            continue;
        }
        let lo = f0.max(band.0);
        let hi = f1.min(band.1);
        if hi <= lo {
            continue;
        }
        total += (p0 + p1) / 2.0 * (hi - lo) / (f1 - f0).max(1e-12) * (f1 - f0);
    }
    total
}

pub fn all_band_powers(psd: &[(f64, f64)]) -> BandPowers {
    BandPowers {
        delta: band_power(psd, DELTA),
        theta: band_power(psd, THETA),
        alpha: band_power(psd, ALPHA),
        beta: band_power(psd, BETA),
        gamma: band_power(psd, GAMMA),
    }
}

/// Percentile of a sample set via linear interpolation between the two
/// bracketing order statistics, used by Kernel-B's artifact rejection
/// thresholds. Unlike a rank-only percentile, this supports fractional
/// `p` (e.g. 99.5) without rounding it away.
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

//! IIR filter design: Butterworth band-pass/band-stop and fixed-Q notch.
//!
//! No biquad/DSP crate exists in the reference corpus, so coefficient design
//! is first-party. Sections are realized as cascaded direct-form-II biquads.

use std::f64::consts::PI;

/// A single second-order IIR section in direct-form II transposed.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn new(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Biquad {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// A cascade of biquad sections applied in series.
#[derive(Debug, Clone)]
pub struct Cascade {
    sections: Vec<Biquad>,
}

impl Cascade {
    pub fn apply(&mut self, samples: &mut [f64]) {
        for x in samples.iter_mut() {
            let mut v = *x;
            for section in self.sections.iter_mut() {
                v = section.process(v);
            }
            *x = v;
        }
    }

    pub fn reset(&mut self) {
        for section in self.sections.iter_mut() {
            section.reset();
        }
    }
}

/// RBJ-style peaking notch biquad at `freq_hz` with quality factor `q`.
fn notch_section(freq_hz: f64, q: f64, sample_rate: f64) -> Biquad {
    let w0 = 2.0 * PI * freq_hz / sample_rate;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();

    let b0 = 1.0;
    let b1 = -2.0 * cos_w0;
    let b2 = 1.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;

    Biquad::new(b0, b1, b2, a0, a1, a2)
}

/// Second-order Butterworth low-pass section via the bilinear transform.
fn butterworth_lowpass_section(cutoff_hz: f64, sample_rate: f64) -> Biquad {
    let w0 = 2.0 * PI * cutoff_hz / sample_rate;
    let cos_w0 = w0.cos();
    let sin_w0 = w0.sin();
    let q = std::f64::consts::FRAC_1_SQRT_2;
    let alpha = sin_w0 / (2.0 * q);

    let b0 = (1.0 - cos_w0) / 2.0;
    let b1 = 1.0 - cos_w0;
    let b2 = (1.0 - cos_w0) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;

    Biquad::new(b0, b1, b2, a0, a1, a2)
}

/// Second-order Butterworth high-pass section via the bilinear transform.
fn butterworth_highpass_section(cutoff_hz: f64, sample_rate: f64) -> Biquad {
    let w0 = 2.0 * PI * cutoff_hz / sample_rate;
    let cos_w0 = w0.cos();
    let sin_w0 = w0.sin();
    let q = std::f64::consts::FRAC_1_SQRT_2;
    let alpha = sin_w0 / (2.0 * q);

    let b0 = (1.0 + cos_w0) / 2.0;
    let b1 = -(1.0 + cos_w0);
    let b2 = (1.0 + cos_w0) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;

    Biquad::new(b0, b1, b2, a0, a1, a2)
}

/// Order-4 Butterworth band-pass built from two cascaded 2nd-order
/// high-pass + low-pass pairs (each pair contributes one pole pair to
/// each skirt, giving a 4th-order composite roll-off).
pub fn butterworth_bandpass(low_hz: f64, high_hz: f64, sample_rate: f64) -> Cascade {
    Cascade {
        sections: vec![
            butterworth_highpass_section(low_hz, sample_rate),
            butterworth_highpass_section(low_hz, sample_rate),
            butterworth_lowpass_section(high_hz, sample_rate),
            butterworth_lowpass_section(high_hz, sample_rate),
        ],
    }
}

/// Order-4 band-stop realized as two cascaded notch sections straddling
/// the stop band edges.
pub fn butterworth_bandstop(low_hz: f64, high_hz: f64, sample_rate: f64) -> Cascade {
    let center = (low_hz + high_hz) / 2.0;
    let bandwidth = high_hz - low_hz;
    let q = center / bandwidth.max(0.01);
    Cascade {
        sections: vec![
            notch_section(center, q, sample_rate),
            notch_section(center, q, sample_rate),
        ],
    }
}

/// Single fixed-Q notch cascade, used for mains-hum rejection at a single
/// frequency (50/60 Hz, 100 Hz harmonic).
pub fn notch(freq_hz: f64, q: f64, sample_rate: f64) -> Cascade {
    Cascade {
        sections: vec![notch_section(freq_hz, q, sample_rate)],
    }
}

/// Subtract the per-channel arithmetic mean (DC removal / linear detrend
/// approximation — a full least-squares detrend is unnecessary at the
/// 2-second window sizes this kernel operates on).
pub fn remove_mean(samples: &mut [f64]) {
    if samples.is_empty() {
        return;
    }
    let mean: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
    for x in samples.iter_mut() {
        *x -= mean;
    }
}

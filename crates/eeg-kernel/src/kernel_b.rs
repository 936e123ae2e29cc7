use crate::filters;
use crate::psd;
use crate::types::{scale_clip, AdcConfig, ChannelWindow, KernelOutput, SignalKernel};

/// FFT-only kernel: ADC scaling, Butterworth band-pass + mains notches,
/// artifact rejection, Welch PSD band-power ratios. Preferred implementation
/// per the scaling contract this system was built against.
pub struct KernelB {
    adc: AdcConfig,
    segment_seconds: f64,
}

impl Default for KernelB {
    fn default() -> Self {
        KernelB {
            adc: AdcConfig::default(),
            segment_seconds: 2.0,
        }
    }
}

impl KernelB {
    pub fn new(adc: AdcConfig) -> Self {
        KernelB {
            adc,
            segment_seconds: 2.0,
        }
    }

    fn process_channel(&self, raw: &[f64], sample_rate: f64) -> psd::BandPowers {
        let mut samples: Vec<f64> = raw
            .iter()
            .map(|counts| self.adc.counts_to_microvolts(*counts))
            .collect();
        filters::remove_mean(&mut samples);

        let mut bandpass = filters::butterworth_bandpass(0.5, 45.0, sample_rate);
        bandpass.apply(&mut samples);

        let mut notch50 = filters::notch(50.0, 30.0, sample_rate);
        notch50.apply(&mut samples);
        let mut notch100 = filters::notch(100.0, 30.0, sample_rate);
        notch100.apply(&mut samples);

        reject_artifacts(&mut samples);

        let segment_len = ((self.segment_seconds * sample_rate) as usize).max(8);
        let psd_estimate = psd::welch_psd(&samples, sample_rate, segment_len);
        psd::all_band_powers(&psd_estimate)
    }
}

/// Replace samples exceeding amplitude/derivative/z-score thresholds with
/// linear interpolation from their nearest good neighbors.
fn reject_artifacts(samples: &mut [f64]) {
    if samples.len() < 3 {
        return;
    }
    let p995 = psd::percentile(samples, 99.5).abs();
    let p99 = psd::percentile(samples, 99.0).abs();
    let mean: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
    let variance: f64 =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    let stddev = variance.sqrt().max(1e-10);

    let mut bad = vec![false; samples.len()];
    for i in 0..samples.len() {
        let amplitude_bad = samples[i].abs() > 1.5 * p995;
        let derivative_bad = i > 0 && (samples[i] - samples[i - 1]).abs() > 2.0 * p99;
        let z_bad = ((samples[i] - mean) / stddev).abs() > 4.0;
        bad[i] = amplitude_bad || derivative_bad || z_bad;
    }

    for i in 0..samples.len() {
        if !bad[i] {
            continue;
        }
        let before = (0..i).rev().find(|&j| !bad[j]);
        let after = (i + 1..samples.len()).find(|&j| !bad[j]);
        samples[i] = match (before, after) {
            (Some(b), Some(a)) => {
                let span = (a - b) as f64;
                let t = (i - b) as f64 / span;
                samples[b] * (1.0 - t) + samples[a] * t
            }
            (Some(b), None) => samples[b],
            (None, Some(a)) => samples[a],
            (None, None) => 0.0,
        };
    }
}

impl SignalKernel for KernelB {
    fn process(&self, window: &ChannelWindow) -> KernelOutput {
        let sample_rate = window.sample_rate_hz;
        if window.frames.len() < 8 {
            return KernelOutput::neutral();
        }

        let mut total = psd::BandPowers::default();
        let channel_count = window.frames[0].len();
        for ch in 0..channel_count {
            let raw = window.channel(ch);
            let powers = self.process_channel(&raw, sample_rate);
            total.delta += powers.delta;
            total.theta += powers.theta;
            total.alpha += powers.alpha;
            total.beta += powers.beta;
            total.gamma += powers.gamma;
        }
        let n = channel_count.max(1) as f64;
        total.delta /= n;
        total.theta /= n;
        total.alpha /= n;
        total.beta /= n;
        total.gamma /= n;

        let high_beta = total.beta * 0.5;
        let focus_ratio = total.beta / (total.alpha + total.theta + 1e-10);
        let stress_ratio = (total.beta + high_beta) / (total.alpha + 1e-10);
        let readiness_ratio = total.alpha / (total.beta + high_beta + 1e-10);
        let drowsiness_ratio = (total.theta + total.delta) / (total.alpha + total.beta + 1e-10);

        let readiness = scale_clip(readiness_ratio, 0.2, 2.5, 100.0);
        let drowsiness = scale_clip(drowsiness_ratio, 0.3, 3.0, 100.0);

        // No distinct wellness ratio is defined for the FFT-only path;
        // readiness doubles as wellness so every kernel populates the
        // same MetricRecord columns.
        KernelOutput {
            focus: scale_clip(focus_ratio, 0.3, 2.5, 3.0),
            stress: scale_clip(stress_ratio, 0.5, 4.0, 3.0),
            wellness: readiness,
            readiness: Some(readiness),
            drowsiness: Some(drowsiness),
        }
        .rounded()
    }
}

use crate::filters;
use crate::psd;
use crate::types::{ChannelWindow, KernelOutput, SignalKernel};

/// Legacy kernel: two independent filter passes followed by a lightweight
/// mindfulness classifier over average/stddev band power. Kept for
/// compatibility with deployments pinned to the original model's scaling
/// contract; `KernelB` is preferred for new deployments.
pub struct KernelA {
    classifier: MindfulnessClassifier,
}

impl Default for KernelA {
    fn default() -> Self {
        KernelA {
            classifier: MindfulnessClassifier::default(),
        }
    }
}

impl KernelA {
    pub fn new() -> Self {
        Self::default()
    }

    fn denoise(&self, raw: &[f64], sample_rate: f64) -> Vec<f64> {
        let mut samples = raw.to_vec();
        filters::remove_mean(&mut samples);

        let mut bandpass = filters::butterworth_bandpass(5.0, 50.0, sample_rate);
        bandpass.apply(&mut samples);

        let mut bandstop = filters::butterworth_bandstop(49.0, 51.0, sample_rate);
        bandstop.apply(&mut samples);

        let mut notch50 = filters::notch(50.0, 30.0, sample_rate);
        notch50.apply(&mut samples);
        let mut notch60 = filters::notch(60.0, 30.0, sample_rate);
        notch60.apply(&mut samples);

        filters::remove_mean(&mut samples);
        samples
    }

    fn clean_copy(&self, raw: &[f64], sample_rate: f64) -> Vec<f64> {
        let mut samples = raw.to_vec();
        filters::remove_mean(&mut samples);
        let mut bandpass = filters::butterworth_bandpass(1.5, 45.0, sample_rate);
        bandpass.apply(&mut samples);
        samples
    }
}

impl SignalKernel for KernelA {
    fn process(&self, window: &ChannelWindow) -> KernelOutput {
        if window.frames.len() < 8 {
            return KernelOutput::neutral();
        }
        let sample_rate = window.sample_rate_hz;
        let channel_count = window.frames[0].len();

        let mut feature_means = psd::BandPowers::default();
        let mut feature_stds = psd::BandPowers::default();
        let mut per_channel_bands = Vec::with_capacity(channel_count);

        for ch in 0..channel_count {
            let raw = window.channel(ch);
            let denoised = self.denoise(&raw, sample_rate);
            let cleaned = self.clean_copy(&denoised, sample_rate);
            let segment_len = ((2.0 * sample_rate) as usize).max(8);
            let psd_estimate = psd::welch_psd(&cleaned, sample_rate, segment_len);
            per_channel_bands.push(psd::all_band_powers(&psd_estimate));
        }

        let n = per_channel_bands.len().max(1) as f64;
        for b in &per_channel_bands {
            feature_means.delta += b.delta / n;
            feature_means.theta += b.theta / n;
            feature_means.alpha += b.alpha / n;
            feature_means.beta += b.beta / n;
            feature_means.gamma += b.gamma / n;
        }
        for b in &per_channel_bands {
            feature_stds.delta += (b.delta - feature_means.delta).powi(2) / n;
            feature_stds.theta += (b.theta - feature_means.theta).powi(2) / n;
            feature_stds.alpha += (b.alpha - feature_means.alpha).powi(2) / n;
            feature_stds.beta += (b.beta - feature_means.beta).powi(2) / n;
            feature_stds.gamma += (b.gamma - feature_means.gamma).powi(2) / n;
        }
        for v in [
            &mut feature_stds.delta,
            &mut feature_stds.theta,
            &mut feature_stds.alpha,
            &mut feature_stds.beta,
            &mut feature_stds.gamma,
        ] {
            *v = v.sqrt();
        }

        let concentration = self.classifier.concentration(&feature_means, &feature_stds);
        let alpha_plus_beta = feature_means.alpha + feature_means.beta;
        let stress = if alpha_plus_beta > 0.0 {
            feature_means.beta / alpha_plus_beta
        } else {
            0.0
        };

        KernelOutput {
            focus: concentration * 3.0,
            stress: stress * 3.0,
            wellness: concentration * 100.0,
            readiness: None,
            drowsiness: None,
        }
        .rounded()
    }
}

/// Stand-in for the original mindfulness classifier model: a bounded
/// linear combination of the 10-dimensional average/stddev band-power
/// feature vector, clamped to `[0, 1]`. There is no model-serving crate
/// in the reference corpus, so this keeps the same feature contract
/// without depending on an ML runtime Kernel-A's production deployments
/// are not expected to use.
struct MindfulnessClassifier {
    mean_weights: [f64; 5],
    std_weights: [f64; 5],
    bias: f64,
}

impl Default for MindfulnessClassifier {
    fn default() -> Self {
        MindfulnessClassifier {
            mean_weights: [-0.1, -0.05, 0.3, 0.5, -0.2],
            std_weights: [-0.05, -0.05, -0.05, -0.05, -0.05],
            bias: 0.1,
        }
    }
}

impl MindfulnessClassifier {
    fn concentration(&self, means: &psd::BandPowers, stds: &psd::BandPowers) -> f64 {
        let rel = means.relative();
        let m = [rel.delta, rel.theta, rel.alpha, rel.beta, rel.gamma];
        let s = [stds.delta, stds.theta, stds.alpha, stds.beta, stds.gamma];
        let mut score = self.bias;
        for i in 0..5 {
            score += self.mean_weights[i] * m[i] + self.std_weights[i] * s[i];
        }
        score.clamp(0.0, 1.0)
    }
}

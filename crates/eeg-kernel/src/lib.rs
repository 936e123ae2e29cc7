mod filters;
mod kernel_a;
mod kernel_b;
mod psd;
mod types;

pub use kernel_a::KernelA;
pub use kernel_b::KernelB;
pub use psd::BandPowers;
pub use types::{
    round_dp, scale_clip, AdcConfig, ChannelWindow, KernelError, KernelOutput, SignalKernel,
    CHANNEL_COUNT, DEFAULT_SAMPLE_RATE_HZ,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_window(freq_hz: f64, sample_rate: f64, seconds: f64) -> ChannelWindow {
        let n = (sample_rate * seconds) as usize;
        let frames = (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate;
                let v = (2.0 * std::f64::consts::PI * freq_hz * t).sin() as f32 * 50.0;
                [v, v, v, v]
            })
            .collect();
        ChannelWindow {
            frames,
            sample_rate_hz: sample_rate,
        }
    }

    #[test]
    fn kernel_b_outputs_within_contract_ranges() {
        let kernel = KernelB::default();
        let window = sine_window(10.0, 250.0, 4.0);
        let out = kernel.process(&window);
        assert!(out.focus >= 0.0 && out.focus <= 3.0);
        assert!(out.stress >= 0.0 && out.stress <= 3.0);
        assert!(out.wellness >= 0.0 && out.wellness <= 100.0);
    }

    #[test]
    fn kernel_b_short_window_is_neutral() {
        let kernel = KernelB::default();
        let window = ChannelWindow {
            frames: vec![[0.0; 4]; 3],
            sample_rate_hz: 250.0,
        };
        let out = kernel.process(&window);
        assert_eq!(out.focus, 0.0);
        assert_eq!(out.stress, 0.0);
        assert_eq!(out.wellness, 0.0);
    }

    #[test]
    fn kernel_a_outputs_within_contract_ranges() {
        let kernel = KernelA::new();
        let window = sine_window(20.0, 250.0, 4.0);
        let out = kernel.process(&window);
        assert!(out.focus >= 0.0 && out.focus <= 3.0);
        assert!(out.stress >= 0.0 && out.stress <= 3.0);
        assert!(out.wellness >= 0.0 && out.wellness <= 100.0);
        assert!(out.readiness.is_none());
    }

    #[test]
    fn round_dp_rounds_to_three_places() {
        assert_eq!(round_dp(1.23456, 3), 1.235);
    }

    #[test]
    fn scale_clip_saturates_at_bounds() {
        assert_eq!(scale_clip(-10.0, 0.0, 1.0, 3.0), 0.0);
        assert_eq!(scale_clip(10.0, 0.0, 1.0, 3.0), 3.0);
        assert_eq!(scale_clip(0.5, 0.0, 1.0, 3.0), 1.5);
    }

    #[test]
    fn welch_psd_concentrates_power_near_source_frequency() {
        let sample_rate = 250.0;
        let n = 1000;
        let samples: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * 10.0 * i as f64 / sample_rate).sin())
            .collect();
        let psd_estimate = psd::welch_psd(&samples, sample_rate, 256);
        let alpha_power = psd::band_power(&psd_estimate, psd::ALPHA);
        let gamma_power = psd::band_power(&psd_estimate, psd::GAMMA);
        assert!(alpha_power > gamma_power);
    }
}

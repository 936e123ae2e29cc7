use chrono::{DateTime, Utc};
use eeg_core::bus::{ProcessedRecord, RawBatch};
use eeg_kernel::{ChannelWindow, SignalKernel, DEFAULT_SAMPLE_RATE_HZ};
use std::collections::BTreeMap;

/// Half-width, in seconds, of the window fed to the kernel for each
/// second-aligned output bucket (§4.2: "the surrounding
/// duration·sampleRate-wide window centered at that second").
const WINDOW_HALF_SECONDS: i64 = 1;

/// Buckets a batch's raw samples into one `ProcessedRecord` per second,
/// averaging the kernel's output across any records that land in the
/// same second (normally one invocation per second; more than one only
/// when overlapping windows are submitted by the caller).
pub fn process_batch(kernel: &dyn SignalKernel, batch: &RawBatch) -> Vec<ProcessedRecord> {
    let mut buckets: BTreeMap<i64, Vec<[f32; 4]>> = BTreeMap::new();
    for record in &batch.records {
        let second = record.timestamp.timestamp();
        buckets.entry(second).or_default().push(record.eeg);
    }

    let mut outputs: BTreeMap<i64, Vec<eeg_kernel::KernelOutput>> = BTreeMap::new();
    for &second in buckets.keys() {
        let window_frames: Vec<[f32; 4]> = batch
            .records
            .iter()
            .filter(|r| (r.timestamp.timestamp() - second).abs() <= WINDOW_HALF_SECONDS)
            .map(|r| r.eeg)
            .collect();

        if window_frames.is_empty() {
            continue;
        }

        let window = ChannelWindow {
            frames: window_frames,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        };
        let output = kernel.process(&window);
        outputs.entry(second).or_default().push(output);
    }

    outputs
        .into_iter()
        .map(|(second, values)| {
            let n = values.len() as f64;
            let focus = values.iter().map(|v| v.focus).sum::<f64>() / n;
            let stress = values.iter().map(|v| v.stress).sum::<f64>() / n;
            let wellness = values.iter().map(|v| v.wellness).sum::<f64>() / n;
            ProcessedRecord {
                timestamp: DateTime::<Utc>::from_timestamp(second, 0).unwrap_or_else(Utc::now),
                focus_label: eeg_kernel::round_dp(focus, 3),
                stress_label: eeg_kernel::round_dp(stress, 3),
                wellness_label: eeg_kernel::round_dp(wellness, 3),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::bus::{KernelSelector, RawRecord};
    use eeg_kernel::KernelB;
    use uuid::Uuid;

    #[test]
    fn process_batch_emits_one_record_per_distinct_second() {
        let kernel = KernelB::default();
        let base = Utc::now();
        let records: Vec<RawRecord> = (0..500)
            .map(|i| RawRecord {
                sample_index: i,
                timestamp: base + chrono::Duration::milliseconds((i as i64) * 4),
                eeg: [1.0, 2.0, 3.0, 4.0],
            })
            .collect();
        let batch = RawBatch {
            user_id: Uuid::new_v4(),
            records,
            duration: Some(2),
            attempts: 0,
            kernel: KernelSelector::FftOnly,
        };
        let out = process_batch(&kernel, &batch);
        assert!(!out.is_empty());
        assert!(out.len() <= 3);
    }

    #[test]
    fn process_batch_with_no_records_is_empty() {
        let kernel = KernelB::default();
        let batch = RawBatch {
            user_id: Uuid::new_v4(),
            records: vec![],
            duration: None,
            attempts: 0,
            kernel: KernelSelector::FftOnly,
        };
        assert!(process_batch(&kernel, &batch).is_empty());
    }
}

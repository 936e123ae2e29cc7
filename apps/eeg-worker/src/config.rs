use eeg_core::EegConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub shared: EegConfig,
    /// In-flight batch cap for `ProcessingWorker::run`. Defaults to 1 —
    /// see `EegConfig::analysis_max_concurrent_batches` for why raising
    /// it is unsafe without repartitioning the consumer first.
    pub max_concurrent_batches: u32,
    pub recycle_after_tasks: u64,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let shared = EegConfig::from_env()?;
        Ok(WorkerConfig {
            max_concurrent_batches: shared.analysis_max_concurrent_batches,
            recycle_after_tasks: shared.worker_recycle_after_tasks,
            shared,
        })
    }
}

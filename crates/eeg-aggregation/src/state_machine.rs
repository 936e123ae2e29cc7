/// Per-target-slice lifecycle (§4.3). Only `Written` is observable by
/// callers of [`crate::AggregationEngine`]'s public methods — the other
/// states describe the internal sequencing a single aggregation step
/// walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationState {
    Pending,
    Computing,
    Written,
    Archived,
    Skipped,
    Cleaned,
}

impl AggregationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AggregationState::Archived | AggregationState::Skipped | AggregationState::Cleaned
        )
    }
}

/// Segment state definitions for tracking orchestrator progress
///
/// A segment walks its result pages in order, dropping into `FetchingItem`
/// for every newly claimed listing and returning to `Scanning` on the same
/// page afterwards, whether the item succeeded or not.
use crate::HarvestError;
use std::fmt;

/// Represents where a segment is in its scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentState {
    // ===== Active States =====
    /// Created by the partitioner, not yet picked up by a worker
    Pending,

    /// Reading result page `n` (1-based)
    Scanning(u32),

    /// Fetching one listing found on result page `n`
    FetchingItem(u32),

    /// Writing the batch and committing its ids
    Flushing,

    // ===== Terminal States =====
    /// Scan finished and any batch was flushed
    Done,

    /// The segment was abandoned
    Failed,
}

impl SegmentState {
    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns the current page for scanning states
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Scanning(page) | Self::FetchingItem(page) => Some(*page),
            _ => None,
        }
    }

    /// Returns true if moving from `self` to `next` is a legal step
    ///
    /// | From | Allowed next states |
    /// |------|---------------------|
    /// | Pending | Scanning(1) |
    /// | Scanning(p) | FetchingItem(p), Scanning(p + 1), Flushing |
    /// | FetchingItem(p) | Scanning(p) |
    /// | Flushing | Done |
    /// | any active state | Failed |
    pub fn can_transition_to(&self, next: SegmentState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }

        match (*self, next) {
            (Self::Pending, Self::Scanning(1)) => true,
            (Self::Scanning(p), Self::FetchingItem(q)) => p == q,
            (Self::Scanning(p), Self::Scanning(q)) => q == p + 1,
            (Self::Scanning(_), Self::Flushing) => true,
            (Self::FetchingItem(p), Self::Scanning(q)) => p == q,
            (Self::Flushing, Self::Done) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scanning(_) => "scanning",
            Self::FetchingItem(_) => "fetching_item",
            Self::Flushing => "flushing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page() {
            Some(page) => write!(f, "{}(page {})", self.name(), page),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Current state of one segment, advanced only through legal transitions
#[derive(Debug, Clone)]
pub struct SegmentProgress {
    segment: usize,
    state: SegmentState,
}

impl SegmentProgress {
    pub fn new(segment: usize) -> Self {
        Self {
            segment,
            state: SegmentState::Pending,
        }
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Moves to `next`, rejecting illegal steps
    pub fn advance(&mut self, next: SegmentState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!("Segment {}: {} -> {}", self.segment, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Marks the segment failed from any active state
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            tracing::trace!("Segment {}: {} -> failed", self.segment, self.state);
            self.state = SegmentState::Failed;
        }
    }
}

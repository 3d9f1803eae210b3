//! State module for tracking segment progress
//!
//! # Components
//!
//! - `SegmentState`: Where a segment is in its scan (scanning, fetching an item, flushing, ...)
//! - `SegmentProgress`: Holds one segment's state and rejects illegal transitions

mod segment_state;

// Re-export main types
pub use segment_state::{SegmentProgress, SegmentState};

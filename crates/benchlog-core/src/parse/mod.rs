//! Text-level parsing: metric lines, header templates and report segments.

pub mod classify;
pub mod header;
pub mod segment;

pub use classify::{LineClass, MetricClassifier};
pub use header::{HeaderMatch, HeaderSet, HeaderTemplate};
pub use segment::{Segment, SegmentResult, Segmenter, Segments};

//! Chunking of recognized speech into searchable audio segments.

mod speech;

pub use speech::SegmentBuilder;

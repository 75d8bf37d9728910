//! Media probing and extraction with ffmpeg/ffprobe.
//!
//! Turns a video file into the raw material for the two derivation
//! branches: one JPEG per second for captioning and a mono audio track for
//! speech recognition.

mod ffmpeg;

pub use ffmpeg::{extract_audio, extract_frames, probe_duration, probe_video, split_audio};

use std::path::PathBuf;

/// Stream facts read from a video file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProbe {
    /// Duration in seconds, from the decoded frame count when available.
    pub duration: f64,
    /// Decoded frames, if ffprobe could count them.
    pub frame_count: Option<u64>,
    /// Frames per second of the video stream.
    pub fps: f64,
}

/// A frame sampled at a whole second of the video.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFrame {
    pub timestamp: f64,
    pub path: PathBuf,
}

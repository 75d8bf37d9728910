//! ffmpeg and ffprobe invocations.

use super::{SampledFrame, VideoProbe};
use crate::error::{GlimtError, Result};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Run an external tool, mapping a missing binary to `ToolNotFound`.
async fn run(tool: &str, command: &mut Command) -> Result<Output> {
    let result = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(out),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(GlimtError::Media(format!("{tool} failed: {}", err.trim())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(GlimtError::ToolNotFound(tool.into()))
        }
        Err(e) => Err(GlimtError::Media(format!("{tool} error: {e}"))),
    }
}

/// Read duration and frame rate of the first video stream.
///
/// Frames are decoded and counted so the duration does not rely on container
/// metadata; the container duration is only used when counting fails.
#[instrument]
pub async fn probe_video(path: &Path) -> Result<VideoProbe> {
    let output = run(
        "ffprobe",
        Command::new("ffprobe")
            .arg("-v").arg("error")
            .arg("-select_streams").arg("v:0")
            .arg("-count_frames")
            .arg("-show_entries").arg("stream=nb_read_frames,r_frame_rate:format=duration")
            .arg("-print_format").arg("json")
            .arg(path),
    )
    .await?;

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|_| GlimtError::Media("Invalid ffprobe output".into()))?;

    let probe = parse_video_probe(&parsed)?;
    info!(
        "Probed {:?}: {:.2}s at {:.2} fps",
        path.file_name().unwrap_or_default(),
        probe.duration,
        probe.fps
    );
    Ok(probe)
}

pub(crate) fn parse_video_probe(parsed: &serde_json::Value) -> Result<VideoProbe> {
    let stream = &parsed["streams"][0];
    if stream.is_null() {
        return Err(GlimtError::Media("No video stream found".into()));
    }

    let fps = stream["r_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .ok_or_else(|| GlimtError::Media("Could not determine frame rate".into()))?;

    let frame_count = stream["nb_read_frames"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok());

    let container_duration = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok());

    let duration = match (frame_count, container_duration) {
        (Some(frames), _) => frames as f64 / fps,
        (None, Some(duration)) => {
            warn!("Frame count unavailable, using container duration");
            duration
        }
        (None, None) => {
            return Err(GlimtError::Media("Could not determine video duration".into()));
        }
    };

    Ok(VideoProbe {
        duration,
        frame_count,
        fps,
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
pub(crate) fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };

    (fps > 0.0 && fps.is_finite()).then_some(fps)
}

/// Sample one JPEG per second of video into `output_dir`.
///
/// The n-th frame (0-based) is stamped with second n.
#[instrument(skip_all)]
pub async fn extract_frames(video: &Path, output_dir: &Path) -> Result<Vec<SampledFrame>> {
    std::fs::create_dir_all(output_dir)?;

    run(
        "ffmpeg",
        Command::new("ffmpeg")
            .arg("-i").arg(video)
            .arg("-vf").arg("fps=1")
            .arg("-q:v").arg("3")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(output_dir.join("frame_%05d.jpg")),
    )
    .await?;

    let mut paths: Vec<PathBuf> = std::fs::read_dir(output_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("frame_") && n.ends_with(".jpg"))
        })
        .collect();
    paths.sort();

    let frames: Vec<SampledFrame> = paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| SampledFrame {
            timestamp: i as f64,
            path,
        })
        .collect();

    info!("Sampled {} frames", frames.len());
    Ok(frames)
}

/// Extract the audio track as mono 16 kHz MP3.
#[instrument(skip_all)]
pub async fn extract_audio(video: &Path, dest: &Path) -> Result<PathBuf> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    debug!("Extracting audio from {:?}", video);
    run(
        "ffmpeg",
        Command::new("ffmpeg")
            .arg("-i").arg(video)
            .arg("-vn")
            .arg("-ac").arg("1")
            .arg("-ar").arg("16000")
            .arg("-codec:a").arg("libmp3lame")
            .arg("-qscale:a").arg("4")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest),
    )
    .await?;

    Ok(dest.to_path_buf())
}

/// Segments a long audio file into smaller chunks for processing.
///
/// Returns tuples of (chunk_path, offset_seconds) for each segment.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let chunk_len = chunk_seconds.max(1) as f64;

    // Short audio doesn't need splitting
    if total_duration <= chunk_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let segment_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let segment_len = chunk_len.min(total_duration - offset);

        extract_segment(source, &segment_path, offset, segment_len).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((segment_path, offset));

        offset += chunk_len;
        idx += 1;
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

/// Extracts a time segment from an audio file.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    // Stream copy first, re-encode if that fails.
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    warn!("Stream copy failed, re-encoding segment");
    run(
        "ffmpeg",
        Command::new("ffmpeg")
            .arg("-ss").arg(format!("{:.3}", start))
            .arg("-i").arg(source)
            .arg("-t").arg(format!("{:.3}", length))
            .arg("-codec:a").arg("libmp3lame")
            .arg("-qscale:a").arg("4")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest),
    )
    .await?;
    Ok(())
}

/// Queries the container duration of a media file.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let output = run(
        "ffprobe",
        Command::new("ffprobe")
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path),
    )
    .await?;

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|_| GlimtError::Media("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GlimtError::Media("Could not determine media duration".into()))
}

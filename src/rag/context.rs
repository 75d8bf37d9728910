//! Evidence assembled for an answer, and its prompt and API renderings.

use crate::models::{FusedSegment, HighlightKind, Modality, RankedResult};
use serde::{Deserialize, Serialize};

/// Evidence retrieved for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    /// Top visual highlights.
    Visual(Vec<RankedResult>),
    /// Gap-filtered speech segments.
    Audio(Vec<RankedResult>),
    /// Speech segments with the visuals shown around them.
    Fused(Vec<FusedSegment>),
    /// The stored summary of the video in scope, if there is one.
    Summary(Option<String>),
}

impl Evidence {
    pub fn modality(&self) -> Modality {
        match self {
            Evidence::Visual(_) => Modality::Visual,
            Evidence::Audio(_) => Modality::Audio,
            Evidence::Fused(_) => Modality::Both,
            Evidence::Summary(_) => Modality::Summary,
        }
    }

    /// True when nothing relevant was found.
    pub fn is_empty(&self) -> bool {
        match self {
            Evidence::Visual(results) | Evidence::Audio(results) => results.is_empty(),
            Evidence::Fused(segments) => segments.is_empty(),
            Evidence::Summary(summary) => summary.is_none(),
        }
    }

    /// Text substituted for `{{context}}` (or `{{summary}}`) in the answer prompt.
    pub fn prompt_context(&self) -> String {
        match self {
            Evidence::Visual(results) => results
                .iter()
                .map(|r| format!("At {:.1}s: {}", r.highlight.timestamp, r.highlight.description))
                .collect::<Vec<_>>()
                .join("\n"),
            Evidence::Audio(results) => results
                .iter()
                .map(|r| {
                    format!(
                        "At {:.1}s-{}: \"{}\"",
                        r.highlight.timestamp,
                        format_end(r.highlight.end_timestamp),
                        r.highlight.description
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Evidence::Fused(segments) => format_fused(segments),
            Evidence::Summary(summary) => summary.clone().unwrap_or_default(),
        }
    }

    /// Flatten into the result list returned to API clients.
    ///
    /// Fused evidence lists each speech segment followed by its visuals, with
    /// a `type` on every item. Summary evidence has no result items.
    pub fn result_items(&self) -> Vec<ResultItem> {
        match self {
            Evidence::Visual(results) | Evidence::Audio(results) => {
                results.iter().map(|r| ResultItem::from_ranked(r, None)).collect()
            }
            Evidence::Fused(segments) => segments
                .iter()
                .flat_map(|segment| {
                    let mut audio = ResultItem::from_ranked(&segment.audio_segment, Some(HighlightKind::Audio));
                    audio.end_timestamp = Some(segment.end_timestamp);

                    std::iter::once(audio).chain(
                        segment
                            .related_visuals
                            .iter()
                            .map(|v| ResultItem::from_ranked(v, Some(HighlightKind::Visual))),
                    )
                })
                .collect(),
            Evidence::Summary(_) => Vec::new(),
        }
    }
}

fn format_end(end: Option<f64>) -> String {
    end.map(|e| format!("{:.1}s", e))
        .unwrap_or_else(|| "N/A".to_string())
}

fn format_fused(segments: &[FusedSegment]) -> String {
    let mut lines = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        lines.push(format!(
            "TIME PERIOD {} ({:.1}s-{:.1}s):",
            i + 1,
            segment.timestamp,
            segment.end_timestamp
        ));
        lines.push(format!(
            "  SPEECH: \"{}\"",
            segment.audio_segment.highlight.description
        ));

        if segment.related_visuals.is_empty() {
            lines.push("  VISUAL SCENE: No visual data available for this time period".to_string());
        } else {
            lines.push("  VISUAL SCENE during this speech:".to_string());
            for visual in &segment.related_visuals {
                lines.push(format!(
                    "    - At {:.1}s: {}",
                    visual.highlight.timestamp, visual.highlight.description
                ));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n").trim_end().to_string()
}

/// One evidence item in a query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub timestamp: f64,
    pub end_timestamp: Option<f64>,
    pub description: String,
    /// Per-highlight summary; always empty for now.
    pub summary: String,
    /// Filename of the source video.
    pub video: String,
    pub similarity: f32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<HighlightKind>,
}

impl ResultItem {
    fn from_ranked(result: &RankedResult, kind: Option<HighlightKind>) -> Self {
        Self {
            timestamp: result.highlight.timestamp,
            end_timestamp: result.highlight.end_timestamp,
            description: result.highlight.description.clone(),
            summary: String::new(),
            video: result.filename.clone(),
            similarity: result.similarity,
            kind,
        }
    }
}

// crates/export/src/lib.rs

use chrono::{TimeZone, Utc};
use livecap_core::{CaptionSegment, LivecapError, LivecapResult};

/// Duration assigned to the final cue, which has no successor to borrow
/// an end time from.
const FINAL_CUE_MS: i64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Srt,
    Vtt,
    Txt,
    Json,
}

impl ExportFormat {
    pub fn parse(value: &str) -> LivecapResult<Self> {
        match value {
            "srt" => Ok(ExportFormat::Srt),
            "vtt" => Ok(ExportFormat::Vtt),
            "txt" => Ok(ExportFormat::Txt),
            "json" => Ok(ExportFormat::Json),
            other => Err(LivecapError::InvalidInput(format!(
                "Unsupported export format: {} (expected srt, vtt, txt or json)",
                other
            ))),
        }
    }
}

/// Render a session's full segment history in the requested format.
/// Pure over its input; an unsupported format yields an error and no
/// partial output.
pub fn render(segments: &[CaptionSegment], format: ExportFormat) -> LivecapResult<String> {
    match format {
        ExportFormat::Srt => Ok(render_cues(segments, ",", "")),
        ExportFormat::Vtt => Ok(render_cues(segments, ".", "WEBVTT\n\n")),
        ExportFormat::Txt => Ok(render_txt(segments)),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(segments)?),
    }
}

/// Shared SRT/VTT cue computation: each cue ends where the next segment
/// starts; the final cue runs for a fixed tail. Clocks are relative to
/// the first segment's capture time.
fn render_cues(segments: &[CaptionSegment], millis_sep: &str, header: &str) -> String {
    let mut out = String::from(header);
    let Some(first) = segments.first() else {
        return out;
    };
    let base = first.timestamp_ms;

    for (i, segment) in segments.iter().enumerate() {
        let start = segment.timestamp_ms - base;
        let end = segments
            .get(i + 1)
            .map(|next| next.timestamp_ms - base)
            .unwrap_or(start + FINAL_CUE_MS);

        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            clock(start, millis_sep),
            clock(end, millis_sep),
            segment.text
        ));
    }
    out
}

fn render_txt(segments: &[CaptionSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        let timestamp = Utc
            .timestamp_millis_opt(segment.timestamp_ms)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| segment.timestamp_ms.to_string());
        let speaker = segment.speaker.as_deref().unwrap_or("Speaker");
        out.push_str(&format!("[{}] {}: {}\n", timestamp, speaker, segment.text));
    }
    out
}

fn clock(ms: i64, millis_sep: &str) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, seconds, millis_sep, millis
    )
}

//! Stream discovery with `ffprobe`.

use std::path::Path;
use std::process::{Command, Stdio};

use glyphreel_core::{Error, MediaInfo, Result};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
}

/// Run `ffprobe` on `source` and extract the stream information.
pub fn probe(ffprobe: &Path, source: &Path) -> Result<MediaInfo> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(source)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::Probe(format!("Failed to run {}: {e}", ffprobe.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::SourceUnreadable {
            path: source.to_path_buf(),
            message: stderr.trim().to_string(),
        });
    }

    let json = String::from_utf8_lossy(&output.stdout);
    parse_probe(&json, source)
}

/// Parse `ffprobe -print_format json -show_streams` output.
///
/// The first video stream supplies the geometry and frame rate, the first
/// audio stream the sample rate.
pub fn parse_probe(json: &str, source: &Path) -> Result<MediaInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Probe(format!("Unreadable ffprobe output: {e}")))?;

    let mut video: Option<(u32, u32, f64)> = None;
    let mut sample_rate = None;

    for stream in &parsed.streams {
        debug!(
            "Found stream {}: {} ({})",
            stream.index,
            stream.codec_type,
            stream.codec_name.as_deref().unwrap_or("unknown codec")
        );

        match stream.codec_type.as_str() {
            "video" if video.is_none() => {
                let (Some(width), Some(height)) = (stream.width, stream.height) else {
                    return Err(Error::Probe(format!(
                        "video stream {} has no dimensions",
                        stream.index
                    )));
                };
                video = Some((width, height, stream_frame_rate(stream)?));
            }
            "audio" if sample_rate.is_none() => {
                let raw = stream.sample_rate.as_deref().unwrap_or_default();
                let rate = raw.parse::<u32>().map_err(|_| {
                    Error::Probe(format!(
                        "could not parse sample rate - expected integer, got \"{raw}\""
                    ))
                })?;
                sample_rate = Some(rate);
            }
            _ => {}
        }
    }

    let (width, height, frame_rate) =
        video.ok_or_else(|| Error::NoVideoTrack(source.to_path_buf()))?;

    let info = MediaInfo {
        width,
        height,
        frame_rate,
        sample_rate,
    };
    info!(
        "Probed {}: {}x{} @ {:.3} fps, audio: {:?}",
        source.display(),
        width,
        height,
        frame_rate,
        sample_rate
    );
    Ok(info)
}

fn stream_frame_rate(stream: &ProbeStream) -> Result<f64> {
    let candidates = [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()];
    let mut last = "";
    for raw in candidates.into_iter().flatten() {
        last = raw;
        if let Some(rate) = parse_rational(raw) {
            return Ok(rate);
        }
    }
    Err(Error::Probe(format!(
        "could not parse framerate - expected format: \"float/float\", got \"{last}\""
    )))
}

/// Parse an ffprobe rational such as `30000/1001`. `0/0` and other
/// non-positive values yield `None`.
pub fn parse_rational(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    let rate = num / den;
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "index": 0, "codec_type": "video", "codec_name": "h264",
              "width": 1280, "height": 720,
              "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001" },
            { "index": 1, "codec_type": "audio", "codec_name": "aac",
              "sample_rate": "44100" }
        ]
    }"#;

    #[test]
    fn test_parse_video_and_audio() {
        let info = parse_probe(SAMPLE, Path::new("clip.mp4")).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert!((info.frame_rate - 29.97).abs() < 0.01);
        assert_eq!(info.sample_rate, Some(44100));
    }

    #[test]
    fn test_parse_without_audio() {
        let json = r#"{ "streams": [
            { "index": 0, "codec_type": "video", "width": 64, "height": 48,
              "avg_frame_rate": "0/0", "r_frame_rate": "25/1" }
        ] }"#;
        let info = parse_probe(json, Path::new("silent.mkv")).unwrap();
        assert!((info.frame_rate - 25.0).abs() < f64::EPSILON);
        assert_eq!(info.sample_rate, None);
    }

    #[test]
    fn test_parse_no_video() {
        let json = r#"{ "streams": [ { "codec_type": "audio", "sample_rate": "48000" } ] }"#;
        let err = parse_probe(json, Path::new("song.mp3")).unwrap_err();
        assert!(matches!(err, Error::NoVideoTrack(_)));
    }

    #[test]
    fn test_parse_bad_frame_rate() {
        let json = r#"{ "streams": [
            { "codec_type": "video", "width": 2, "height": 2, "avg_frame_rate": "abc" }
        ] }"#;
        assert!(matches!(
            parse_probe(json, Path::new("x")),
            Err(Error::Probe(_))
        ));
    }

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("25/1"), Some(25.0));
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("30"), None);
    }
}

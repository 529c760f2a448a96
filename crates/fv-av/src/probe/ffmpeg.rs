//! FFmpeg-based [`fv_probe::AttachmentProber`] implementation.
//!
//! Lists attachment streams with
//! `ffprobe -v error -print_format json -show_streams -select_streams t`
//! and dumps one with `ffmpeg -dump_attachment:<index> <dest> -i <file>`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use fv_probe::{AttachmentProber, AttachmentStream, ProbeError, ProbedAttachment};
use serde::Deserialize;

use crate::command::ToolCommand;
use crate::tools::{Tool, ToolRegistry};

const NAME: &str = "ffmpeg";

/// A prober backed by the `ffprobe` and `ffmpeg` CLIs.
#[derive(Debug, Clone)]
pub struct FfmpegProber {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfmpegProber {
    /// Create a new prober using the given tool paths.
    pub fn new(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            timeout: Duration::from_secs(300),
        }
    }

    /// Build from discovered tools; fails if either tool is missing.
    pub fn from_registry(tools: &ToolRegistry) -> fv_core::Result<Self> {
        let ffmpeg = tools.require(Tool::Ffmpeg)?;
        let ffprobe = tools.require(Tool::Ffprobe)?;
        Ok(Self::new(ffmpeg.to_path_buf(), ffprobe.to_path_buf()))
    }

    /// Bound a single ffprobe/ffmpeg run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn probe_streams(&self, path: &Path) -> Result<Vec<AttachmentStream>, ProbeError> {
        let output = ToolCommand::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .args(["-select_streams", "t"])
            .arg(path)
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| ProbeError::failed("ffprobe", e.to_string()))?;

        parse_streams(&output.stdout)
    }
}

#[async_trait]
impl AttachmentProber for FfmpegProber {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, path: &Path) -> bool {
        // ffmpeg handles basically every container.
        path.extension().is_some()
    }

    async fn list(&self, path: &Path) -> Result<Vec<AttachmentStream>, ProbeError> {
        self.probe_streams(path).await
    }

    async fn extract(
        &self,
        path: &Path,
        index: u32,
        dest: &Path,
    ) -> Result<ProbedAttachment, ProbeError> {
        let streams = self.probe_streams(path).await?;
        let stream = streams
            .iter()
            .find(|s| s.index == index)
            .ok_or_else(|| ProbeError::IndexNotFound {
                path: path.to_path_buf(),
                index,
            })?;

        // ffmpeg can exit non-zero here even when the dump succeeded, so a
        // non-empty file counts on its own. An empty one needs a clean exit.
        let output = ToolCommand::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-v", "error", "-y"])
            .arg(format!("-dump_attachment:{index}"))
            .arg(dest)
            .arg("-i")
            .arg(path)
            .args(["-t", "0", "-f", "null", "-"])
            .timeout(self.timeout)
            .run()
            .await
            .map_err(|e| ProbeError::failed(NAME, e.to_string()))?;

        let written = tokio::fs::metadata(dest)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if !dump_succeeded(written, output.status.success()) {
            return Err(ProbeError::failed(
                NAME,
                format!(
                    "attachment {index} of {} was not dumped: {}",
                    path.display(),
                    output.last_error_line()
                ),
            ));
        }

        tracing::debug!(
            path = %path.display(),
            index,
            bytes = written,
            "dumped attachment with ffmpeg"
        );

        Ok(ProbedAttachment::from(stream))
    }
}

fn dump_succeeded(written: u64, exited_cleanly: bool) -> bool {
    written > 0 || exited_cleanly
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    extradata_size: Option<u64>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    filename: Option<String>,
    mimetype: Option<String>,
}

fn parse_streams(json: &str) -> Result<Vec<AttachmentStream>, ProbeError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ProbeError::failed("ffprobe", format!("JSON parse error: {e}")))?;

    Ok(output
        .streams
        .into_iter()
        .filter(|s| s.codec_type.as_deref() == Some("attachment"))
        .map(|s| {
            let probed = ProbedAttachment::new(s.tags.mimetype, s.tags.filename);
            AttachmentStream {
                index: s.index,
                file_name: probed.file_name,
                mime_type: probed.mime_type,
                size: s.extradata_size,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 3,
                "codec_name": "ttf",
                "codec_type": "attachment",
                "extradata_size": 4096,
                "tags": { "filename": "Arial.ttf", "mimetype": "font/ttf" }
            },
            {
                "index": 4,
                "codec_type": "attachment",
                "tags": { "filename": "subs.vtt", "mimetype": "" }
            },
            {
                "index": 0,
                "codec_type": "video"
            }
        ]
    }"#;

    #[test]
    fn parses_attachment_streams() {
        let streams = parse_streams(SAMPLE).unwrap();
        assert_eq!(streams.len(), 2);

        assert_eq!(streams[0].index, 3);
        assert_eq!(streams[0].file_name.as_deref(), Some("Arial.ttf"));
        assert_eq!(streams[0].mime_type.as_deref(), Some("font/ttf"));
        assert_eq!(streams[0].size, Some(4096));

        assert_eq!(streams[1].index, 4);
        assert_eq!(streams[1].mime_type, None);
        assert_eq!(streams[1].size, None);
    }

    #[test]
    fn empty_output_has_no_streams() {
        assert!(parse_streams("{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_output_is_probe_failure() {
        let err = parse_streams("not json").unwrap_err();
        assert!(matches!(err, ProbeError::Failed { .. }));
    }

    #[test]
    fn empty_dump_needs_clean_exit() {
        assert!(dump_succeeded(4096, false));
        assert!(dump_succeeded(4096, true));
        assert!(dump_succeeded(0, true));
        assert!(!dump_succeeded(0, false));
    }

    #[test]
    fn from_registry_requires_tools() {
        let err = FfmpegProber::from_registry(&ToolRegistry::default()).unwrap_err();
        assert!(matches!(err, fv_core::Error::Tool { .. }));
    }

    #[test]
    fn supports_any_extension() {
        let prober = FfmpegProber::new("ffmpeg".into(), "ffprobe".into());
        assert!(prober.supports(Path::new("movie.mp4")));
        assert!(prober.supports(Path::new("movie.mkv")));
        assert!(!prober.supports(Path::new("movie")));
    }
}

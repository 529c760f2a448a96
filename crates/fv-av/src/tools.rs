//! Locating the ffmpeg and ffprobe executables.

use std::fmt;
use std::path::{Path, PathBuf};

use fv_core::config::ToolsConfig;
use serde::Serialize;

/// The external programs the ffmpeg prober shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::Ffmpeg, Tool::Ffprobe];

    pub fn binary(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }

    fn configured(self, config: &ToolsConfig) -> Option<&Path> {
        match self {
            Tool::Ffmpeg => config.ffmpeg_path.as_deref(),
            Tool::Ffprobe => config.ffprobe_path.as_deref(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Availability report for one tool.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    #[schema(value_type = Option<String>)]
    pub path: Option<PathBuf>,
}

/// Resolved executable paths, filled once at startup.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
}

impl ToolRegistry {
    /// Resolve each tool from its configured path, then from `PATH`.
    ///
    /// A configured path that does not exist is logged and ignored. Tools
    /// that cannot be found anywhere stay unset.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut registry = Self::default();
        for tool in Tool::ALL {
            *registry.slot_mut(tool) = locate(tool, tool.configured(config));
        }
        registry
    }

    /// Path of `tool`, or a tool error if it was not found.
    pub fn require(&self, tool: Tool) -> fv_core::Result<&Path> {
        self.get(tool).ok_or_else(|| {
            fv_core::Error::tool(tool.binary(), "not installed or not in PATH")
        })
    }

    pub fn get(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Ffmpeg => self.ffmpeg.as_deref(),
            Tool::Ffprobe => self.ffprobe.as_deref(),
        }
    }

    fn slot_mut(&mut self, tool: Tool) -> &mut Option<PathBuf> {
        match tool {
            Tool::Ffmpeg => &mut self.ffmpeg,
            Tool::Ffprobe => &mut self.ffprobe,
        }
    }

    /// Report every tool, running `-version` on the ones that were found.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        Tool::ALL
            .into_iter()
            .map(|tool| {
                let path = self.get(tool);
                ToolInfo {
                    name: tool.binary().to_string(),
                    available: path.is_some(),
                    version: path.and_then(version_line),
                    path: path.map(Path::to_path_buf),
                }
            })
            .collect()
    }
}

fn locate(tool: Tool, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(
            %tool,
            path = %path.display(),
            "Configured tool path does not exist; falling back to PATH"
        );
    }
    which::which(tool.binary()).ok()
}

fn version_line(path: &Path) -> Option<String> {
    let out = std::process::Command::new(path).arg("-version").output().ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .next()
        .map(str::to_owned)
}

//! # fv-av
//!
//! External tool management and the ffmpeg-backed attachment prober.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- resolve ffmpeg and ffprobe from
//!   config or `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- a killed-on-drop process run
//!   with an optional time limit.
//! - **Probe backend** ([`probe::FfmpegProber`]) -- implements
//!   [`fv_probe::AttachmentProber`] by shelling out to ffprobe/ffmpeg.

pub mod command;
pub mod probe;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use probe::FfmpegProber;
pub use tools::{Tool, ToolInfo, ToolRegistry};

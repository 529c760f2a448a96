//! Probe backends that shell out to external CLI tools.

pub mod ffmpeg;

pub use ffmpeg::FfmpegProber;

//! # fv-probe
//!
//! Container probing for embedded attachments (fonts, cover art, subtitle
//! files and other streams muxed into a media container).
//!
//! The [`AttachmentProber`] trait is the black-box capability the attachment
//! cache calls into: list the attachment streams of a file, or dump one of
//! them to a destination path. This crate ships:
//!
//! - [`MatroskaProber`]: pure Rust, reads MKV/WebM attachments with the
//!   `matroska` crate, no external tools required
//! - [`CompositeProber`]: tries several probers in order
//!
//! The ffmpeg-backed implementation lives in `fv-av`.
//!
//! ## Quick start
//!
//! ```no_run
//! use fv_probe::{AttachmentProber, MatroskaProber};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), fv_probe::ProbeError> {
//! let prober = MatroskaProber::new();
//! for stream in prober.list(Path::new("movie.mkv")).await? {
//!     println!("#{} {:?} {:?}", stream.index, stream.file_name, stream.mime_type);
//! }
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod error;
pub mod mkv;
pub mod prober;
pub mod types;

// Re-export key types at crate root for convenience.
pub use composite::CompositeProber;
pub use error::ProbeError;
pub use mkv::MatroskaProber;
pub use prober::AttachmentProber;
pub use types::{AttachmentStream, ProbedAttachment};

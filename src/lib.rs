//! Image-to-PDF merging for document submission.
//!
//! Uploaded images are decoded, flattened to RGB, bounded in size, captioned
//! with their filename and laid out one per page, in upload order. Files that
//! fail to decode are skipped and reported instead of failing the request.

pub mod config;
pub mod error;
pub mod imaging;
pub mod intake;
pub mod pdf;
pub mod pipeline;
pub mod response;

pub use error::{Result, SnapMergeError};
pub use intake::{MergeMode, UploadedFile};
pub use pipeline::assembler::{Assembler, MergeOutcome};

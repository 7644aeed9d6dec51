//! UI Module - terminal output for pipeline runs
//!
//! - [`theme`] - Colors and icons
//! - [`output`] - The [`Reporter`](apkforge_core::Reporter) the binary hands to every stage
//! - [`summary`] - Per-stage outcome table printed when a run ends

pub mod output;
pub mod summary;
pub mod theme;

pub use output::Output;
pub use theme::Theme;

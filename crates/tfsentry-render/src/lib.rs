//! Rendering utilities for CI surfaces (Markdown, GitHub annotations).
//!
//! Renderers work on a flattened [`RenderableReport`] so they stay independent of the
//! report DTOs.

#![forbid(unsafe_code)]

mod gha;
mod markdown;
mod model;

pub use gha::render_github_annotations;
pub use markdown::render_markdown;
pub use model::{
    RenderableData, RenderableFinding, RenderableLocation, RenderableReport, RenderableStatus,
    RenderableVerdictStatus,
};

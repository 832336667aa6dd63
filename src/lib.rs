//! Encore records 2D drawing operations into an immutable display list and
//! replays it against interchangeable raster backends.
//!
//! # Pipeline overview
//!
//! 1. **Record**: [`DisplayListBuilder`] appends operations in call order and
//!    maintains a running aggregate bound.
//! 2. **Freeze**: [`DisplayListBuilder::freeze`] moves the recording into an
//!    immutable, cheaply shareable [`DisplayList`].
//! 3. **Replay**: [`DisplayList::render_to`] issues every operation, strictly
//!    in recorded order, into a provider-owned destination surface.
//! 4. **Submit/snapshot**: [`CanvasProvider::flush_and_submit`] forces
//!    rasterization; [`CanvasProvider::snapshot`] exports a PNG under a
//!    deterministic name.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: recording is pure; replaying one list twice
//!   against fresh, identical destinations produces identical pixels.
//! - **Order is load-bearing**: the list is a painter's-algorithm program, not
//!   a commutative set.
//! - **Premultiplied RGBA8** end-to-end: surfaces read back premultiplied
//!   pixels.
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod blur;
pub mod core;
pub mod error;
pub mod geometry;
pub mod list;
pub mod op;
pub mod path;
pub mod render;
pub mod scenarios;
pub mod snapshot;
pub mod text;

pub use crate::core::{FrameRgba8, Rgba8};
pub use error::{EncoreError, EncoreResult};
pub use list::{DisplayList, DisplayListBuilder};
pub use op::{
    BlendMode, DrawOp, FilterMode, FontBytes, Glyph, PointMode, RasterImage, SrcRectConstraint,
    TextBlob, VertexMesh, VertexMode,
};
pub use path::{DrawPath, PathVerb};
pub use render::{
    BackendKind, CanvasProvider, DrawTarget, RenderSettings, create_provider,
    parallel::replay_parallel,
};
pub use scenarios::{ImageHandles, RoundRectShape, ScenarioId, Workload};
pub use text::shape_blob;

//! Inpaint a selected region of a layered raster document through a locally
//! running IOPaint-compatible HTTP service.
//!
//! The pipeline crops a context-padded window around the selection, sends it
//! with the selection mask as base64 PNG payloads, then composites the
//! returned pixels back onto the layer through the mask (duplicate → write →
//! merge down).  The hosting editor is abstracted behind
//! [`host::DocumentHost`]; [`canvas::Document`] is the in-memory host used
//! by the CLI and the tests.

pub mod canvas;
pub mod cli;
pub mod client;
pub mod host;
pub mod logger;
pub mod ops;

pub use canvas::{Document, Rect};
pub use client::{DEFAULT_AUTHORITY, InpaintClient};
pub use host::DocumentHost;
pub use ops::inpaint::{InpaintError, InpaintOutcome, InpaintSettings};
pub use ops::region::PAD;

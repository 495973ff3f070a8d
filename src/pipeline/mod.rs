//! Pipeline stages for one chat turn.
//!
//! One submodule per step. The network-facing parts sit behind traits.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ render ──▶ encode ──▶ gateway ──▶ postprocess ──▶ html
//! (disk)     (pdfium)   (base64)   (LLM)        (cleanup)       (rich only)
//! ```
//!
//! 1. [`upload`]: validate a request's files as a batch, then store them
//!    under timestamped names
//! 2. [`render`]: rasterise the active page; runs in `spawn_blocking`
//!    because pdfium is CPU-bound
//! 3. [`encode`]: PNG-encode and base64-wrap the page for the vision API
//! 4. [`gateway`]: chat completion and optional illustration; the only
//!    stage with network I/O
//! 5. [`postprocess`]: deterministic text cleanup of the reply
//! 6. [`html`]: Markdown → HTML for rich replies

pub mod encode;
pub mod gateway;
pub mod html;
pub mod postprocess;
pub mod render;
pub mod upload;

//! Pipeline stages for document translation.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the orchestration in [`crate::translate`] reads top to bottom.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ mime ──▶ image_pdf ──▶ encode ──▶ (API) ──▶ mime ──▶ output
//! (path/URL) (dispatch) (images only) (base64)          (extension) (write)
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path or URL to a local file
//! 2. [`mime`]      — detect the input type and map response types to extensions
//! 3. [`image_pdf`] — lay an image out on a single PDF page; runs in
//!    `spawn_blocking` because decoding is CPU-bound
//! 4. [`encode`]    — base64 for the JSON request and response bodies
//! 5. [`output`]    — name and atomically write the translated document

pub mod encode;
pub mod image_pdf;
pub mod input;
pub mod mime;
pub mod output;

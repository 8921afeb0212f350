//! Pipeline stages for PDF classification.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the two classification strategies share everything except
//! extraction and prompting.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document ──▶ extract ──▶ strategy ──▶ llm ──▶ normalize
//! (dir)     (pdfium)     (excerpt)   (request)    (model)  (result)
//! ```
//!
//! 1. [`input`]:     list the `.pdf` files of a directory in name order
//! 2. [`document`]:  open the file with pdfium on the blocking pool
//! 3. [`extract`]:   sample bounded text (and a page image for hybrid)
//! 4. [`strategy`]:  screen the excerpt and assemble the request; [`encode`]
//!    JPEG-wraps the page image
//! 5. [`llm`]:       the only stage with network I/O; retry with backoff
//! 6. [`normalize`]: turn whatever the model said into a bounded result

pub mod document;
pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod strategy;

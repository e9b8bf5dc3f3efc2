//! newtab-links: open external and PDF links in a new tab
//!
//! Post-build pass over static HTML:
//! - annotate: rewrite `target`/`rel` and append an external-link marker
//! - scan: preview how each link would be classified

pub mod annotate;
pub mod classify;
pub mod config;
pub mod error;
pub mod files;
pub mod init;
pub mod logging;
pub mod scan;

pub use annotate::{annotate_html, AnnotateStats, Annotated};
pub use classify::{classify, LinkClass, LinkRules, PageLocation};
pub use config::{AnnotatorConfig, MarkerConfig};
pub use error::AnnotateError;
pub use scan::{scan_html, LinkEntry};

//! Library error types

use thiserror::Error;

/// Errors surfaced by the annotation pass.
///
/// Malformed `href` values are not errors: those links are classified as
/// unresolvable and left untouched.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("invalid page URL `{url}`: {source}")]
    InvalidPageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("page URL `{0}` cannot be used as a base for relative links")]
    CannotBeABase(String),

    #[error("HTML rewriting failed: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

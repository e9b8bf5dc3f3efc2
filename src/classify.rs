//! Link classification
//!
//! Decides, for a single `href`, whether the annotator should leave the link
//! alone, open it in a new tab, or also mark it as external. Classification
//! depends only on the raw attribute value, the page location and the rules.

use crate::error::AnnotateError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Absolute location of the document being processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    /// Parse an absolute page URL
    pub fn parse(url: &str) -> Result<Self, AnnotateError> {
        let parsed = Url::parse(url).map_err(|source| AnnotateError::InvalidPageUrl {
            url: url.to_string(),
            source,
        })?;
        Self::from_url(parsed)
    }

    pub fn from_url(url: Url) -> Result<Self, AnnotateError> {
        if url.cannot_be_a_base() {
            return Err(AnnotateError::CannotBeABase(url.to_string()));
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Hostname, empty when the URL has none (e.g. `file:///site/index.html`)
    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    /// Resolve `href` against this page, `None` when it is malformed
    pub fn resolve(&self, href: &str) -> Option<Url> {
        self.url.join(href).ok()
    }
}

impl std::fmt::Display for PageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Tunable parts of the classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkRules {
    /// Raw prefixes that exempt a link (case-sensitive)
    pub skip_prefixes: Vec<String>,
    /// Path suffix identifying documents that open in a new tab (case-insensitive)
    pub pdf_suffix: String,
}

impl Default for LinkRules {
    fn default() -> Self {
        Self {
            skip_prefixes: ["#", "javascript:", "mailto:", "tel:"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            pdf_suffix: ".pdf".to_string(),
        }
    }
}

/// What the annotator does with a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkClass {
    /// Empty href or a skip prefix (in-page jump, javascript:, mailto:, tel:)
    Skipped,
    /// href could not be resolved against the page
    Unresolvable,
    /// Same host, not a PDF
    Internal,
    /// Same host, path ends in the PDF suffix
    Pdf,
    /// Different host (PDF or not)
    External,
}

impl LinkClass {
    pub fn opens_new_tab(self) -> bool {
        matches!(self, LinkClass::Pdf | LinkClass::External)
    }

    pub fn wants_marker(self) -> bool {
        self == LinkClass::External
    }
}

impl std::fmt::Display for LinkClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkClass::Skipped => write!(f, "skipped"),
            LinkClass::Unresolvable => write!(f, "unresolvable"),
            LinkClass::Internal => write!(f, "internal"),
            LinkClass::Pdf => write!(f, "pdf"),
            LinkClass::External => write!(f, "external"),
        }
    }
}

/// Classify a raw `href` attribute value
pub fn classify(href: &str, page: &PageLocation, rules: &LinkRules) -> LinkClass {
    if href.is_empty() || rules.skip_prefixes.iter().any(|p| href.starts_with(p.as_str())) {
        return LinkClass::Skipped;
    }

    let Some(resolved) = page.resolve(href) else {
        return LinkClass::Unresolvable;
    };

    if resolved.host_str().unwrap_or("") != page.hostname() {
        return LinkClass::External;
    }

    if is_pdf_path(resolved.path(), &rules.pdf_suffix) {
        LinkClass::Pdf
    } else {
        LinkClass::Internal
    }
}

fn is_pdf_path(path: &str, suffix: &str) -> bool {
    path.to_lowercase().ends_with(&suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageLocation {
        PageLocation::parse("https://example.com/docs/page.html").unwrap()
    }

    fn class_of(href: &str) -> LinkClass {
        classify(href, &page(), &LinkRules::default())
    }

    #[test]
    fn test_skip_prefixes() {
        assert_eq!(class_of("#section2"), LinkClass::Skipped);
        assert_eq!(class_of("mailto:a@b.com"), LinkClass::Skipped);
        assert_eq!(class_of("tel:+15551234"), LinkClass::Skipped);
        assert_eq!(class_of("javascript:void(0)"), LinkClass::Skipped);
        assert_eq!(class_of(""), LinkClass::Skipped);
    }

    #[test]
    fn test_skip_prefix_is_case_sensitive() {
        // Not skipped, resolves to a host-less URL which differs from the page host
        assert_eq!(class_of("MAILTO:a@b.com"), LinkClass::External);
    }

    #[test]
    fn test_unresolvable() {
        assert_eq!(class_of("http://[invalid"), LinkClass::Unresolvable);
        assert_eq!(class_of("http://a b"), LinkClass::Unresolvable);
    }

    #[test]
    fn test_internal() {
        assert_eq!(class_of("/docs/page.html"), LinkClass::Internal);
        assert_eq!(class_of("other.html"), LinkClass::Internal);
        assert_eq!(class_of("https://EXAMPLE.com/x"), LinkClass::Internal);
    }

    #[test]
    fn test_external() {
        assert_eq!(class_of("https://other.org/x"), LinkClass::External);
        assert_eq!(class_of("//cdn.example.net/lib.js"), LinkClass::External);
        // No subdomain normalization
        assert_eq!(class_of("https://www.example.com/"), LinkClass::External);
        // External wins over PDF
        assert_eq!(class_of("https://other.org/paper.pdf"), LinkClass::External);
    }

    #[test]
    fn test_pdf() {
        assert_eq!(class_of("/files/report.PDF"), LinkClass::Pdf);
        assert_eq!(class_of("report.pdf?download=1"), LinkClass::Pdf);
        assert_eq!(class_of("report.pdf.html"), LinkClass::Internal);
    }

    #[test]
    fn test_custom_rules() {
        let rules = LinkRules {
            skip_prefixes: vec!["/private/".to_string()],
            pdf_suffix: ".EPUB".to_string(),
        };
        assert_eq!(classify("/private/a.html", &page(), &rules), LinkClass::Skipped);
        assert_eq!(classify("book.epub", &page(), &rules), LinkClass::Pdf);
        assert_eq!(classify("#top", &page(), &rules), LinkClass::Internal);
    }

    #[test]
    fn test_actions() {
        assert!(!LinkClass::Internal.opens_new_tab());
        assert!(LinkClass::Pdf.opens_new_tab());
        assert!(!LinkClass::Pdf.wants_marker());
        assert!(LinkClass::External.opens_new_tab());
        assert!(LinkClass::External.wants_marker());
    }

    #[test]
    fn test_page_location_errors() {
        assert!(matches!(
            PageLocation::parse("not a url"),
            Err(AnnotateError::InvalidPageUrl { .. })
        ));
        assert!(matches!(
            PageLocation::parse("data:text/html,hi"),
            Err(AnnotateError::CannotBeABase(_))
        ));
        assert_eq!(
            PageLocation::parse("file:///site/index.html").unwrap().hostname(),
            ""
        );
    }
}

//! scan command: Preview link classification without rewriting
//!
//! Parses each document and lists every `a[href]` with the class the
//! annotator would assign.

use crate::annotate::AnnotateStats;
use crate::classify::{classify, LinkClass, LinkRules, PageLocation};
use crate::config;
use crate::files::{expand_inputs, page_url};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use scraper::{Html, Selector};
use serde::Serialize;
use std::path::PathBuf;
use url::Url;

#[derive(Args)]
pub struct ScanArgs {
    /// HTML files, directories or glob patterns
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// URL the site is served from (page URLs are derived from file paths)
    #[arg(long, env = "NEWTAB_BASE_URL")]
    pub base_url: String,

    /// Site root used to compute file paths (default: the directory argument)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Output format: json (default) or yaml
    #[arg(long, short, default_value = "json")]
    pub format: String,

    /// Config file (default: ./newtab.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// One anchor and its classification
#[derive(Debug, Clone, Serialize)]
pub struct LinkEntry {
    pub href: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub class: LinkClass,
    pub new_tab: bool,
    pub marker: bool,
}

#[derive(Debug, Serialize)]
pub struct ScanFile {
    pub file: String,
    pub page_url: String,
    pub summary: AnnotateStats,
    pub links: Vec<LinkEntry>,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub files: Vec<ScanFile>,
    pub totals: AnnotateStats,
    pub timestamp: String,
}

pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let config = config::load(args.config.as_deref()).await?;
    let base = Url::parse(&args.base_url)
        .with_context(|| format!("Invalid --base-url: {}", args.base_url))?;
    let inputs = expand_inputs(&args.paths, args.root.as_deref()).await?;

    if inputs.is_empty() {
        bail!("No HTML files found");
    }

    let mut files = Vec::with_capacity(inputs.len());
    let mut totals = AnnotateStats::default();

    for input in &inputs {
        tracing::info!("  -> {}", input.path.display());
        let page = page_url(&base, &input.rel)?;
        let html = tokio::fs::read_to_string(&input.path)
            .await
            .with_context(|| format!("Failed to read file: {}", input.path.display()))?;

        let links = scan_html(&html, &page, &config.rules);
        let summary = summarize(&links);
        totals.add(&summary);

        files.push(ScanFile {
            file: input.path.display().to_string(),
            page_url: page.to_string(),
            summary,
            links,
        });
    }

    let report = ScanReport {
        files,
        totals,
        timestamp: Utc::now().to_rfc3339(),
    };

    let output = match args.format.as_str() {
        "yaml" | "yml" => serde_yaml::to_string(&report)?,
        _ => serde_json::to_string(&report)?,
    };
    println!("{}", output);

    tracing::info!(
        "Done: {} links, {} would open in a new tab",
        totals.links,
        totals.rewritten()
    );
    Ok(())
}

/// Classify every `a[href]` in document order
pub fn scan_html(html: &str, page: &PageLocation, rules: &LinkRules) -> Vec<LinkEntry> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);

    doc.select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let class = classify(href, page, rules);
            Some(LinkEntry {
                href: href.to_string(),
                text: truncate(&collapse_whitespace(&el.text().collect::<String>()), 80),
                class,
                new_tab: class.opens_new_tab(),
                marker: class.wants_marker(),
            })
        })
        .collect()
}

fn summarize(links: &[LinkEntry]) -> AnnotateStats {
    let mut stats = AnnotateStats {
        links: links.len(),
        ..AnnotateStats::default()
    };
    for link in links {
        stats.record(link.class);
    }
    stats
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageLocation {
        PageLocation::parse("https://example.com/docs/page.html").unwrap()
    }

    #[test]
    fn test_scan_scenarios() {
        let html = r##"
            <html><body>
              <a href="#section2">Section 2</a>
              <a href="/docs/page.html">This page</a>
              <a href="https://other.org/x">Other
                 site</a>
              <a href="/files/report.PDF">Report</a>
              <a href="mailto:a@b.com">Mail</a>
              <a href="http://[invalid">Broken</a>
              <a>No href</a>
            </body></html>
        "##;
        let links = scan_html(html, &page(), &LinkRules::default());
        let classes: Vec<_> = links.iter().map(|l| l.class).collect();
        assert_eq!(
            classes,
            vec![
                LinkClass::Skipped,
                LinkClass::Internal,
                LinkClass::External,
                LinkClass::Pdf,
                LinkClass::Skipped,
                LinkClass::Unresolvable,
            ]
        );
        assert_eq!(links[2].text, "Other site");
        assert!(links[2].marker);
        assert!(links[3].new_tab && !links[3].marker);
    }

    #[test]
    fn test_summarize() {
        let html = r#"<a href="a.pdf">a</a><a href="https://x.org/">x</a><a href="b.html">b</a>"#;
        let summary = summarize(&scan_html(html, &page(), &LinkRules::default()));
        assert_eq!(summary.links, 3);
        assert_eq!(summary.pdf, 1);
        assert_eq!(summary.external, 1);
        assert_eq!(summary.internal, 1);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LinkEntry {
            href: "https://other.org/".to_string(),
            text: String::new(),
            class: LinkClass::External,
            new_tab: true,
            marker: true,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"href":"https://other.org/","class":"external","new_tab":true,"marker":true}"#
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("↗↗↗↗↗↗↗↗↗↗↗↗", 10), "↗↗↗↗↗↗↗...");
    }
}

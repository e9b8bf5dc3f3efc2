//! annotate command: Rewrite links in HTML documents
//!
//! External links and same-site PDFs get `target="_blank"` and
//! `rel="noopener noreferrer"`; external links also get a trailing marker.
//! Documents are streamed through lol_html, untouched markup is preserved
//! byte-for-byte.

use crate::classify::{classify, LinkClass, PageLocation};
use crate::config::{self, AnnotatorConfig};
use crate::error::AnnotateError;
use crate::files::{expand_inputs, page_url, HtmlInput};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use futures::future::join_all;
use lol_html::html_content::{ContentType, EndTag};
use lol_html::{element, end, rewrite_str, EndTagHandler, HandlerResult, RewriteStrSettings};
use serde::Serialize;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use url::Url;

/// Attribute set on rewritten links when `mark_processed` is enabled
pub const PROCESSED_ATTR: &str = "data-newtab-processed";

#[derive(Args)]
pub struct AnnotateArgs {
    /// HTML files, directories or glob patterns
    #[arg(value_name = "PATH", required_unless_present = "stdin")]
    pub paths: Vec<PathBuf>,

    /// URL the site is served from (page URLs are derived from file paths)
    #[arg(long, env = "NEWTAB_BASE_URL")]
    pub base_url: String,

    /// Site root used to compute file paths (default: the directory argument)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Write results under this directory instead of in place
    #[arg(long, conflicts_with = "dry_run")]
    pub out_dir: Option<PathBuf>,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Read one document from stdin and write it to stdout (base URL is the page URL)
    #[arg(long, conflicts_with_all = ["paths", "root", "out_dir"])]
    pub stdin: bool,

    /// Files processed in parallel (1-64)
    #[arg(short, long, default_value = "8", value_parser = clap::value_parser!(u8).range(1..=64))]
    pub parallel: u8,

    /// Config file (default: ./newtab.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Per-document link counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnotateStats {
    pub links: usize,
    pub skipped: usize,
    pub unresolvable: usize,
    pub internal: usize,
    pub pdf: usize,
    pub external: usize,
    pub already_processed: usize,
}

impl AnnotateStats {
    pub fn record(&mut self, class: LinkClass) {
        match class {
            LinkClass::Skipped => self.skipped += 1,
            LinkClass::Unresolvable => self.unresolvable += 1,
            LinkClass::Internal => self.internal += 1,
            LinkClass::Pdf => self.pdf += 1,
            LinkClass::External => self.external += 1,
        }
    }

    /// Links that received `target`/`rel`
    pub fn rewritten(&self) -> usize {
        self.pdf + self.external
    }

    pub fn add(&mut self, other: &AnnotateStats) {
        self.links += other.links;
        self.skipped += other.skipped;
        self.unresolvable += other.unresolvable;
        self.internal += other.internal;
        self.pdf += other.pdf;
        self.external += other.external;
        self.already_processed += other.already_processed;
    }
}

/// Rewritten document
#[derive(Debug, Clone)]
pub struct Annotated {
    pub html: String,
    pub stats: AnnotateStats,
}

/// Annotate every `a[href]` of `html` as served from `page`
///
/// The marker goes right before `</a>`. Anchors still open at the end of
/// the input get their marker appended at the end of the document.
pub fn annotate_html(
    html: &str,
    page: &PageLocation,
    config: &AnnotatorConfig,
) -> Result<Annotated, AnnotateError> {
    let marker: Rc<str> = Rc::from(config.marker.to_html());
    let unclosed = Rc::new(Cell::new(0usize));
    let mut stats = AnnotateStats::default();

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", |el| {
                let Some(raw) = el.get_attribute("href") else {
                    return Ok(());
                };
                stats.links += 1;

                if config.mark_processed && el.has_attribute(PROCESSED_ATTR) {
                    stats.already_processed += 1;
                    return Ok(());
                }

                // lol_html hands back the source text, classify the DOM value
                let href = html_escape::decode_html_entities(&raw);
                let class = classify(&href, page, &config.rules);
                stats.record(class);
                tracing::trace!(href = %href, %class, "classified link");

                if !class.opens_new_tab() {
                    return Ok(());
                }

                el.set_attribute("target", &config.target)?;
                el.set_attribute("rel", &config.rel)?;
                if config.mark_processed {
                    el.set_attribute(PROCESSED_ATTR, "")?;
                }
                if class.wants_marker() {
                    match el.end_tag_handlers() {
                        Some(handlers) => {
                            unclosed.set(unclosed.get() + 1);
                            let unclosed = Rc::clone(&unclosed);
                            let marker = Rc::clone(&marker);
                            handlers.push(Box::new(move |end: &mut EndTag<'_>| -> HandlerResult {
                                end.before(&marker, ContentType::Html);
                                unclosed.set(unclosed.get() - 1);
                                Ok(())
                            }) as EndTagHandler<'static>);
                        }
                        None => el.append(&marker, ContentType::Html),
                    }
                }
                Ok(())
            })],
            document_content_handlers: vec![end!(|end| {
                for _ in 0..unclosed.get() {
                    end.append(&marker, ContentType::Html);
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )?;

    Ok(Annotated {
        html: output,
        stats,
    })
}

/// Outcome for one file
#[derive(Debug, Serialize)]
pub struct FileResult {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(flatten)]
    pub stats: AnnotateStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full report (compact JSON on stdout)
#[derive(Debug, Serialize)]
pub struct AnnotateReport {
    pub files: usize,
    pub written: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub totals: AnnotateStats,
    pub results: Vec<FileResult>,
    pub timestamp: String,
}

/// Run the annotate command
pub async fn run_annotate(args: AnnotateArgs) -> Result<()> {
    let config = Arc::new(config::load(args.config.as_deref()).await?);

    if args.stdin {
        return annotate_stdin(&args.base_url, &config).await;
    }

    let base = Url::parse(&args.base_url)
        .with_context(|| format!("Invalid --base-url: {}", args.base_url))?;
    let inputs = expand_inputs(&args.paths, args.root.as_deref()).await?;

    if inputs.is_empty() {
        bail!("No HTML files found");
    }

    let file_count = inputs.len();
    tracing::info!(
        "Annotating {} file{} ({} parallel)...",
        file_count,
        if file_count == 1 { "" } else { "s" },
        args.parallel
    );

    let semaphore = Arc::new(Semaphore::new(args.parallel as usize));
    let base = Arc::new(base);
    let out_dir = args.out_dir.map(Arc::new);
    let dry_run = args.dry_run;

    let tasks: Vec<_> = inputs
        .into_iter()
        .map(|input| {
            let semaphore = Arc::clone(&semaphore);
            let base = Arc::clone(&base);
            let config = Arc::clone(&config);
            let out_dir = out_dir.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let out_dir = out_dir.as_deref().map(PathBuf::as_path);
                process_file(&input, &base, &config, out_dir, dry_run).await
            })
        })
        .collect();

    let results: Vec<FileResult> = join_all(tasks)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .context("Annotation task panicked")?;

    let mut totals = AnnotateStats::default();
    for result in &results {
        totals.add(&result.stats);
    }
    let written = results.iter().filter(|r| r.written.is_some()).count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();

    let report = AnnotateReport {
        files: file_count,
        written,
        failed,
        dry_run,
        totals,
        results,
        timestamp: Utc::now().to_rfc3339(),
    };
    println!("{}", serde_json::to_string(&report)?);

    tracing::info!(
        "Done: {} links rewritten ({} external, {} pdf) in {}/{} files",
        totals.rewritten(),
        totals.external,
        totals.pdf,
        written,
        file_count
    );

    if failed > 0 {
        bail!("{} of {} files failed", failed, file_count);
    }
    Ok(())
}

async fn annotate_stdin(base_url: &str, config: &AnnotatorConfig) -> Result<()> {
    let page = PageLocation::parse(base_url)?;

    let mut html = String::new();
    tokio::io::stdin()
        .read_to_string(&mut html)
        .await
        .context("Failed to read stdin")?;

    let annotated = annotate_html(&html, &page, config)?;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(annotated.html.as_bytes()).await?;
    stdout.flush().await?;

    tracing::info!(
        "stdin: {} of {} links rewritten",
        annotated.stats.rewritten(),
        annotated.stats.links
    );
    Ok(())
}

async fn process_file(
    input: &HtmlInput,
    base: &Url,
    config: &AnnotatorConfig,
    out_dir: Option<&Path>,
    dry_run: bool,
) -> FileResult {
    let file = input.path.display().to_string();

    let page = match page_url(base, &input.rel) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("{}: {}", file, e);
            return FileResult {
                file,
                page_url: None,
                stats: AnnotateStats::default(),
                written: None,
                error: Some(e.to_string()),
            };
        }
    };

    match annotate_file(input, &page, config, out_dir, dry_run).await {
        Ok((stats, written)) => {
            tracing::debug!("{} -> {} rewritten", file, stats.rewritten());
            FileResult {
                file,
                page_url: Some(page.to_string()),
                stats,
                written: written.map(|p| p.display().to_string()),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!("{}: {:#}", file, e);
            FileResult {
                file,
                page_url: Some(page.to_string()),
                stats: AnnotateStats::default(),
                written: None,
                error: Some(format!("{:#}", e)),
            }
        }
    }
}

/// Rewrite one file; returns the path written, if any
///
/// In place, unchanged files are left alone. With an output directory every
/// file is written so the mirror is complete.
async fn annotate_file(
    input: &HtmlInput,
    page: &PageLocation,
    config: &AnnotatorConfig,
    out_dir: Option<&Path>,
    dry_run: bool,
) -> Result<(AnnotateStats, Option<PathBuf>)> {
    let html = tokio::fs::read_to_string(&input.path)
        .await
        .with_context(|| format!("Failed to read file: {}", input.path.display()))?;

    let annotated = annotate_html(&html, page, config)?;

    if dry_run {
        return Ok((annotated.stats, None));
    }

    let target = match out_dir {
        Some(dir) => dir.join(&input.rel),
        None if annotated.stats.rewritten() == 0 => return Ok((annotated.stats, None)),
        None => input.path.clone(),
    };

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, annotated.html)
        .await
        .with_context(|| format!("Failed to write file: {}", target.display()))?;

    Ok((annotated.stats, Some(target)))
}

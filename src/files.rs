//! Site inputs: expand paths into HTML files and map them to page URLs

use crate::classify::PageLocation;
use crate::error::AnnotateError;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use url::Url;

const HTML_EXTENSIONS: &[&str] = &["html", "htm"];
const GLOB_WILDCARDS: [char; 3] = ['*', '?', '['];

/// An HTML file and its path relative to the site root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlInput {
    pub path: PathBuf,
    pub rel: PathBuf,
}

/// Expand files, directories (recursively) and glob patterns into HTML inputs
///
/// Relative paths are taken from `root` when given, else from the directory
/// argument (or the glob's literal prefix) the file was found under, else the
/// bare file name.
pub async fn expand_inputs(patterns: &[PathBuf], root: Option<&Path>) -> Result<Vec<HtmlInput>> {
    let mut inputs = Vec::new();

    for pattern in patterns {
        let pattern_str = pattern.to_string_lossy();

        if pattern.is_file() {
            let rel = match root {
                Some(root) => relative_to(pattern, root),
                None => pattern.file_name().map(PathBuf::from).unwrap_or_default(),
            };
            inputs.push(HtmlInput {
                path: pattern.clone(),
                rel,
            });
        } else if pattern_str.contains(GLOB_WILDCARDS) {
            let base = glob_base(pattern);
            for entry in glob::glob(&pattern_str)
                .with_context(|| format!("Invalid glob pattern: {}", pattern_str))?
            {
                let path = entry?;
                if path.is_file() {
                    let rel = relative_to(&path, root.unwrap_or(&base));
                    inputs.push(HtmlInput { path, rel });
                }
            }
        } else if pattern.is_dir() {
            for path in walk_html(pattern).await? {
                let rel = relative_to(&path, root.unwrap_or(pattern));
                inputs.push(HtmlInput { path, rel });
            }
        } else {
            tracing::warn!("{}: no such file or directory", pattern.display());
        }
    }

    inputs.sort_by(|a, b| a.path.cmp(&b.path));
    inputs.dedup_by(|a, b| a.path == b.path);
    Ok(inputs)
}

/// Page URL of a file at `rel` under a site served from `base`
///
/// `base` is treated as a directory whether or not it ends with `/`.
pub fn page_url(base: &Url, rel: &Path) -> Result<PageLocation, AnnotateError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| AnnotateError::CannotBeABase(base.to_string()))?;
        segments.pop_if_empty();
        for component in rel.components() {
            match component {
                Component::Normal(name) => {
                    segments.push(&name.to_string_lossy());
                }
                Component::ParentDir => {
                    segments.pop();
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
    }
    PageLocation::from_url(url)
}

pub fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| HTML_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn walk_html(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .with_context(|| format!("Failed to read directory: {}", current.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            // Symlinked directories are not followed
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if is_html(&path) && path.is_file() {
                found.push(path);
            }
        }
    }

    Ok(found)
}

/// Leading components of a glob pattern that contain no wildcard
fn glob_base(pattern: &Path) -> PathBuf {
    pattern
        .components()
        .take_while(|c| !c.as_os_str().to_string_lossy().contains(GLOB_WILDCARDS))
        .collect()
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path.file_name().map(PathBuf::from).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_page_url() {
        let page = page_url(&base("https://example.com/"), Path::new("docs/page.html")).unwrap();
        assert_eq!(page.url().as_str(), "https://example.com/docs/page.html");
    }

    #[test]
    fn test_page_url_base_without_slash() {
        let page = page_url(&base("https://example.com/site?x=1#top"), Path::new("a.html")).unwrap();
        assert_eq!(page.url().as_str(), "https://example.com/site/a.html");
    }

    #[test]
    fn test_page_url_encodes_segments() {
        let page = page_url(&base("https://example.com/"), Path::new("my notes/#1.html")).unwrap();
        assert_eq!(page.url().as_str(), "https://example.com/my%20notes/%231.html");
    }

    #[test]
    fn test_page_url_cannot_be_a_base() {
        assert!(matches!(
            page_url(&base("mailto:a@b.com"), Path::new("a.html")),
            Err(AnnotateError::CannotBeABase(_))
        ));
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Path::new("a/index.html")));
        assert!(is_html(Path::new("INDEX.HTM")));
        assert!(!is_html(Path::new("style.css")));
        assert!(!is_html(Path::new("README")));
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base(Path::new("site/docs/**/*.html")), PathBuf::from("site/docs"));
        assert_eq!(glob_base(Path::new("*.html")), PathBuf::new());
    }

    #[tokio::test]
    async fn test_expand_directory_recursively() {
        let dir = tempdir().unwrap();
        let site = dir.path().join("site");
        fs::create_dir_all(site.join("docs/deep")).unwrap();
        fs::write(site.join("index.html"), "").unwrap();
        fs::write(site.join("docs/deep/page.htm"), "").unwrap();
        fs::write(site.join("docs/style.css"), "").unwrap();

        let inputs = expand_inputs(&[site.clone()], None).await.unwrap();
        let rels: Vec<_> = inputs.iter().map(|i| i.rel.clone()).collect();
        assert_eq!(inputs.len(), 2);
        assert!(rels.contains(&PathBuf::from("index.html")));
        assert!(rels.contains(&PathBuf::from("docs/deep/page.htm")));
    }

    #[tokio::test]
    async fn test_expand_file_with_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        let file = dir.path().join("blog/post.html");
        fs::write(&file, "").unwrap();

        let inputs = expand_inputs(&[file.clone(), file.clone()], Some(dir.path()))
            .await
            .unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].rel, PathBuf::from("blog/post.html"));

        let inputs = expand_inputs(&[file], None).await.unwrap();
        assert_eq!(inputs[0].rel, PathBuf::from("post.html"));
    }

    #[tokio::test]
    async fn test_expand_single_char_and_class_globs() {
        let dir = tempdir().unwrap();
        let site = dir.path().join("site");
        fs::create_dir_all(&site).unwrap();
        for name in ["page1.html", "page2.html", "page10.html"] {
            fs::write(site.join(name), "").unwrap();
        }

        let question = site.join("page?.html");
        let inputs = expand_inputs(&[question], None).await.unwrap();
        let rels: Vec<_> = inputs.iter().map(|i| i.rel.clone()).collect();
        assert_eq!(
            rels,
            vec![PathBuf::from("page1.html"), PathBuf::from("page2.html")]
        );

        // An existing file is taken literally even if its name looks like a glob
        fs::write(site.join("page[2].html"), "").unwrap();
        let literal = expand_inputs(&[site.join("page[2].html")], None).await.unwrap();
        assert_eq!(literal[0].rel, PathBuf::from("page[2].html"));

        let class = site.join("page[1].html");
        let inputs = expand_inputs(&[class], None).await.unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].rel, PathBuf::from("page1.html"));
    }

    #[tokio::test]
    async fn test_expand_missing_path_is_empty() {
        let inputs = expand_inputs(&[PathBuf::from("/nonexistent/site")], None)
            .await
            .unwrap();
        assert!(inputs.is_empty());
    }
}

//! Multi-file build: discover sources, resolve descriptors, write pages.
//!
//! Files are independent. A file with a failed descriptor is reported and its
//! previous page stays in place; the rest of the build continues. The output
//! directory is the only shared state and every write to it is atomic.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vhdldoc_core::{resolve_source_file, LocatedError, SchemaOptions};

use crate::error::{RenderError, Result};
use crate::format::PageFormat;
use crate::output::{write_atomic, WriteOutcome};
use crate::page::{renderer, IndexEntry, SourcePage};

/// Everything a build needs to know.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directories searched recursively for sources.
    pub source_dirs: Vec<PathBuf>,
    /// Source file extensions, without the dot.
    pub extensions: Vec<String>,
    pub out_dir: PathBuf,
    pub format: PageFormat,
    pub schema: SchemaOptions,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dirs: vec![PathBuf::from("src")],
            extensions: vec!["vhd".to_string(), "vhdl".to_string()],
            out_dir: PathBuf::from("doc"),
            format: PageFormat::Markdown,
            schema: SchemaOptions::default(),
        }
    }
}

/// Shared flag that stops a build between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect before the next file.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// The source directory it was found under.
    pub root: PathBuf,
    pub path: PathBuf,
}

impl SourceFile {
    /// Path relative to its source directory.
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(&self.path)
    }

    /// Relative path with `/` separators, for headings and links.
    pub fn display_name(&self) -> String {
        slash_path(self.relative())
    }
}

/// What happened to one source file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The page was (re)written.
    Written { page: PathBuf, descriptors: usize },
    /// The page already had this content.
    Unchanged { page: PathBuf, descriptors: usize },
    /// The file holds no directives; no page is produced.
    NoDescriptors,
    /// The file no longer holds directives; its old page was deleted.
    Removed { page: PathBuf },
    /// At least one descriptor failed; the previous page was kept.
    Failed { errors: Vec<LocatedError> },
}

/// Per-file result of a build.
#[derive(Debug)]
pub struct FileReport {
    pub source: SourceFile,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FileOutcome::Failed { .. })
    }
}

/// Outcome of a whole build.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub files: Vec<FileReport>,
    /// The index page, once written.
    pub index: Option<PathBuf>,
}

impl BuildSummary {
    /// Whether any descriptor failed.
    pub fn has_failures(&self) -> bool {
        self.files.iter().any(FileReport::is_failure)
    }

    /// Number of failed source files.
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.is_failure()).count()
    }

    /// Number of pages written or already current.
    pub fn pages(&self) -> usize {
        self.files
            .iter()
            .filter(|f| {
                matches!(
                    f.outcome,
                    FileOutcome::Written { .. } | FileOutcome::Unchanged { .. }
                )
            })
            .count()
    }
}

/// Find source files under every source directory, sorted by path.
pub fn discover_sources(config: &BuildConfig) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for root in &config.source_dirs {
        let mut files = Vec::new();
        collect_files(root, &config.extensions, &mut files)?;
        files.sort();
        sources.extend(files.into_iter().map(|path| SourceFile {
            root: root.clone(),
            path,
        }));
    }
    Ok(sources)
}

fn collect_files(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| RenderError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| RenderError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| RenderError::io(&path, e))?;
        if file_type.is_dir() {
            collect_files(&path, extensions, out)?;
        } else if has_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

/// Output page path for a source file: `<out>/<relative source>.<ext>`.
pub fn page_path(config: &BuildConfig, source: &SourceFile) -> PathBuf {
    let mut name = source.relative().as_os_str().to_owned();
    name.push(".");
    name.push(config.format.extension());
    config.out_dir.join(name)
}

fn index_path(config: &BuildConfig) -> PathBuf {
    config
        .out_dir
        .join(format!("index.{}", config.format.extension()))
}

/// Build every source file, then refresh the index.
///
/// Cancellation is checked before each file; a cancelled build returns
/// [`RenderError::Cancelled`] and leaves completed pages in place.
pub fn build(config: &BuildConfig, cancel: &CancelToken) -> Result<BuildSummary> {
    let sources = discover_sources(config)?;
    tracing::info!(files = sources.len(), format = %config.format, "building");

    let mut summary = BuildSummary::default();
    for source in sources {
        if cancel.is_cancelled() {
            tracing::warn!(completed = summary.files.len(), "build cancelled");
            return Err(RenderError::Cancelled);
        }
        summary.files.push(process_file(config, source)?);
    }

    summary.index = Some(write_index(config)?);
    Ok(summary)
}

/// Re-resolve and re-render one changed source file, then refresh the index.
pub fn rebuild_file(config: &BuildConfig, path: &Path) -> Result<FileReport> {
    let root = config
        .source_dirs
        .iter()
        .filter(|dir| path.starts_with(dir))
        .max_by_key(|dir| dir.components().count())
        .cloned()
        .unwrap_or_else(|| path.parent().map(Path::to_path_buf).unwrap_or_default());
    let source = SourceFile {
        root,
        path: path.to_path_buf(),
    };
    let report = process_file(config, source)?;
    write_index(config)?;
    Ok(report)
}

fn process_file(config: &BuildConfig, source: SourceFile) -> Result<FileReport> {
    let report = match resolve_source_file(&source.path, &config.schema) {
        Err(error) => vec![Err(error)],
        Ok(report) => report.descriptors,
    };

    let (models, errors): (Vec<_>, Vec<_>) = report.into_iter().partition(|r| r.is_ok());
    let errors: Vec<LocatedError> = errors.into_iter().filter_map(|r| r.err()).collect();
    let models: Vec<_> = models.into_iter().filter_map(|r| r.ok()).collect();

    let outcome = if !errors.is_empty() {
        for error in &errors {
            tracing::warn!(%error, "descriptor failed; keeping previous page");
        }
        FileOutcome::Failed { errors }
    } else if models.is_empty() {
        let page = page_path(config, &source);
        if remove_stale_page(&page)? {
            FileOutcome::Removed { page }
        } else {
            FileOutcome::NoDescriptors
        }
    } else {
        let name = source.display_name();
        let page = page_path(config, &source);
        let text = renderer(config.format).render(&SourcePage {
            source: &name,
            models: &models,
        })?;
        match write_atomic(&page, text.as_bytes())? {
            WriteOutcome::Written => FileOutcome::Written {
                page,
                descriptors: models.len(),
            },
            WriteOutcome::Unchanged => FileOutcome::Unchanged {
                page,
                descriptors: models.len(),
            },
        }
    };

    Ok(FileReport { source, outcome })
}

/// Delete the page of a source that lost all its directives; returns whether one existed.
fn remove_stale_page(page: &Path) -> Result<bool> {
    match std::fs::remove_file(page) {
        Ok(()) => {
            tracing::info!(page = %page.display(), "removed stale page");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(RenderError::io(page, e)),
    }
}

/// Rewrite the index from the pages currently on disk.
fn write_index(config: &BuildConfig) -> Result<PathBuf> {
    let entries: Vec<IndexEntry> = discover_sources(config)?
        .iter()
        .filter_map(|source| {
            let page = page_path(config, source);
            page.is_file().then(|| IndexEntry {
                source: source.display_name(),
                page: slash_path(page.strip_prefix(&config.out_dir).unwrap_or(&page)),
            })
        })
        .collect();

    let path = index_path(config);
    let text = renderer(config.format).render_index(&entries)?;
    write_atomic(&path, text.as_bytes())?;
    Ok(path)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

//! `vhdldoc build`: render documentation pages for every source file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use vhdldoc_render::{BuildConfig, CancelToken, FileOutcome, PageFormat};

use crate::manifest::{default_build_config, VhdldocManifest};

/// Command-line settings that take precedence over the manifest.
#[derive(Debug, Default)]
pub struct BuildOverrides<'a> {
    pub source: Option<&'a Path>,
    pub out: Option<&'a Path>,
    pub format: Option<&'a str>,
    pub strict: bool,
}

/// Resolve the effective build configuration.
pub fn resolve_config(
    project_dir: &Path,
    manifest: Option<&VhdldocManifest>,
    overrides: &BuildOverrides<'_>,
) -> Result<BuildConfig> {
    let mut config = match manifest {
        Some(m) => m.build_config(project_dir)?,
        None => default_build_config(project_dir),
    };
    if let Some(source) = overrides.source {
        config.source_dirs = vec![project_dir.join(source)];
    }
    if let Some(out) = overrides.out {
        config.out_dir = project_dir.join(out);
    }
    if let Some(format) = overrides.format {
        config.format = PageFormat::parse(format)?;
    }
    if overrides.strict {
        config.schema.strict = true;
    }
    Ok(config)
}

/// Build all pages; fails after processing every file if any descriptor failed.
pub fn run(
    project_dir: &Path,
    manifest: Option<&VhdldocManifest>,
    overrides: &BuildOverrides<'_>,
) -> Result<()> {
    let config = resolve_config(project_dir, manifest, overrides)?;
    let summary = vhdldoc_render::build(&config, &CancelToken::new())
        .with_context(|| format!("building documentation into {}", config.out_dir.display()))?;

    for report in &summary.files {
        let name = report.source.display_name();
        match &report.outcome {
            FileOutcome::Written { page, descriptors } => println!(
                "  wrote      {name} -> {} ({})",
                relative(project_dir, page),
                plural(*descriptors)
            ),
            FileOutcome::Unchanged { page, descriptors } => println!(
                "  unchanged  {name} -> {} ({})",
                relative(project_dir, page),
                plural(*descriptors)
            ),
            FileOutcome::Removed { page } => {
                println!("  removed    {name} -> {}", relative(project_dir, page))
            }
            FileOutcome::NoDescriptors => {}
            FileOutcome::Failed { errors } => {
                println!("  failed     {name}");
                for error in errors {
                    eprintln!("    {error}");
                }
            }
        }
    }

    println!(
        "\nBuilt {} page(s) from {} source file(s) into {}",
        summary.pages(),
        summary.files.len(),
        relative(project_dir, &config.out_dir),
    );

    if summary.has_failures() {
        bail!("{} source file(s) had descriptor errors", summary.failed());
    }
    Ok(())
}

fn plural(descriptors: usize) -> String {
    if descriptors == 1 {
        "1 memory map".to_string()
    } else {
        format!("{descriptors} memory maps")
    }
}

fn relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

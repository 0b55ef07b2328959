//! `vhdldoc check`: resolve descriptors and print their tables without writing pages.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use vhdldoc_core::{resolve_source_file, LayoutModel, SchemaOptions};
use vhdldoc_render::{discover_sources, renderer, BuildConfig, PageFormat, SourcePage};

/// Check the given files, or every discovered source when `files` is empty.
pub fn run(config: &BuildConfig, files: &[PathBuf]) -> Result<()> {
    let targets: Vec<PathBuf> = if files.is_empty() {
        discover_sources(config)?
            .into_iter()
            .map(|source| source.path)
            .collect()
    } else {
        files.to_vec()
    };

    let mut failures = 0;
    let mut checked = 0;
    for path in &targets {
        let (text, failed) = check_file(path, &config.schema)?;
        if !text.is_empty() {
            print!("{text}");
        }
        checked += 1;
        failures += failed;
    }

    println!("\nChecked {checked} file(s): {failures} descriptor error(s)");
    if failures > 0 {
        bail!("{failures} descriptor(s) failed to resolve");
    }
    Ok(())
}

/// Resolve one file; returns the rendered tables and the number of failures.
fn check_file(path: &Path, options: &SchemaOptions) -> Result<(String, usize)> {
    let report = match resolve_source_file(path, options) {
        Ok(report) => report,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok((String::new(), 1));
        }
    };

    let mut failed = 0;
    for error in report.failures() {
        eprintln!("error: {error}");
        failed += 1;
    }

    let models: Vec<LayoutModel> = report.models().cloned().collect();
    if models.is_empty() {
        return Ok((String::new(), failed));
    }
    let name = path.display().to_string();
    let text = renderer(PageFormat::Text).render(&SourcePage {
        source: &name,
        models: &models,
    })?;
    Ok((text, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GOOD: &str = "\
-- \\memorymap json
-- {\"name\": \"Regs\", \"type\": \"set\", \"protocol\": {\"addressMax\": 255, \"dataMin\": 1},
--  \"contains\": {\"name\": \"Status\", \"type\": {\"unsigned\": 8}}}
-- \\end
";

    #[test]
    fn check_renders_text_tables() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("good.vhd");
        fs::write(&file, GOOD).unwrap();

        let (text, failed) = check_file(&file, &SchemaOptions::default()).unwrap();
        assert_eq!(failed, 0);
        assert!(text.contains("│ Status"));
    }

    #[test]
    fn check_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.vhd");
        fs::write(&file, "-- \\memorymap path gone.json\n").unwrap();

        let config = BuildConfig {
            source_dirs: vec![dir.path().to_path_buf()],
            out_dir: dir.path().join("doc"),
            ..BuildConfig::default()
        };
        assert!(run(&config, &[file]).is_err());
    }

    #[test]
    fn check_does_not_write_pages() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.vhd"), GOOD).unwrap();
        let config = BuildConfig {
            source_dirs: vec![dir.path().to_path_buf()],
            out_dir: dir.path().join("doc"),
            ..BuildConfig::default()
        };
        run(&config, &[]).unwrap();
        assert!(!dir.path().join("doc").exists());
    }
}

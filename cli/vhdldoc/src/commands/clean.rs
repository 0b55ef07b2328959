//! `vhdldoc clean`: remove generated pages.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::manifest::VhdldocManifest;

/// Remove the output directory of the project.
pub fn run(project_dir: &Path, manifest: Option<&VhdldocManifest>) -> Result<()> {
    let out_dir = match manifest {
        Some(m) => project_dir.join(&m.output.dir),
        None => project_dir.join("doc"),
    };
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)
            .with_context(|| format!("removing {}", out_dir.display()))?;
        println!("Removed {}", out_dir.display());
    } else {
        println!("Already clean: {} does not exist", out_dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_removes_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("doc");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("index.md"), b"# Memory maps\n").unwrap();

        run(dir.path(), None).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn clean_handles_already_clean() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), None).unwrap();
    }

    #[test]
    fn clean_uses_manifest_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest: VhdldocManifest =
            toml::from_str("[project]\nname = \"m\"\n[output]\ndir = \"site\"\n").unwrap();
        let site = dir.path().join("site");
        let doc = dir.path().join("doc");
        fs::create_dir(&site).unwrap();
        fs::create_dir(&doc).unwrap();

        run(dir.path(), Some(&manifest)).unwrap();
        assert!(!site.exists());
        assert!(doc.exists());
    }
}

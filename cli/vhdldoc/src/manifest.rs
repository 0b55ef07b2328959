//! `vhdldoc.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vhdldoc_core::SchemaOptions;
use vhdldoc_render::{BuildConfig, PageFormat};

/// Manifest file name, searched for from the current directory upward.
pub const MANIFEST_FILE: &str = "vhdldoc.toml";

/// The top-level manifest structure for a vhdldoc project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VhdldocManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required).
    pub name: String,
    /// Project version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Where VHDL sources live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directories searched recursively, relative to the project root.
    #[serde(default = "default_source_dirs")]
    pub dirs: Vec<PathBuf>,
    /// File extensions treated as VHDL.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dirs: default_source_dirs(),
            extensions: default_extensions(),
        }
    }
}

fn default_source_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

fn default_extensions() -> Vec<String> {
    vec!["vhd".to_string(), "vhdl".to_string()]
}

/// Where and how pages are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, relative to the project root.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Page format (markdown, text, json).
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: default_format(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("doc")
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Descriptor validation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Reject descriptor keys the schema does not define.
    #[serde(default)]
    pub strict: bool,
}

impl VhdldocManifest {
    /// Search upward from `start_dir` for a `vhdldoc.toml` file, parse and return
    /// it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: VhdldocManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing vhdldoc.toml")
    }

    /// Build settings for a project rooted at `project_dir`.
    pub fn build_config(&self, project_dir: &Path) -> Result<BuildConfig> {
        Ok(BuildConfig {
            source_dirs: self.source.dirs.iter().map(|d| project_dir.join(d)).collect(),
            extensions: self.source.extensions.clone(),
            out_dir: project_dir.join(&self.output.dir),
            format: PageFormat::parse(&self.output.format)
                .context("invalid [output] format in vhdldoc.toml")?,
            schema: SchemaOptions {
                strict: self.schema.strict,
            },
        })
    }

    /// Generate the default template for `vhdldoc init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
version = "0.1.0"

[source]
dirs = ["src"]
extensions = ["vhd", "vhdl"]

[output]
dir = "doc"
format = "markdown"

[schema]
strict = false
"#
        )
    }
}

/// Build settings when no manifest exists: defaults relative to `dir`.
pub fn default_build_config(dir: &Path) -> BuildConfig {
    let defaults = BuildConfig::default();
    BuildConfig {
        source_dirs: defaults.source_dirs.iter().map(|d| dir.join(d)).collect(),
        out_dir: dir.join(&defaults.out_dir),
        ..defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let toml_str = r#"
[project]
name = "uart-ip"
version = "1.2.0"
description = "UART with register file"

[source]
dirs = ["rtl", "tb"]
extensions = ["vhd"]

[output]
dir = "site"
format = "json"

[schema]
strict = true
"#;
        let manifest = VhdldocManifest::from_str(toml_str).unwrap();
        assert_eq!(manifest.project.name, "uart-ip");
        assert_eq!(manifest.project.version, "1.2.0");
        assert_eq!(manifest.source.dirs.len(), 2);

        let config = manifest.build_config(Path::new("/p")).unwrap();
        assert_eq!(config.source_dirs[0], Path::new("/p/rtl"));
        assert_eq!(config.out_dir, Path::new("/p/site"));
        assert_eq!(config.format, PageFormat::Json);
        assert!(config.schema.strict);
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = VhdldocManifest::from_str("[project]\nname = \"m\"\n").unwrap();
        assert_eq!(manifest.project.version, "0.1.0");
        assert_eq!(manifest.source.dirs, vec![PathBuf::from("src")]);
        assert_eq!(manifest.source.extensions, vec!["vhd", "vhdl"]);
        assert_eq!(manifest.output.dir, PathBuf::from("doc"));
        assert!(!manifest.schema.strict);
    }

    #[test]
    fn template_round_trips() {
        let manifest = VhdldocManifest::from_str(&VhdldocManifest::template("demo")).unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(manifest.output.format, "markdown");
    }

    #[test]
    fn invalid_format_is_reported() {
        let manifest =
            VhdldocManifest::from_str("[project]\nname = \"m\"\n[output]\nformat = \"html\"\n")
                .unwrap();
        assert!(manifest.build_config(Path::new(".")).is_err());
    }

    #[test]
    fn find_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), VhdldocManifest::template("up")).unwrap();
        let nested = dir.path().join("src/rtl");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, root) = VhdldocManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "up");
        assert_eq!(root, dir.path());
    }
}

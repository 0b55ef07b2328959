//! `vhdldoc init`: project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{VhdldocManifest, MANIFEST_FILE};

const EXAMPLE_VHDL: &str = r#"library ieee;
use ieee.std_logic_1164.all;

--! Register file of the example block.
--!
--! \memorymap toml
--! name = "Example Registers"
--! type = "set"
--! access = "rw"
--!
--! [protocol]
--! name = "AXI4-Lite"
--! addressMax = "0xFFFF"
--! dataMin = 4
--!
--! [[contains]]
--! name = "Identification"
--! address = "0x0000"
--! access = "r"
--! type = { string = 16 }
--! value = "EXAMPLE-V1"
--!
--! [[contains]]
--! name = "Control"
--! address = "0x0004"
--! type = { unsigned = 32 }
--! value = 0
--! \endmemorymap
--!
--! \memorymap path example.toml
entity example is
  port (
    clk : in std_logic;
    rst : in std_logic
  );
end entity example;

architecture rtl of example is
begin
end architecture rtl;
"#;

const EXAMPLE_TOML: &str = r#"name = "Example Memory Map"
type = "set"

[protocol]
addressMax = "0xFFFF"
dataMin = 1

[[contains]]
name = "Description String"
address = "0x0000"
value = "My Great Memory Map"
access = "r"
type = { string = 20 }
"#;

/// Create a new vhdldoc project at the given path.
///
/// `name` is the project name. The directory `name` is created relative to cwd.
pub fn run(name: &str) -> Result<()> {
    let project_dir = Path::new(name);
    create_project(project_dir, name)
}

pub(crate) fn create_project(project_dir: &Path, name: &str) -> Result<()> {
    if project_dir.exists() {
        bail!("directory '{}' already exists", project_dir.display());
    }

    fs::create_dir_all(project_dir.join("src")).context("creating src/ directory")?;
    fs::create_dir_all(project_dir.join("doc")).context("creating doc/ directory")?;

    fs::write(project_dir.join(MANIFEST_FILE), VhdldocManifest::template(name))
        .context("writing vhdldoc.toml")?;
    fs::write(project_dir.join("src/example.vhd"), EXAMPLE_VHDL)
        .context("writing src/example.vhd")?;
    fs::write(project_dir.join("src/example.toml"), EXAMPLE_TOML)
        .context("writing src/example.toml")?;
    fs::write(project_dir.join(".gitignore"), "doc/\n").context("writing .gitignore")?;

    println!("Created project '{name}'");
    println!("  {name}/vhdldoc.toml");
    println!("  {name}/src/example.vhd");
    println!("  {name}/src/example.toml");
    println!("  {name}/doc/");
    println!("  {name}/.gitignore");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vhdldoc_core::{resolve_source_file, SchemaOptions};

    #[test]
    fn init_creates_project_structure() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("test-init-project");

        create_project(&project_path, "test-init-project").unwrap();

        assert!(project_path.join("vhdldoc.toml").is_file());
        assert!(project_path.join("src/example.vhd").is_file());
        assert!(project_path.join("src/example.toml").is_file());
        assert!(project_path.join("doc").is_dir());
        assert!(project_path.join(".gitignore").is_file());
    }

    #[test]
    fn init_generates_valid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("valid-manifest");

        create_project(&project_path, "valid-manifest").unwrap();

        let content = fs::read_to_string(project_path.join("vhdldoc.toml")).unwrap();
        let manifest = VhdldocManifest::from_str(&content).unwrap();
        assert_eq!(manifest.project.name, "valid-manifest");
    }

    #[test]
    fn init_example_descriptors_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("example");

        create_project(&project_path, "example").unwrap();

        let report = resolve_source_file(
            &project_path.join("src/example.vhd"),
            &SchemaOptions::strict(),
        )
        .unwrap();
        assert_eq!(report.descriptors.len(), 2);
        assert!(report.is_ok());
    }

    #[test]
    fn init_refuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("existing");
        fs::create_dir(&project_path).unwrap();

        let result = create_project(&project_path, "existing");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
    }
}

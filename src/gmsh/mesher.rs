use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::info;

use crate::error::{MeshError, Result};

use super::script::{GeoScript, PhysicalMeta};

/// External tools and the work directory used to turn a script into a mesh.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MesherConfig {
    pub gmsh: String,
    pub converter: String,
    pub clscale: f64,
    pub meshdir: PathBuf,
    /// Suffix appended to every file name, e.g. a process ID.
    pub pid: Option<String>,
}

impl Default for MesherConfig {
    fn default() -> Self {
        Self {
            gmsh: "gmsh".to_owned(),
            converter: "dolfin-convert".to_owned(),
            clscale: 1.0,
            meshdir: PathBuf::from("/tmp/nanopores"),
            pid: None,
        }
    }
}

impl MesherConfig {
    /// Suffixes all file names with the current process ID.
    #[must_use]
    pub fn with_pid(mut self) -> Self {
        self.pid = Some(std::process::id().to_string());
        self
    }

    #[must_use]
    pub fn suffix(&self) -> &str {
        self.pid.as_deref().unwrap_or("")
    }

    /// Paths of all files produced in the work directory.
    #[must_use]
    pub fn files(&self) -> MeshFiles {
        let pid = self.suffix();
        let dir = &self.meshdir;
        MeshFiles {
            geo: dir.join(format!("input{pid}.geo")),
            msh: dir.join(format!("out{pid}.msh")),
            xml: dir.join(format!("mesh{pid}.xml")),
            physical_region: dir.join(format!("mesh{pid}_physical_region.xml")),
            facet_region: dir.join(format!("mesh{pid}_facet_region.xml")),
            meta_file: dir.join(format!("meta{pid}.txt")),
            meta: None,
        }
    }
}

/// Files of a generated mesh. `meta` is present when the script declared
/// physical groups.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFiles {
    pub geo: PathBuf,
    pub msh: PathBuf,
    pub xml: PathBuf,
    pub physical_region: PathBuf,
    pub facet_region: PathBuf,
    pub meta_file: PathBuf,
    pub meta: Option<PhysicalMeta>,
}

/// A generated geometry: mesh files plus the names attached to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub files: MeshFiles,
    pub params: BTreeMap<String, f64>,
    pub synonymes: BTreeMap<String, BTreeSet<String>>,
}

impl Geometry {
    /// Physical tags of the subdomain `name`, resolving synonymes.
    #[must_use]
    pub fn physical_domain(&self, name: &str) -> Vec<usize> {
        self.lookup(name, |meta| &meta.physical_domain)
    }

    /// Physical tags of the boundary `name`, resolving synonymes.
    #[must_use]
    pub fn physical_boundary(&self, name: &str) -> Vec<usize> {
        self.lookup(name, |meta| &meta.physical_boundary)
    }

    fn lookup(
        &self,
        name: &str,
        table: impl Fn(&PhysicalMeta) -> &BTreeMap<String, Vec<usize>>,
    ) -> Vec<usize> {
        let Some(meta) = &self.files.meta else {
            return Vec::new();
        };
        let table = table(meta);
        let mut tags: BTreeSet<usize> = table.get(name).into_iter().flatten().copied().collect();
        for alias in self.synonymes.get(name).into_iter().flatten() {
            tags.extend(table.get(alias).into_iter().flatten().copied());
        }
        tags.into_iter().collect()
    }
}

fn run(program: &str, args: &[&OsStr]) -> Result<()> {
    info!(program, "running mesher tool");
    let status = Command::new(program).args(args).status().map_err(MeshError::Io)?;
    if !status.success() {
        return Err(MeshError::ToolFailed {
            program: program.to_owned(),
            status: status.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Writes `script` to the work directory, runs gmsh and the converter, and
/// persists the physical metadata next to the mesh.
///
/// # Errors
///
/// Returns `MeshError::Io` if a file cannot be written or a tool cannot be
/// started, and `MeshError::ToolFailed` on a non-zero exit status.
pub fn to_mesh(mut script: GeoScript, config: &MesherConfig) -> Result<MeshFiles> {
    script.raw(&["General.ExpertMode = 1;"]);
    let mut files = config.files();
    fs::create_dir_all(&config.meshdir).map_err(MeshError::Io)?;
    fs::write(&files.geo, script.code()).map_err(MeshError::Io)?;
    info!(path = %files.geo.display(), "wrote geometry script");

    let clscale = format!("{:.6}", config.clscale);
    run(
        &config.gmsh,
        &[
            OsStr::new("-3"),
            OsStr::new("-v"),
            OsStr::new("1"),
            OsStr::new("-clscale"),
            OsStr::new(&clscale),
            files.geo.as_os_str(),
            OsStr::new("-o"),
            files.msh.as_os_str(),
        ],
    )?;
    run(&config.converter, &[files.msh.as_os_str(), files.xml.as_os_str()])?;

    let meta = script.meta();
    if !meta.is_empty() {
        write_meta(&files.meta_file, meta)?;
        files.meta = Some(meta.clone());
    }
    Ok(files)
}

fn write_meta(path: &Path, meta: &PhysicalMeta) -> Result<()> {
    let text = serde_json::to_string(meta).map_err(MeshError::Metadata)?;
    fs::write(path, text).map_err(MeshError::Io)?;
    info!(path = %path.display(), "wrote physical metadata");
    Ok(())
}

/// Reloads a previously generated mesh from the work directory.
///
/// # Errors
///
/// Returns an error if the metadata sidecar is missing or malformed.
pub fn geo_from_meshdir(config: &MesherConfig) -> Result<MeshFiles> {
    let mut files = config.files();
    let text = fs::read_to_string(&files.meta_file).map_err(MeshError::Io)?;
    let meta: PhysicalMeta = serde_json::from_str(&text).map_err(MeshError::Metadata)?;
    files.meta = Some(meta);
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn workdir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("poregeo-{}-{name}", std::process::id()))
    }

    fn tagged_script() -> GeoScript {
        let mut geo = GeoScript::new();
        geo.physical_domain("fluid", 2, &[1]);
        geo
    }

    #[test]
    fn default_layout() {
        let config = MesherConfig::default();
        let files = config.files();
        assert_eq!(files.geo, PathBuf::from("/tmp/nanopores/input.geo"));
        assert_eq!(files.meta_file, PathBuf::from("/tmp/nanopores/meta.txt"));
        let config = MesherConfig {
            pid: Some("42".to_owned()),
            ..config
        };
        assert_eq!(
            config.files().facet_region,
            PathBuf::from("/tmp/nanopores/mesh42_facet_region.xml")
        );
    }

    #[test]
    fn config_from_toml() {
        let config: MesherConfig = toml::from_str("clscale = 0.5\nmeshdir = \"/work\"").unwrap();
        assert_eq!(config.gmsh, "gmsh");
        assert_eq!(config.meshdir, PathBuf::from("/work"));
        approx::assert_relative_eq!(config.clscale, 0.5);
    }

    #[test]
    fn missing_executable_is_reported() {
        let config = MesherConfig {
            gmsh: "poregeo-no-such-mesher".to_owned(),
            meshdir: workdir("missing"),
            ..MesherConfig::default()
        };
        let err = to_mesh(tagged_script(), &config).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PoregeoError::Mesh(MeshError::Io(_))
        ));
        let code = fs::read_to_string(config.files().geo).unwrap();
        assert!(code.ends_with("General.ExpertMode = 1;\n"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_mesher_is_fatal() {
        let config = MesherConfig {
            gmsh: "false".to_owned(),
            meshdir: workdir("failing"),
            ..MesherConfig::default()
        };
        let err = to_mesh(tagged_script(), &config).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PoregeoError::Mesh(MeshError::ToolFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn metadata_survives_a_reload() {
        let config = MesherConfig {
            gmsh: "true".to_owned(),
            converter: "true".to_owned(),
            meshdir: workdir("reload"),
            pid: Some("7".to_owned()),
            ..MesherConfig::default()
        };
        let files = to_mesh(tagged_script(), &config).unwrap();
        assert_eq!(files.meta.as_ref().unwrap().physical_domain["fluid"], vec![1]);

        let reloaded = geo_from_meshdir(&config).unwrap();
        assert_eq!(reloaded, files);
    }

    #[cfg(unix)]
    fn recording_tool(dir: &Path, name: &str) -> (PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let tool = dir.join(name);
        let log = dir.join(format!("{name}.args"));
        let body = format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n", log.display());
        fs::write(&tool, body).unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        (tool, log)
    }

    #[cfg(unix)]
    #[test]
    fn tools_receive_their_arguments() {
        let meshdir = workdir("args");
        fs::create_dir_all(&meshdir).unwrap();
        let (gmsh, gmsh_log) = recording_tool(&meshdir, "fake-gmsh");
        let (converter, converter_log) = recording_tool(&meshdir, "fake-convert");
        let config = MesherConfig {
            gmsh: gmsh.display().to_string(),
            converter: converter.display().to_string(),
            clscale: 0.5,
            meshdir,
            pid: Some("3".to_owned()),
        };
        let files = to_mesh(tagged_script(), &config).unwrap();

        let gmsh_args: Vec<String> = fs::read_to_string(gmsh_log)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect();
        let expected: Vec<String> = [
            "-3".to_owned(),
            "-v".to_owned(),
            "1".to_owned(),
            "-clscale".to_owned(),
            "0.500000".to_owned(),
            files.geo.display().to_string(),
            "-o".to_owned(),
            files.msh.display().to_string(),
        ]
        .into();
        assert_eq!(gmsh_args, expected);
        assert!(files.geo.ends_with("input3.geo"));

        let converter_args: Vec<String> = fs::read_to_string(converter_log)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect();
        assert_eq!(
            converter_args,
            vec![files.msh.display().to_string(), files.xml.display().to_string()]
        );
    }

    #[test]
    fn synonymes_merge_tags() {
        let mut meta = PhysicalMeta::default();
        meta.physical_domain.insert("pore".to_owned(), vec![1]);
        meta.physical_domain.insert("bulk".to_owned(), vec![2, 3]);
        let mut files = MesherConfig::default().files();
        files.meta = Some(meta);
        let mut synonymes = BTreeMap::new();
        synonymes.insert(
            "fluid".to_owned(),
            ["pore", "bulk"].iter().map(|s| (*s).to_owned()).collect(),
        );
        let geo = Geometry {
            files,
            params: BTreeMap::new(),
            synonymes,
        };
        assert_eq!(geo.physical_domain("fluid"), vec![1, 2, 3]);
        assert_eq!(geo.physical_domain("pore"), vec![1]);
        assert!(geo.physical_boundary("pore").is_empty());
    }
}

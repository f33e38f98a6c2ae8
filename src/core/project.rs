// src/core/project.rs

use crate::{
    constants::RESOURCE_PREFIX,
    core::{
        catalog::{Generation, KeyLayout, VersionCatalog},
        ini::{ConfigDocument, IniError},
    },
    dev_utils,
};
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while discovering, reading or creating a project.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The location does not exist.
    #[error("Project location '{0}' does not exist.")]
    NotFound(PathBuf),
    /// The location is not a directory.
    #[error("Project location '{0}' is not a directory.")]
    InvalidArgument(PathBuf),
    /// No recognized project file, or a directory that cannot hold a new project.
    #[error("{0}")]
    ProjectFormat(String),
    /// Filesystem access failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The project file could not be read.
    #[error("Could not read project file: {0}")]
    Config(#[from] IniError),
}

/// Snapshot of a project directory, taken once at discovery.
#[derive(Debug)]
pub struct ProjectDescriptor {
    directory: PathBuf,
    project_file: PathBuf,
    generation: Generation,
    name: String,
    icon: PathBuf,
    main_scene: PathBuf,
    document: ConfigDocument,
}

/// Serializable view of a project, for listings and `--json` output.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    /// Declared project name; may be empty.
    pub name: String,
    /// Project directory.
    pub directory: PathBuf,
    /// Project file inside `directory`.
    pub project_file: PathBuf,
    /// Engine generation ordinal (1-4).
    pub generation: u8,
    /// Resolved icon, if declared.
    pub icon: Option<PathBuf>,
    /// Resolved main scene, if declared.
    pub main_scene: Option<PathBuf>,
}

impl ProjectDescriptor {
    /// Discovers the project stored in `directory`.
    ///
    /// Only direct children are considered. When more than one recognized project
    /// file is present, the first one in directory-listing order wins.
    pub fn open(directory: &Path, catalog: &VersionCatalog) -> Result<Self, ProjectError> {
        if !directory.exists() {
            return Err(ProjectError::NotFound(directory.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(ProjectError::InvalidArgument(directory.to_path_buf()));
        }

        let (project_file, generation) = find_project_file(directory, catalog)?.ok_or_else(|| {
            ProjectError::ProjectFormat(format!(
                "Project directory '{}' does not contain a \"{}\" file.",
                directory.display(),
                catalog.project_file_names().join(" | ")
            ))
        })?;

        Self::read(directory, project_file, generation)
    }

    fn read(
        directory: &Path,
        project_file: PathBuf,
        generation: Generation,
    ) -> Result<Self, ProjectError> {
        let document = ConfigDocument::load(&project_file, false)?;

        let (name_key, icon_key, scene_key) = match generation.key_layout() {
            KeyLayout::Legacy => ("name", "icon", "main_scene"),
            KeyLayout::Modern => ("config/name", "config/icon", "run/main_scene"),
        };
        let field = |key: &str| document.value("application", key).unwrap_or_default();

        let name = field(name_key);
        let icon = resolve_resource(directory, &field(icon_key));
        let main_scene = resolve_resource(directory, &field(scene_key));

        log::debug!(
            "Loaded project '{}' (generation {}) from {}",
            name,
            generation.ordinal,
            project_file.display()
        );

        Ok(Self {
            directory: directory.to_path_buf(),
            project_file,
            generation,
            name,
            icon,
            main_scene,
            document,
        })
    }

    /// Absolute project directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The project file that was read.
    pub fn project_file(&self) -> &Path {
        &self.project_file
    }

    /// Generation inferred from the project file's name.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Project name; empty when none is declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved icon path; empty when the project declares none.
    pub fn icon_path(&self) -> &Path {
        &self.icon
    }

    /// Resolved main scene path; empty when the project declares none.
    pub fn main_scene_path(&self) -> &Path {
        &self.main_scene
    }

    /// The parsed project file.
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Every scene file under the project directory, at any depth.
    pub fn list_scenes(&self) -> Vec<PathBuf> {
        let _timer = dev_utils::BlockTimer::new(format!("list_scenes {}", self.directory.display()));
        WalkDir::new(&self.directory)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry while listing scenes: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.generation.is_scene_file(name))
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Owned, serializable copy of the metadata.
    pub fn summary(&self) -> ProjectSummary {
        let non_empty = |path: &Path| (!path.as_os_str().is_empty()).then(|| path.to_path_buf());
        ProjectSummary {
            name: self.name.clone(),
            directory: self.directory.clone(),
            project_file: self.project_file.clone(),
            generation: self.generation.ordinal,
            icon: non_empty(&self.icon),
            main_scene: non_empty(&self.main_scene),
        }
    }
}

fn find_project_file(
    directory: &Path,
    catalog: &VersionCatalog,
) -> Result<Option<(PathBuf, Generation)>, ProjectError> {
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ProjectError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let found = entry
            .file_name()
            .to_str()
            .and_then(|name| catalog.by_project_file_name(name));
        if let Some(generation) = found {
            return Ok(Some((entry.into_path(), generation)));
        }
    }
    Ok(None)
}

/// Resolves a project resource reference against the project directory.
///
/// Empty values stay empty. A single `res://` prefix is stripped; whatever remains
/// is taken as relative to `directory`, even if it starts with a separator.
pub fn resolve_resource(directory: &Path, value: &str) -> PathBuf {
    if value.is_empty() {
        return PathBuf::new();
    }
    let relative = value
        .strip_prefix(RESOURCE_PREFIX)
        .unwrap_or(value)
        .trim_start_matches(['/', '\\']);

    let mut resolved = directory.to_path_buf();
    resolved.extend(
        Path::new(relative)
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_))),
    );
    resolved
}

/// Creates a new project of the requested generation in `directory`.
///
/// The directory must either not exist yet (it is then created) or be empty.
/// An empty project file is written, then the directory is opened as a project.
pub fn create_project(
    directory: &Path,
    generation: Generation,
) -> Result<ProjectDescriptor, ProjectError> {
    if !directory.exists() {
        fs::create_dir_all(directory)?;
    }
    if !directory.is_dir() {
        return Err(ProjectError::InvalidArgument(directory.to_path_buf()));
    }
    if fs::read_dir(directory)?.next().is_some() {
        return Err(ProjectError::ProjectFormat(format!(
            "Directory '{}' is not empty.",
            directory.display()
        )));
    }

    let project_file = directory.join(generation.project_file_name);
    fs::write(&project_file, "")?;
    log::info!(
        "Created generation {} project at {}",
        generation.ordinal,
        directory.display()
    );

    // Keep the requested generation even if its file name maps to an older entry.
    ProjectDescriptor::read(directory, project_file, generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn catalog() -> VersionCatalog {
        VersionCatalog::godot()
    }

    #[test]
    fn test_open_modern_project() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("project.godot"),
            "config_version=4\n\n[application]\n\nconfig/name=Demo\nconfig/icon=res://icon.png\nrun/main_scene=res://Main.tscn\n",
        )
        .unwrap();

        let project = ProjectDescriptor::open(dir.path(), &catalog()).unwrap();
        assert_eq!(project.name(), "Demo");
        assert_eq!(project.icon_path(), dir.path().join("icon.png"));
        assert_eq!(project.main_scene_path(), dir.path().join("Main.tscn"));
        assert_eq!(project.generation().ordinal, 3);
        assert_eq!(project.project_file(), dir.path().join("project.godot"));
    }

    #[test]
    fn test_open_legacy_project() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("engine.cfg"),
            "[application]\nname=\"Old Game\"\nmain_scene=\"res://scenes/main.scn\"\nicon=\"icon.png\"\n",
        )
        .unwrap();

        let project = ProjectDescriptor::open(dir.path(), &catalog()).unwrap();
        assert_eq!(project.name(), "Old Game");
        assert_eq!(project.generation().ordinal, 1);
        assert_eq!(project.main_scene_path(), dir.path().join("scenes/main.scn"));
        assert_eq!(project.icon_path(), dir.path().join("icon.png"));
    }

    #[test]
    fn test_missing_fields_resolve_to_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("project.godot"), "[application]\n").unwrap();

        let project = ProjectDescriptor::open(dir.path(), &catalog()).unwrap();
        assert_eq!(project.name(), "");
        assert!(project.icon_path().as_os_str().is_empty());
        let summary = project.summary();
        assert_eq!(summary.icon, None);
        assert_eq!(summary.main_scene, None);
    }

    #[test]
    fn test_open_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            ProjectDescriptor::open(&missing, &catalog()),
            Err(ProjectError::NotFound(_))
        ));

        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            ProjectDescriptor::open(&file, &catalog()),
            Err(ProjectError::InvalidArgument(_))
        ));

        // A project file nested one level down is not discovered.
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("project.godot"), "").unwrap();
        assert!(matches!(
            ProjectDescriptor::open(dir.path(), &catalog()),
            Err(ProjectError::ProjectFormat(_))
        ));
    }

    #[test]
    fn test_resolve_resource_strips_prefix_once() {
        let base = Path::new("/games/demo");
        assert_eq!(resolve_resource(base, ""), PathBuf::new());
        assert_eq!(resolve_resource(base, "res://icon.png"), base.join("icon.png"));
        assert_eq!(resolve_resource(base, "art/icon.png"), base.join("art/icon.png"));
        assert_eq!(
            resolve_resource(base, "res://res://icon.png"),
            base.join("res://icon.png")
        );
    }

    #[test]
    fn test_resolve_resource_keeps_rooted_values_inside_project() {
        let base = Path::new("/games/demo");
        assert_eq!(resolve_resource(base, "/icon.png"), base.join("icon.png"));
        assert_eq!(resolve_resource(base, "res:///icon.png"), base.join("icon.png"));
        assert_eq!(
            resolve_resource(base, "res:///art/icons/icon.png"),
            base.join("art").join("icons").join("icon.png")
        );
    }

    #[test]
    fn test_list_scenes_walks_recursively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("project.godot"), "[application]\n").unwrap();
        fs::create_dir_all(dir.path().join("levels/extra")).unwrap();
        fs::write(dir.path().join("Main.tscn"), "").unwrap();
        fs::write(dir.path().join("levels/One.tscn"), "").unwrap();
        fs::write(dir.path().join("levels/extra/Two.tscn"), "").unwrap();
        fs::write(dir.path().join("levels/notes.txt"), "").unwrap();
        fs::write(dir.path().join("levels/Old.scn"), "").unwrap();

        let project = ProjectDescriptor::open(dir.path(), &catalog()).unwrap();
        let mut scenes = project.list_scenes();
        scenes.sort();
        assert_eq!(
            scenes,
            vec![
                dir.path().join("Main.tscn"),
                dir.path().join("levels/One.tscn"),
                dir.path().join("levels/extra/Two.tscn"),
            ]
        );
    }

    #[test]
    fn test_create_project_in_new_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("new_game");
        let v4 = catalog().by_ordinal(4).unwrap();

        let project = create_project(&target, v4).unwrap();
        assert!(target.join("project.godot").is_file());
        assert_eq!(project.generation().ordinal, 4);
        assert_eq!(project.name(), "");
    }

    #[test]
    fn test_create_project_in_empty_existing_directory() {
        let dir = TempDir::new().unwrap();
        let v2 = catalog().by_ordinal(2).unwrap();

        let project = create_project(dir.path(), v2).unwrap();
        assert_eq!(project.project_file(), dir.path().join("engine.cfg"));
        assert_eq!(project.generation().key_layout(), KeyLayout::Legacy);
    }

    #[test]
    fn test_create_project_rejects_non_empty_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.md"), "hello").unwrap();
        let v3 = catalog().by_ordinal(3).unwrap();

        let result = create_project(dir.path(), v3);
        assert!(matches!(result, Err(ProjectError::ProjectFormat(_))));
        assert!(!dir.path().join("project.godot").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

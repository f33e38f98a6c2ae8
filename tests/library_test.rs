// tests/library_test.rs

use gdlauncher::core::{
    catalog::VersionCatalog,
    library::{Library, LibraryError},
    project::{self, ProjectDescriptor, ProjectError},
    store::FileStore,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn open_library(dir: &TempDir) -> Library<FileStore> {
    let store = FileStore::open(&dir.path().join("state").join("store.bin")).unwrap();
    Library::new(store, VersionCatalog::godot())
}

#[test]
fn created_projects_survive_a_store_reopen() {
    let state = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let catalog = VersionCatalog::godot();

    let modern_dir = workspace.path().join("modern");
    let legacy_dir = workspace.path().join("legacy");
    {
        let library = open_library(&state);
        let modern = project::create_project(&modern_dir, catalog.by_ordinal(4).unwrap()).unwrap();
        let legacy = project::create_project(&legacy_dir, catalog.by_ordinal(2).unwrap()).unwrap();
        assert_eq!(modern.generation().ordinal, 4);
        assert_eq!(legacy.generation().ordinal, 2);

        library.register_project(&modern, None).unwrap();
        library.register_project(&legacy, None).unwrap();
        library.set_config_value("last_opened", "modern").unwrap();
    }

    let library = open_library(&state);
    let mut files: Vec<String> = library
        .projects()
        .unwrap()
        .iter()
        .map(|p| {
            p.project_file()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    files.sort();
    assert_eq!(files, vec!["engine.cfg", "project.godot"]);
    assert_eq!(
        library.config_value("last_opened").unwrap().as_deref(),
        Some("modern")
    );
    assert!(library.project_engine(&modern_dir).unwrap().is_none());
}

#[test]
fn registered_project_reflects_edits_on_reread() {
    let state = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let library = open_library(&state);

    let dir = workspace.path().join("game");
    let created =
        project::create_project(&dir, VersionCatalog::godot().by_ordinal(3).unwrap()).unwrap();
    assert_eq!(created.name(), "");
    library.register_project(&created, None).unwrap();

    fs::write(
        created.project_file(),
        "config_version=4\n[application]\nconfig/name=\"Space Game\"\nrun/main_scene=\"res://levels/One.tscn\"\n",
    )
    .unwrap();
    fs::create_dir_all(dir.join("levels")).unwrap();
    fs::write(dir.join("levels").join("One.tscn"), "[gd_scene]\n").unwrap();

    // The descriptor taken at creation is a snapshot; the library re-reads.
    assert_eq!(created.name(), "");
    let reread = library.project(&dir).unwrap();
    assert_eq!(reread.name(), "Space Game");
    assert_eq!(reread.main_scene_path(), dir.join("levels").join("One.tscn"));
    assert_eq!(reread.list_scenes(), vec![dir.join("levels").join("One.tscn")]);
}

#[test]
fn create_project_refuses_non_empty_directory() {
    let workspace = TempDir::new().unwrap();
    let dir = workspace.path().join("busy");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("notes.txt"), "keep me").unwrap();

    let result = project::create_project(&dir, VersionCatalog::godot().by_ordinal(3).unwrap());
    assert!(matches!(result, Err(ProjectError::ProjectFormat(_))));
    assert!(!dir.join("project.godot").exists());
    assert!(matches!(
        ProjectDescriptor::open(&dir, &VersionCatalog::godot()),
        Err(ProjectError::ProjectFormat(_))
    ));
}

#[test]
fn unknown_engine_cannot_be_bound() {
    let state = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let library = open_library(&state);
    let created = project::create_project(
        &workspace.path().join("game"),
        VersionCatalog::godot().by_ordinal(3).unwrap(),
    )
    .unwrap();

    assert!(matches!(
        library.register_project(&created, Some("Godot Engine (Mono) 3.2.3.stable.mono.official")),
        Err(LibraryError::EngineNotFound(_))
    ));
    assert!(library.projects().unwrap().is_empty());
}

// src/core/catalog.rs

use std::fmt;
use std::path::Path;

/// One engine generation: how its projects are named and which scene files it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation {
    /// Major engine version this entry describes.
    pub ordinal: u8,
    /// Exact file name of the project file at the root of a project directory.
    pub project_file_name: &'static str,
    /// Scene file extension, without the leading dot.
    pub scene_extension: &'static str,
}

/// Which key names a generation uses for project metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    /// `application.name`, `application.icon`, `application.main_scene`.
    Legacy,
    /// `application.config/name`, `application.config/icon`, `application.run/main_scene`.
    Modern,
}

impl Generation {
    /// Key layout used by project files of this generation.
    pub fn key_layout(&self) -> KeyLayout {
        if self.ordinal < 3 {
            KeyLayout::Legacy
        } else {
            KeyLayout::Modern
        }
    }

    /// Returns `true` when `file_name` ends with this generation's scene extension.
    pub fn is_scene_file(&self, file_name: &str) -> bool {
        file_name
            .strip_suffix(self.scene_extension)
            .is_some_and(|stem| stem.ends_with('.'))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version {} (project file: {}, scenes: .{})",
            self.ordinal, self.project_file_name, self.scene_extension
        )
    }
}

/// Known Godot generations, oldest first.
pub const GODOT_GENERATIONS: &[Generation] = &[
    // Listed only so very old projects can still be recognized.
    Generation {
        ordinal: 1,
        project_file_name: "engine.cfg",
        scene_extension: "scn",
    },
    Generation {
        ordinal: 2,
        project_file_name: "engine.cfg",
        scene_extension: "scn",
    },
    Generation {
        ordinal: 3,
        project_file_name: "project.godot",
        scene_extension: "tscn",
    },
    Generation {
        ordinal: 4,
        project_file_name: "project.godot",
        scene_extension: "tscn",
    },
];

/// Immutable, ordered table of engine generations.
///
/// The table is passed explicitly to the project and library types instead of
/// living in a global, so tests can substitute their own entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCatalog {
    entries: &'static [Generation],
}

impl Default for VersionCatalog {
    fn default() -> Self {
        Self::godot()
    }
}

impl VersionCatalog {
    /// Creates a catalog over an arbitrary static table.
    pub const fn new(entries: &'static [Generation]) -> Self {
        Self { entries }
    }

    /// The catalog of released Godot generations.
    pub const fn godot() -> Self {
        Self::new(GODOT_GENERATIONS)
    }

    /// All entries, in declaration order.
    pub fn entries(&self) -> &'static [Generation] {
        self.entries
    }

    /// First entry whose project file is named `name`.
    pub fn by_project_file_name(&self, name: &str) -> Option<Generation> {
        self.entries
            .iter()
            .find(|entry| entry.project_file_name == name)
            .copied()
    }

    /// Entry for the given generation ordinal.
    pub fn by_ordinal(&self, ordinal: u8) -> Option<Generation> {
        self.entries
            .iter()
            .find(|entry| entry.ordinal == ordinal)
            .copied()
    }

    /// Checks whether the file name of `file` is any registered project file name.
    pub fn is_valid_project_file(&self, file: &Path) -> bool {
        file.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.by_project_file_name(name).is_some())
    }

    /// Distinct project file names, in declaration order.
    pub fn project_file_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for entry in self.entries {
            if !names.contains(&entry.project_file_name) {
                names.push(entry.project_file_name);
            }
        }
        names
    }
}

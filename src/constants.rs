// src/constants.rs

/// The name of the launcher directory inside the system config directory.
pub const LAUNCHER_DIR: &str = "gdlauncher";

/// The name of the launcher settings file (inside the launcher directory).
pub const LAUNCHER_CONFIG_FILENAME: &str = "launcher.toml";

/// The name of the persisted engine/project store (inside the launcher directory).
pub const STORE_FILENAME: &str = "store.bin";

/// Literal that every recognized engine binary contains somewhere in its bytes.
pub const ENGINE_MARKER: &str = "Godot Engine";

/// Flag passed to an engine executable when probing its version.
pub const PROBE_FLAG: &str = "--help";

/// Virtual prefix for project-relative resources in project files.
pub const RESOURCE_PREFIX: &str = "res://";

/// Name of the section holding keys declared before any section header.
pub const DEFAULT_SECTION_NAME: &str = "Default";

/// Separator used by `Section::get_list` when the caller has no preference.
pub const DEFAULT_LIST_SEPARATOR: &str = ",";

/// Number of leading bytes inspected when sniffing a file's content type.
pub const SNIFF_HEADER_LEN: u64 = 4096;

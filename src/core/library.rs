// src/core/library.rs

use crate::core::{
    catalog::VersionCatalog,
    engine::{EngineDescriptor, EngineError},
    project::{ProjectDescriptor, ProjectError},
    store::{
        ConfigRecord, EngineRecord, ProjectRecord, Record, RecordSet, Store, StoreError,
        project_key,
    },
};
use rayon::prelude::*;
use std::path::Path;
use thiserror::Error;

/// Errors raised by [`Library`] operations.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// An engine failed validation or probing.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// A project could not be read.
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),
    /// Registration would overwrite an engine with the same display name.
    #[error("An engine named '{0}' is already registered.")]
    DuplicateEngine(String),
    /// No engine with that display name.
    #[error("No engine named '{0}' is registered.")]
    EngineNotFound(String),
    /// The project location is already registered.
    #[error("Project '{0}' is already registered.")]
    DuplicateProject(String),
    /// The project location is unknown.
    #[error("Project '{0}' is not registered.")]
    ProjectNotRegistered(String),
}

/// Result type of [`Library`] operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// A stored engine that passed re-validation.
#[derive(Debug)]
pub struct RegisteredEngine {
    /// Display name the engine is stored under.
    pub name: String,
    /// The re-opened executable.
    pub engine: EngineDescriptor,
}

/// Registry of engines, projects and launcher settings on top of a [`Store`].
#[derive(Debug)]
pub struct Library<S: Store> {
    store: S,
    catalog: VersionCatalog,
}

impl<S: Store> Library<S> {
    /// Wraps `store`; `catalog` maps generations to project file names.
    pub fn new(store: S, catalog: VersionCatalog) -> Self {
        Self { store, catalog }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Known engine generations.
    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    // --- Engines ---

    /// Probes `engine` and stores it under its display name. Returns that name.
    ///
    /// A default engine takes the default flag away from every other engine.
    pub fn register_engine(&self, engine: &EngineDescriptor) -> LibraryResult<String> {
        let name = engine.display_name()?;
        let record = EngineRecord {
            name: name.clone(),
            location: engine.path().to_path_buf(),
            is_default: false,
        };
        if !self.store.insert(Record::Engine(record))? {
            return Err(LibraryError::DuplicateEngine(name));
        }
        log::info!("Registered engine '{}' at {}", name, engine.path().display());

        if engine.is_default() {
            self.set_default_engine(&name)?;
        }
        Ok(name)
    }

    /// Opens and re-validates the stored engine called `name`.
    pub fn engine(&self, name: &str) -> LibraryResult<EngineDescriptor> {
        let record = self.engine_record(name)?;
        Ok(EngineDescriptor::open_with_default(
            &record.location,
            record.is_default,
        )?)
    }

    /// Every stored engine that still validates, ordered by name.
    pub fn engines(&self) -> LibraryResult<Vec<RegisteredEngine>> {
        let records = self.engine_records()?;
        let engines = records
            .into_par_iter()
            .filter_map(|record| {
                match EngineDescriptor::open_with_default(&record.location, record.is_default) {
                    Ok(engine) => Some(RegisteredEngine {
                        name: record.name,
                        engine,
                    }),
                    Err(e) => {
                        log::warn!("Skipping engine '{}': {}", record.name, e);
                        None
                    }
                }
            })
            .collect();
        Ok(engines)
    }

    /// The engine flagged as default, if it still validates.
    pub fn default_engine(&self) -> LibraryResult<Option<RegisteredEngine>> {
        let Some(record) = self
            .engine_records()?
            .into_iter()
            .find(|record| record.is_default)
        else {
            return Ok(None);
        };
        let engine = EngineDescriptor::open_with_default(&record.location, true)?;
        Ok(Some(RegisteredEngine {
            name: record.name,
            engine,
        }))
    }

    /// Makes `name` the only default engine.
    pub fn set_default_engine(&self, name: &str) -> LibraryResult<()> {
        if !self.store.exists(RecordSet::Engine, name)? {
            return Err(LibraryError::EngineNotFound(name.to_string()));
        }
        for mut record in self.engine_records()? {
            let is_default = record.name == name;
            if record.is_default != is_default {
                record.is_default = is_default;
                self.store.update(Record::Engine(record))?;
            }
        }
        Ok(())
    }

    /// Removes an engine and unbinds the projects that referenced it.
    pub fn remove_engine(&self, name: &str) -> LibraryResult<bool> {
        if !self.store.delete(RecordSet::Engine, name)? {
            return Ok(false);
        }
        for mut record in self.project_records()? {
            if record.engine_ref.as_deref() == Some(name) {
                log::debug!("Unbinding {} from removed engine", record.location.display());
                record.engine_ref = None;
                self.store.update(Record::Project(record))?;
            }
        }
        Ok(true)
    }

    // --- Projects ---

    /// Registers `project`, optionally bound to a registered engine.
    pub fn register_project(
        &self,
        project: &ProjectDescriptor,
        engine_ref: Option<&str>,
    ) -> LibraryResult<()> {
        if let Some(name) = engine_ref {
            if !self.store.exists(RecordSet::Engine, name)? {
                return Err(LibraryError::EngineNotFound(name.to_string()));
            }
        }
        let record = ProjectRecord {
            location: project.directory().to_path_buf(),
            engine_ref: engine_ref.map(str::to_string),
        };
        if !self.store.insert(Record::Project(record))? {
            return Err(LibraryError::DuplicateProject(
                project.directory().display().to_string(),
            ));
        }
        log::info!("Registered project '{}'", project.name());
        Ok(())
    }

    /// Re-reads the registered project at `location`.
    pub fn project(&self, location: &Path) -> LibraryResult<ProjectDescriptor> {
        let record = self.project_record(location)?;
        Ok(ProjectDescriptor::open(&record.location, &self.catalog)?)
    }

    /// Every registered project that still reads, ordered by location.
    pub fn projects(&self) -> LibraryResult<Vec<ProjectDescriptor>> {
        let records = self.project_records()?;
        let projects = records
            .into_par_iter()
            .filter_map(
                |record| match ProjectDescriptor::open(&record.location, &self.catalog) {
                    Ok(project) => Some(project),
                    Err(e) => {
                        log::warn!("Skipping project {}: {}", record.location.display(), e);
                        None
                    }
                },
            )
            .collect();
        Ok(projects)
    }

    /// Engine bound to the registered project at `location`, if any.
    pub fn project_engine(&self, location: &Path) -> LibraryResult<Option<EngineDescriptor>> {
        match self.project_record(location)?.engine_ref {
            Some(name) => self.engine(&name).map(Some),
            None => Ok(None),
        }
    }

    /// Rebinds a registered project. `None` unbinds it.
    pub fn set_project_engine(&self, location: &Path, engine_ref: Option<&str>) -> LibraryResult<()> {
        let mut record = self.project_record(location)?;
        if let Some(name) = engine_ref {
            if !self.store.exists(RecordSet::Engine, name)? {
                return Err(LibraryError::EngineNotFound(name.to_string()));
            }
        }
        record.engine_ref = engine_ref.map(str::to_string);
        self.store.update(Record::Project(record))?;
        Ok(())
    }

    /// Forgets a project. Returns whether it was registered.
    pub fn remove_project(&self, location: &Path) -> LibraryResult<bool> {
        Ok(self
            .store
            .delete(RecordSet::Project, &project_key(location))?)
    }

    // --- Settings ---

    /// Value of a stored setting.
    pub fn config_value(&self, name: &str) -> LibraryResult<Option<String>> {
        match self.store.get(RecordSet::Config, name)? {
            Some(Record::Config(record)) => Ok(Some(record.value)),
            _ => Ok(None),
        }
    }

    /// Inserts or overwrites a setting.
    pub fn set_config_value(&self, name: &str, value: &str) -> LibraryResult<()> {
        let record = Record::Config(ConfigRecord {
            name: name.to_string(),
            value: value.to_string(),
        });
        if !self.store.update(record.clone())? {
            self.store.insert(record)?;
        }
        Ok(())
    }

    /// Removes a setting. Returns whether it existed.
    pub fn remove_config_value(&self, name: &str) -> LibraryResult<bool> {
        Ok(self.store.delete(RecordSet::Config, name)?)
    }

    // --- Helpers ---

    fn engine_record(&self, name: &str) -> LibraryResult<EngineRecord> {
        match self.store.get(RecordSet::Engine, name)? {
            Some(Record::Engine(record)) => Ok(record),
            _ => Err(LibraryError::EngineNotFound(name.to_string())),
        }
    }

    fn engine_records(&self) -> LibraryResult<Vec<EngineRecord>> {
        Ok(self
            .store
            .list(RecordSet::Engine)?
            .into_iter()
            .filter_map(|record| match record {
                Record::Engine(record) => Some(record),
                _ => None,
            })
            .collect())
    }

    fn project_record(&self, location: &Path) -> LibraryResult<ProjectRecord> {
        let key = project_key(location);
        match self.store.get(RecordSet::Project, &key)? {
            Some(Record::Project(record)) => Ok(record),
            _ => Err(LibraryError::ProjectNotRegistered(key)),
        }
    }

    fn project_records(&self) -> LibraryResult<Vec<ProjectRecord>> {
        Ok(self
            .store
            .list(RecordSet::Project)?
            .into_iter()
            .filter_map(|record| match record {
                Record::Project(record) => Some(record),
                _ => None,
            })
            .collect())
    }
}

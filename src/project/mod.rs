//! Pipeline data model: projects, shots, and the task paths derived from
//! them.
//!
//! A [`Project`] is the persisted record (a TOML descriptor at the project
//! root); a [`ProjectPath`] is the ephemeral view handed to the template
//! resolver. Resolved paths are reconstructible purely from (project, shot,
//! task, template, version): nothing here caches filesystem state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ProjectError, Result};
use crate::template::Variables;

/// File name of the project descriptor under the project root.
pub const DESCRIPTOR_FILE: &str = "project.toml";

/// A persisted pipeline project.
///
/// Created only by [`Project::create`], destroyed only by
/// [`Project::delete`]; nothing in the engine removes one implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub root: PathBuf,
    pub created: DateTime<Utc>,
    pub shots: BTreeMap<String, Shot>,
}

/// A shot owned by exactly one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    pub id: String,
    /// task name -> template id used for that task's outputs
    pub tasks: BTreeMap<String, String>,
}

impl Shot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: BTreeMap::new(),
        }
    }

    pub fn set_task(&mut self, task: impl Into<String>, template_id: impl Into<String>) {
        self.tasks.insert(task.into(), template_id.into());
    }
}

impl Project {
    /// Create a new project at `root` and write its descriptor. Fails if a
    /// descriptor already exists there.
    pub fn create<P: AsRef<Path>>(root: P, id: impl Into<String>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;

        let descriptor = root.join(DESCRIPTOR_FILE);
        if descriptor.exists() {
            return Err(ProjectError::AlreadyExists {
                path: descriptor.display().to_string(),
            }
            .into());
        }

        let project = Self {
            id: id.into(),
            root: root.to_path_buf(),
            created: Utc::now(),
            shots: BTreeMap::new(),
        };
        project.save()?;
        info!("Created project '{}' at {:?}", project.id, root);
        Ok(project)
    }

    /// Load a project from the descriptor under `root`.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let descriptor = root.as_ref().join(DESCRIPTOR_FILE);
        let content =
            std::fs::read_to_string(&descriptor).map_err(|_| ProjectError::DescriptorNotFound {
                path: descriptor.display().to_string(),
            })?;

        let project: Project = toml::from_str(&content).map_err(|_| ProjectError::ParseFailed {
            path: descriptor.display().to_string(),
        })?;
        Ok(project)
    }

    /// Write the descriptor back to disk.
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|_| ProjectError::ParseFailed {
            path: self.descriptor_path().display().to_string(),
        })?;
        std::fs::write(self.descriptor_path(), content)?;
        Ok(())
    }

    /// Explicitly delete the project descriptor. Rendered output under the
    /// root is left untouched; removing data is the operator's call, not the
    /// engine's.
    pub fn delete(self) -> Result<()> {
        std::fs::remove_file(self.descriptor_path())?;
        info!("Deleted project descriptor for '{}'", self.id);
        Ok(())
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.root.join(DESCRIPTOR_FILE)
    }

    /// Add a shot (no-op if it already exists) and return it for task setup.
    pub fn add_shot(&mut self, id: impl Into<String>) -> &mut Shot {
        let id = id.into();
        self.shots
            .entry(id.clone())
            .or_insert_with(|| Shot::new(id))
    }

    /// Look up a shot, failing with [`ProjectError::ShotNotFound`] when
    /// absent.
    pub fn shot(&self, id: &str) -> Result<&Shot> {
        self.shots
            .get(id)
            .ok_or_else(|| ProjectError::ShotNotFound { id: id.to_string() }.into())
    }

    /// Build the ephemeral path record for one task of one shot.
    pub fn task_path(&self, shot_id: &str, task: &str) -> Result<ProjectPath> {
        let shot = self.shot(shot_id)?;
        let template_id = shot
            .tasks
            .get(task)
            .ok_or_else(|| ProjectError::TaskNotFound {
                shot: shot_id.to_string(),
                task: task.to_string(),
            })?;

        let mut variables = Variables::new();
        variables.insert("root".to_string(), self.root.to_string_lossy().into_owned());
        variables.insert("project".to_string(), self.id.clone());
        variables.insert("shot".to_string(), shot_id.to_string());
        variables.insert("task".to_string(), task.to_string());

        Ok(ProjectPath {
            template_id: template_id.clone(),
            variables,
            current_version: None,
        })
    }
}

/// Ephemeral view tying a template to the variables that resolve it.
///
/// Recomputed from project/shot state on demand; never persisted and never
/// the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPath {
    pub template_id: String,
    pub variables: Variables,
    pub current_version: Option<u32>,
}

impl ProjectPath {
    /// Pin a literal version number.
    pub fn with_version(mut self, version: u32) -> Self {
        self.current_version = Some(version);
        self.variables
            .insert("version".to_string(), version.to_string());
        self
    }

    /// Ask resolution to use the highest version that exists on disk.
    pub fn with_latest_version(mut self) -> Self {
        self.current_version = None;
        self.variables
            .insert("version".to_string(), crate::template::LATEST.to_string());
        self
    }

    /// Supply an extra variable (frame, ext, layer, ...).
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.variables.insert(key.to_string(), value.to_string());
        self
    }
}

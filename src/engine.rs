use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    config::Config,
    error::Result,
    header::{read_container_header, ContainerHeader},
    project::{Project, ProjectPath},
    sequence::{scan_sequences, SequenceDescriptor},
    template::{Resolver, Variables},
    version::VersionManager,
};

/// Facade over the path/version/sequence engine.
///
/// Wires the template registry and version policy from one [`Config`] at
/// startup and exposes the operations the host layers consume. Every
/// operation is short and synchronous; the only contended resource is the
/// version counter, which coordinates through the filesystem itself.
pub struct PipelineEngine {
    resolver: Resolver,
    versions: VersionManager,
}

impl PipelineEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let resolver = Resolver::new(config.registry()?);
        let versions = config.version_manager();

        info!(
            "Pipeline engine ready: {} template(s) registered",
            resolver.registry().len()
        );
        Ok(Self { resolver, versions })
    }

    /// Engine configured from the host environment (see
    /// [`Config::from_env`]).
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Resolve a template id against a variable mapping. `version =
    /// "latest"` resolves through the version manager; everything else is
    /// pure substitution.
    pub fn resolve_path(&self, template_id: &str, vars: &Variables) -> Result<PathBuf> {
        self.resolver.resolve(template_id, vars, &self.versions)
    }

    /// Resolve a task path computed from the project data model.
    pub fn resolve_task_path(&self, task_path: &ProjectPath) -> Result<PathBuf> {
        debug!(
            "Resolving task path via template '{}'",
            task_path.template_id
        );
        self.resolve_path(&task_path.template_id, &task_path.variables)
    }

    /// Convenience glue from the data model to the resolver.
    pub fn task_path(&self, project: &Project, shot: &str, task: &str) -> Result<ProjectPath> {
        project.task_path(shot, task)
    }

    /// Claim and create the next version directory under `dir`. Safe under
    /// cross-process contention.
    pub fn next_version<P: AsRef<Path>>(&self, dir: P) -> Result<(u32, PathBuf)> {
        self.versions.create_next(dir)
    }

    /// Highest existing version under `dir`; read-only, creates nothing.
    pub fn latest_version<P: AsRef<Path>>(&self, dir: P) -> Result<u32> {
        self.versions.latest(dir)
    }

    /// Compact the frame files in a directory into sequence descriptors.
    pub fn scan_sequences<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<SequenceDescriptor>> {
        scan_sequences(dir)
    }

    /// Read structural metadata from an image container without touching
    /// pixel data.
    pub fn read_container_header<P: AsRef<Path>>(&self, path: P) -> Result<ContainerHeader> {
        read_container_header(path)
    }
}

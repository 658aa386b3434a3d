//! # shotpath
//!
//! Path/version resolution and frame-sequence engine for VFX pipelines.
//!
//! This library is the host-independent core of a pipeline toolkit: it turns
//! collections of numbered frame files into compact range descriptions and
//! back, resolves templated logical paths (project/shot/task/version) into
//! concrete filesystem locations with race-free version numbering, and reads
//! structural metadata out of image-container headers without decoding any
//! pixels.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shotpath::{config::Config, engine::PipelineEngine, template::variables};
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = PipelineEngine::new(Config::default())?;
//!
//! let vars = variables([
//!     ("root", "/mnt/projects"),
//!     ("project", "PRJ"),
//!     ("shot", "SH010"),
//!     ("task", "comp"),
//!     ("version", "latest"),
//!     ("frame", "24"),
//!     ("ext", "exr"),
//! ]);
//! let path = engine.resolve_path("render", &vars)?;
//!
//! for sequence in engine.scan_sequences(path.parent().unwrap())? {
//!     println!("{}", sequence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`sequence`] - Frame tokenizing, range compaction, directory scanning
//! - [`header`] - Image-container header reading
//! - [`template`] - Path template parsing and resolution
//! - [`version`] - Version directory enumeration and race-free creation
//! - [`project`] - Project/shot data model feeding the resolver
//! - [`engine`] - Facade wiring it all together from one [`config::Config`]
//!
//! Host-application glue (menus, panels, registration) lives outside this
//! crate; everything here is a plain, synchronous function-call interface.

pub mod config;
pub mod engine;
pub mod error;
pub mod header;
pub mod project;
pub mod sequence;
pub mod template;
pub mod version;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    engine::PipelineEngine,
    error::{PipelineError, Result},
    header::ContainerHeader,
    project::{Project, ProjectPath, Shot},
    sequence::{FrameToken, SequenceDescriptor, SequenceRange},
    template::{Resolver, Template, TemplateRegistry, Variables},
    version::VersionManager,
};

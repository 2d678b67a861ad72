//! Keeps a host application's loaded extensions in sync with their source files.
//!
//! The pieces, leaves first:
//! - [`resolver`] turns path specs into the tracked file set.
//! - [`module_id`] names a tracked file the way the host registry does.
//! - [`watcher`] delivers change batches and runs the reconciliation loop,
//!   which calls into an [`registry::ExtensionRegistry`].

pub mod config;
pub mod logging;
pub mod module_id;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod watcher;

pub use module_id::{IdentifierError, IdentifierRules, ModuleId};
pub use registry::{CommandRegistry, ExtensionRegistry};
pub use resolver::{PathSpec, SpecShape, TrackedFiles};
pub use watcher::{
    BatchPolicy, ChangeBatch, ChangeEvent, ChangeKind, ExtensionReloader, ExtensionReloaderBuilder,
    Outcome, WatchError,
};

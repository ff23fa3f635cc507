//! Script model and pure transformations for the kinetic asset pipeline.
//!
//! Nothing in this crate performs network I/O. It defines the typed
//! script document, element roles, structural validation, asset naming
//! conventions, and the final render config handed to the renderer.

pub mod error;
pub mod naming;
pub mod render_config;
pub mod role;
pub mod schema;
pub mod script;
pub mod types;

pub use error::CoreError;
pub use render_config::FinalRenderConfig;
pub use role::Role;
pub use script::{Element, ProjectSettings, Scene, ScriptDocument};

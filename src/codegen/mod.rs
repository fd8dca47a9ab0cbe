//! sea-orm entity generation from mapping metadata.

pub mod entity;
pub mod manifest;
pub mod modfile;
pub mod template;

pub use entity::{module_name, render_entity};
pub use manifest::Manifest;
pub use modfile::update_entities_mod;

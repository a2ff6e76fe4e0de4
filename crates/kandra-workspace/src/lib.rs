//! Workspace Manager: owns the on-disk `source/`/`target/`/`.kandra/`/
//! `reports/` partition for a job and the thin git wrapper that populates
//! `source/` from a clone URL.

pub mod clone;
pub mod layout;

pub use clone::clone_source;
pub use layout::{WorkspaceLayout, workspace_dir};

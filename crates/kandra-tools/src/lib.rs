//! The four side-effect primitives the agent can invoke, all rooted at a
//! sandbox directory (`target/`). See [`kandra_shell`] for the fifth,
//! heavier primitive (`run_command`).

pub mod language_lock;
pub mod list_dir;
pub mod read_file;
pub mod result;
pub mod sandbox;
pub mod write_file;

pub use list_dir::list_dir;
pub use read_file::read_file;
pub use result::ToolResult;
pub use write_file::write_file;

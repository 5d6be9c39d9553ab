//! Configuration loading
//!
//! Loads [`deferq_domain::Config`] from environment variables or files.

pub mod loader;

// Re-export commonly used items
pub use loader::{find_config_path, load, load_from_env, load_from_file};

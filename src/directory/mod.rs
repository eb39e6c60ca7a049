/// Cluster name to server address resolution
pub mod server_directory;

pub use server_directory::{Cluster, ServerDirectory, StaticDirectory};

pub mod repo;
pub mod repo_types;

pub use repo::record;
pub use repo_types::{QueryHistory, QueryMode};

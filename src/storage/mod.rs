mod error;
mod memory;
mod turso;

pub use error::StorageError;
pub use memory::MemoryCache;
pub use turso::{timestamp, TursoClient};
pub(crate) use turso::read_opt_text;

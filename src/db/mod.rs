pub mod batches;
pub mod memory;

pub use batches::{BatchStore, SqliteBatchStore};
pub use memory::MemoryBatchStore;

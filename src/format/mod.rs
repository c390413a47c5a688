pub mod summary;

pub use summary::{batch_status, detailed_summary, short_summary};

pub mod match_spec;

pub use match_spec::{parse_match_spec, title_case};

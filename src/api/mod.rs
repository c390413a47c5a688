pub mod delivery;

pub use delivery::{DeliverySink, HttpDeliverySink};

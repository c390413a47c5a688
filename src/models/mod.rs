pub mod batch;
pub mod match_info;
pub mod odds;

pub use batch::{parse_batch_state, BatchState, CaptureBatch, ImageRef, BATCH_CAPACITY};
pub use match_info::MatchInfo;
pub use odds::{
    BttsOdds, DeliveryPayload, MatchWinnerOdds, OddsRecord, OddsValue, PlayerOdds, TotalsOdds,
};

// Quote sources: on-chain V2 router and off-chain pair index
pub mod price_index;
pub mod router;
pub mod utils;

pub use price_index::{HttpPriceIndex, PairDataset, PairReserves, PriceIndexSource};
pub use router::query_amounts_out;
pub use utils::*;

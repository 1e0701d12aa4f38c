pub mod aggregator;
pub mod api;
pub mod config;
pub mod dexes;
pub mod errors;
pub mod gas;
pub mod price_impact;
pub mod routing;
pub mod rpc;
pub mod types;

pub use aggregator::QuoteAggregator;
pub use config::ClientConfig;
pub use errors::{
    AggregateError, ConfigError, EndpointError, EndpointFailure, NormalizationWarning, PriceIndexError, QuoteError,
    SubmitError, ValidationError,
};
pub use gas::{StaticGasPolicy, TransactionPolicy};
pub use routing::PathBuilder;
pub use rpc::{ChainClient, EndpointRegistry, ResilientExecutor, TransactionSubmitter};
pub use types::{Endpoint, Quote, QuoteSource, TokenRef, TradingPath, TransactionParameters, TxType};

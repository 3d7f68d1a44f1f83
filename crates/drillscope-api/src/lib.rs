// drillscope-api: stored-procedure backend for the drill-down engine

pub mod client;
pub mod error;
pub mod fetcher;
pub mod hierarchy;
pub mod transport;

pub use client::{Row, RpcClient};
pub use error::Error;
pub use fetcher::{RowMetrics, RpcFetcher, build_args};
pub use hierarchy::{HierarchySpec, LevelSpec};
pub use transport::{TlsMode, TransportConfig};

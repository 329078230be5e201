//! Routes one inbound command batch to the Ephemeral, Durable, and Stream
//! managers by type and ephemeral/persistent classification, runs every
//! sub-batch concurrently, and reassembles results in original order.

pub mod dispatcher;
pub mod models;
pub mod rank_extract;

pub use dispatcher::Dispatcher;
pub use models::{CommandBatch, DispatchResponse, LoadCmd, LoadResult, RankCmd, RecvCmd, RecvResult, SaveCmd, SaveResult, SearchCmd, SendCmd, SortOrder, TopCmd};

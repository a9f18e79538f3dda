//! Logical-name asset cache shared by every scene host.
//!
//! Loads are memoized as shared futures: concurrent requests for one name join
//! the same in-flight load, and a failed load is evicted so the next request
//! starts over.

pub mod loader;
pub mod registry;

pub use loader::{AssetLoader, FsLoader, LoadFuture, ManualLoader};
pub use registry::{AssetFuture, AssetPoll, AssetRegistry, AssetValue, BUILTIN_NAMES};
pub use renderer::AssetKind;

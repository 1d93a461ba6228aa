//! Internal support types.

mod cleanup_bag;

pub(crate) use cleanup_bag::{drain_all, drain_sync, CleanupBag, CleanupStep};

//! Focus tracker that watches which window holds user focus, classifies the
//! activity into learning/productive/distraction, and accumulates durable
//! session records that can be queried by day, range and application. A deep
//! work mode actively suppresses classified distractions instead of merely
//! recording them.
//!

pub mod classify;
pub mod cli;
pub mod daemon;
pub mod probe;
pub mod store;
pub mod utils;

//!  Storage is organized through [session_store::SessionStoreImpl].
//!  The basic idea is:
//!   - There is a directory with all the records.
//!   - Finalized sessions are appended to the record file for the day they
//!     ended, one JSON document per line.
//!   - Aggregation happens on read in [queries]; nothing is maintained
//!     incrementally, which keeps the write path a plain append.

pub mod queries;
pub mod record;
pub mod session_store;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Category;

/// One finalized focus session, immutable once written. A record only exists
/// for sessions that lasted at least the tracker's minimum duration.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct SessionRecord {
    pub app_name: Arc<str>,
    pub category: Category,
    pub duration_secs: i64,
    /// The day the session ended. Also selects the record file it lives in.
    pub date: NaiveDate,
    /// Capture time, used only for recency ordering.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

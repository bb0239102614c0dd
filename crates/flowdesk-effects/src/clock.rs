use chrono::{DateTime, Utc};

use flowdesk_core::traits::Clock;

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

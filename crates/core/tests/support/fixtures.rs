use chrono::{DateTime, TimeZone, Utc};
use roomsync_domain::{ItemAttributes, ItemIdentity, ItemRecord, TimeWindow};

pub const ROOM: &str = "room.4a@example.com";

/// 2025-06-02 at `hour:min` UTC.
pub fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap()
}

pub fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
    TimeWindow::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
}

pub fn item(id: &str, key: &str, start: (u32, u32), end: (u32, u32)) -> ItemRecord {
    ItemRecord::new(
        ItemIdentity::new(id, key),
        at(start.0, start.1),
        at(end.0, end.1),
        ItemAttributes { subject: format!("Meeting {id}"), ..Default::default() },
    )
    .unwrap()
}

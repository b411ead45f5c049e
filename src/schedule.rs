use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::model::{Ms, Slot};

// ── Schedule Generator ────────────────────────────────────────────

/// Produce the ordered, contiguous slot sequence covering `[day_start, day_end)`.
///
/// Pure and deterministic. Callers validate the window before invoking;
/// a slot duration that does not evenly divide the window drops the
/// trailing partial slot rather than emitting a short one.
pub fn generate(day_start: Ms, day_end: Ms, slot_ms: Ms) -> Vec<Slot> {
    debug_assert!(day_start < day_end, "day window must be non-empty");
    debug_assert!(slot_ms > 0, "slot duration must be positive");

    let mut slots = Vec::with_capacity(((day_end - day_start) / slot_ms) as usize);
    let mut cursor = day_start;
    while cursor + slot_ms <= day_end {
        slots.push(Slot::new(cursor, cursor + slot_ms));
        cursor += slot_ms;
    }
    slots
}

// ── Wall-clock edges ──────────────────────────────────────────────

/// Resolve a local wall-clock window on `date` in `tz` to epoch milliseconds.
///
/// Returns `None` when a boundary does not exist in local time (DST gap);
/// ambiguous boundaries (DST overlap) resolve to the earlier instant.
pub fn local_day_window(
    tz: Tz,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Option<(Ms, Ms)> {
    let day_start = tz.from_local_datetime(&date.and_time(start)).earliest()?;
    let day_end = tz.from_local_datetime(&date.and_time(end)).earliest()?;
    Some((day_start.timestamp_millis(), day_end.timestamp_millis()))
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> Ms {
    chrono::Utc::now().timestamp_millis()
}

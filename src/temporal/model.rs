use chrono::Duration;

/// Classification of the gap since a persona's last invocation (§3:
/// Temporal State `last_active`, `invocation_count`, `last_topic`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapClass {
    SameSession,
    SameDay,
    FewDays,
    Weeks,
    LongAbsence,
}

impl GapClass {
    pub fn as_str(self) -> &'static str {
        match self {
            GapClass::SameSession => "same_session",
            GapClass::SameDay => "same_day",
            GapClass::FewDays => "few_days",
            GapClass::Weeks => "weeks",
            GapClass::LongAbsence => "long_absence",
        }
    }
}

/// Classify the elapsed gap since `last_active` (§3). A gap under five
/// minutes is treated as a continuation of the same session and
/// produces no reflection (`None`).
pub fn classify_gap(elapsed: Duration) -> Option<GapClass> {
    if elapsed < Duration::minutes(5) {
        return None;
    }
    if elapsed < Duration::hours(20) {
        Some(GapClass::SameDay)
    } else if elapsed < Duration::days(7) {
        Some(GapClass::FewDays)
    } else if elapsed < Duration::days(30) {
        Some(GapClass::Weeks)
    } else {
        Some(GapClass::LongAbsence)
    }
}

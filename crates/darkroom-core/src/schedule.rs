//! Pure scheduling helpers: deadline arithmetic and venue availability.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::constants::{DELIVERY_DEADLINE_DAYS, SELECTION_DEADLINE_DAYS};

/// ## Summary
/// Adds a whole number of calendar days to `base`. Saturates at the calendar bounds.
#[must_use]
pub fn offset_date(base: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        base.checked_add_days(magnitude)
    } else {
        base.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(if days >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}

/// Last day the client may submit their photo selection.
#[must_use]
pub fn selection_deadline(shoot_date: NaiveDate) -> NaiveDate {
    offset_date(shoot_date, SELECTION_DEADLINE_DAYS)
}

/// Last day the finished work may be delivered.
#[must_use]
pub fn delivery_deadline(selection_confirmed: NaiveDate) -> NaiveDate {
    offset_date(selection_confirmed, DELIVERY_DEADLINE_DAYS)
}

/// How much of the venue a booking occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalType {
    /// The whole venue for the whole day.
    Full,
    /// Only the booked time range.
    #[default]
    Partial,
}

/// A booking's footprint on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub booking_id: String,
    pub date: NaiveDate,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub rental_type: RentalType,
}

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub has_conflict: bool,
    /// `Full` when any conflicting booking rents the whole venue.
    pub conflict_type: Option<RentalType>,
    pub conflicting_booking_ids: Vec<String>,
}

impl Slot {
    /// ## Summary
    /// Half-open overlap of two time windows on the same day. A slot without a
    /// complete window is treated as occupying the whole day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.date != other.date {
            return false;
        }
        match (self.start, self.end, other.start, other.end) {
            (Some(s1), Some(e1), Some(s2), Some(e2)) => s1 < e2 && s2 < e1,
            _ => true,
        }
    }

    /// ## Summary
    /// Whether the two bookings cannot share the venue.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        if self.date != other.date || self.booking_id == other.booking_id {
            return false;
        }
        self.rental_type == RentalType::Full
            || other.rental_type == RentalType::Full
            || self.overlaps(other)
    }
}

/// ## Summary
/// Checks a proposed slot against the other bookings of the studio.
///
/// Callers pass only live bookings; the proposed booking itself is skipped by id.
#[must_use]
pub fn check_availability<'a, I>(proposed: &Slot, others: I) -> Availability
where
    I: IntoIterator<Item = &'a Slot>,
{
    let mut availability = Availability::default();
    for other in others {
        if !proposed.conflicts_with(other) {
            continue;
        }
        availability.has_conflict = true;
        availability.conflicting_booking_ids.push(other.booking_id.clone());
        if other.rental_type == RentalType::Full {
            availability.conflict_type = Some(RentalType::Full);
        } else if availability.conflict_type.is_none() {
            availability.conflict_type = Some(RentalType::Partial);
        }
    }
    availability
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn slot(id: &str, start: u32, end: u32, rental_type: RentalType) -> Slot {
        Slot {
            booking_id: id.to_string(),
            date: date(2026, 5, 4),
            start: Some(time(start, 0)),
            end: Some(time(end, 0)),
            rental_type,
        }
    }

    #[test]
    fn test_deadlines_match_reference_dates() {
        assert_eq!(selection_deadline(date(2026, 1, 1)), date(2026, 3, 2));
        assert_eq!(delivery_deadline(date(2026, 1, 10)), date(2026, 3, 11));
    }

    #[test]
    fn test_deadlines_across_leap_february() {
        assert_eq!(selection_deadline(date(2028, 1, 15)), date(2028, 3, 15));
        assert_eq!(delivery_deadline(date(2027, 12, 31)), date(2028, 2, 29));
    }

    #[test]
    fn test_negative_offset() {
        assert_eq!(offset_date(date(2026, 3, 2), -60), date(2026, 1, 1));
    }

    #[test]
    fn test_half_open_windows_touching_do_not_conflict() {
        let proposed = slot("new", 12, 14, RentalType::Partial);
        let others = [slot("a", 10, 12, RentalType::Partial), slot("b", 14, 16, RentalType::Partial)];

        let availability = check_availability(&proposed, &others);
        assert!(!availability.has_conflict);
        assert!(availability.conflict_type.is_none());
    }

    #[test]
    fn test_overlapping_partial_conflicts() {
        let proposed = slot("new", 11, 13, RentalType::Partial);
        let others = [slot("a", 10, 12, RentalType::Partial)];

        let availability = check_availability(&proposed, &others);
        assert!(availability.has_conflict);
        assert_eq!(availability.conflict_type, Some(RentalType::Partial));
        assert_eq!(availability.conflicting_booking_ids, vec!["a".to_string()]);
    }

    #[test]
    fn test_full_rental_conflicts_with_whole_day() {
        let proposed = slot("new", 15, 17, RentalType::Partial);
        let others = [slot("full", 9, 10, RentalType::Full)];

        let availability = check_availability(&proposed, &others);
        assert!(availability.has_conflict);
        assert_eq!(availability.conflict_type, Some(RentalType::Full));
    }

    #[test]
    fn test_other_days_and_self_are_ignored() {
        let proposed = slot("same", 10, 12, RentalType::Full);
        let mut other_day = slot("other", 10, 12, RentalType::Full);
        other_day.date = date(2026, 5, 5);
        let others = [slot("same", 10, 12, RentalType::Partial), other_day];

        assert!(!check_availability(&proposed, &others).has_conflict);
    }

    #[test]
    fn test_missing_window_occupies_day() {
        let proposed = slot("new", 10, 11, RentalType::Partial);
        let mut open = slot("open", 18, 19, RentalType::Partial);
        open.start = None;

        assert!(check_availability(&proposed, &[open]).has_conflict);
    }
}

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;

use crate::engine::rounding::round2;
use crate::model::attendance::PunchEvent;

/// First and last punch of a day. `kind` labels are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PunchPair {
    pub in_time: Option<NaiveDateTime>,
    pub out_time: Option<NaiveDateTime>,
}

impl PunchPair {
    pub fn from_times<I>(times: I) -> Self
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        times.into_iter().fold(Self::default(), |pair, t| Self {
            in_time: Some(pair.in_time.map_or(t, |cur| cur.min(t))),
            out_time: Some(pair.out_time.map_or(t, |cur| cur.max(t))),
        })
    }

    /// Aggregate one day's punches, dropping the midnight sentinel.
    pub fn aggregate<'a, I>(punches: I) -> Self
    where
        I: IntoIterator<Item = &'a PunchEvent>,
    {
        Self::from_times(
            punches
                .into_iter()
                .filter(|p| !p.is_sentinel())
                .map(|p| p.punch_time),
        )
    }

    pub fn worked(&self) -> Duration {
        match (self.in_time, self.out_time) {
            (Some(i), Some(o)) => o - i,
            _ => Duration::zero(),
        }
    }

    /// Worked time in hours, two places.
    pub fn hours(&self) -> Decimal {
        round2(Decimal::from(self.worked().num_seconds()) / Decimal::from(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::PunchKind;
    use crate::model::employee::EmpId;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn punch(h: u32, m: u32, kind: Option<PunchKind>) -> PunchEvent {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        PunchEvent {
            id: 0,
            empid: EmpId::parse("1001").unwrap(),
            punch_date: date,
            punch_time: date.and_hms_opt(h, m, 0).unwrap(),
            kind,
            location: None,
            image_ref: None,
        }
    }

    #[test]
    fn empty_day_has_no_pair() {
        let pair = PunchPair::aggregate(&Vec::<PunchEvent>::new());
        assert_eq!(pair, PunchPair::default());
        assert_eq!(pair.hours(), dec!(0));
    }

    #[test]
    fn single_punch_is_both_ends() {
        let events = [punch(9, 30, Some(PunchKind::In))];
        let pair = PunchPair::aggregate(&events);
        assert_eq!(pair.in_time, pair.out_time);
        assert_eq!(pair.hours(), dec!(0));
    }

    #[test]
    fn min_and_max_regardless_of_order() {
        let events = [
            punch(13, 0, Some(PunchKind::Out)),
            punch(18, 45, Some(PunchKind::In)),
            punch(9, 15, Some(PunchKind::Out)),
        ];
        let pair = PunchPair::aggregate(&events);
        assert_eq!(pair.in_time.unwrap().time().to_string(), "09:15:00");
        assert_eq!(pair.out_time.unwrap().time().to_string(), "18:45:00");
        assert_eq!(pair.hours(), dec!(9.5));
    }

    #[test]
    fn kind_labels_do_not_matter() {
        let labelled = [punch(9, 0, Some(PunchKind::In)), punch(17, 20, Some(PunchKind::Out))];
        let swapped = [punch(9, 0, Some(PunchKind::Out)), punch(17, 20, Some(PunchKind::In))];
        let unlabelled = [punch(17, 20, None), punch(9, 0, None)];
        let a = PunchPair::aggregate(&labelled);
        assert_eq!(a, PunchPair::aggregate(&swapped));
        assert_eq!(a, PunchPair::aggregate(&unlabelled));
        assert_eq!(a.hours(), dec!(8.33));
    }

    #[test]
    fn midnight_sentinel_is_dropped() {
        let events = [punch(0, 0, None), punch(10, 0, None), punch(14, 0, None)];
        let pair = PunchPair::aggregate(&events);
        assert_eq!(pair.in_time.unwrap().time().to_string(), "10:00:00");
        assert_eq!(pair.hours(), dec!(4));
    }
}

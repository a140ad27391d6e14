use chrono::NaiveDate;

/// Anything covering an inclusive range of Gregorian days.
pub trait GregorianSpan {
    fn gregorian_start(&self) -> NaiveDate;
    fn gregorian_end(&self) -> NaiveDate;

    fn covers(&self, date: NaiveDate) -> bool {
        self.gregorian_start() <= date && date <= self.gregorian_end()
    }
}

/// Pick the month for `date`.
///
/// A month whose range contains the date wins outright. Otherwise the closest
/// month is chosen by comparing the days until the next month starts with the
/// days since the previous month ended; the later month wins ties. Returns
/// `None` only when `months` is empty.
pub fn resolve_month<T: GregorianSpan>(months: &[T], date: NaiveDate) -> Option<&T> {
    if let Some(month) = months.iter().find(|m| m.covers(date)) {
        return Some(month);
    }

    let upcoming = months
        .iter()
        .filter(|m| m.gregorian_start() > date)
        .min_by_key(|m| m.gregorian_start());
    let previous = months
        .iter()
        .filter(|m| m.gregorian_end() < date)
        .max_by_key(|m| m.gregorian_end());

    match (previous, upcoming) {
        (Some(past), Some(future)) => {
            let days_since = (date - past.gregorian_end()).num_days();
            let days_until = (future.gregorian_start() - date).num_days();
            if days_since < days_until {
                Some(past)
            } else {
                Some(future)
            }
        }
        (past, future) => future.or(past),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Month {
        name: &'static str,
        start: NaiveDate,
        end: NaiveDate,
    }

    impl GregorianSpan for Month {
        fn gregorian_start(&self) -> NaiveDate {
            self.start
        }
        fn gregorian_end(&self) -> NaiveDate {
            self.end
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn seeded() -> Vec<Month> {
        vec![
            Month { name: "Shaban", start: d(2025, 1, 31), end: d(2025, 3, 1) },
            Month { name: "Ramadan", start: d(2025, 3, 2), end: d(2025, 3, 30) },
            // Shawwal deliberately missing
            Month { name: "Dhul Qadah", start: d(2025, 4, 29), end: d(2025, 5, 28) },
        ]
    }

    fn name_for(months: &[Month], date: NaiveDate) -> Option<&'static str> {
        resolve_month(months, date).map(|m| m.name)
    }

    #[test]
    fn containing_month_inclusive_bounds() {
        let months = seeded();
        assert_eq!(name_for(&months, d(2025, 3, 2)), Some("Ramadan"));
        assert_eq!(name_for(&months, d(2025, 3, 30)), Some("Ramadan"));
        assert_eq!(name_for(&months, d(2025, 3, 1)), Some("Shaban"));
    }

    #[test]
    fn gap_picks_closest() {
        let months = seeded();
        // 3 days after Ramadan ended, 27 before Dhul Qadah
        assert_eq!(name_for(&months, d(2025, 4, 2)), Some("Ramadan"));
        // 26 days after, 4 before
        assert_eq!(name_for(&months, d(2025, 4, 25)), Some("Dhul Qadah"));
    }

    #[test]
    fn tie_goes_to_future() {
        let months = seeded();
        // Ramadan ends 03-30, Dhul Qadah starts 04-29: 04-14 is 15 days from each.
        assert_eq!(name_for(&months, d(2025, 4, 14)), Some("Dhul Qadah"));
        assert_eq!(name_for(&months, d(2025, 4, 13)), Some("Ramadan"));
    }

    #[test]
    fn one_sided() {
        let months = seeded();
        assert_eq!(name_for(&months, d(2024, 6, 1)), Some("Shaban"));
        assert_eq!(name_for(&months, d(2026, 6, 1)), Some("Dhul Qadah"));
    }

    #[test]
    fn empty() {
        assert_eq!(name_for(&[], d(2025, 3, 10)), None);
    }
}

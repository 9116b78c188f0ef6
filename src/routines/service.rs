use time::{macros::format_description, Date};
use tracing::warn;

use crate::{
    error::ApiError,
    routines::dto::MonthlyGroup,
    routines::repo::Routine,
};

/// Canonical stored format for routine dates.
const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

pub fn parse_date(raw: &str) -> Result<Date, ApiError> {
    Date::parse(raw, DATE_FORMAT)
        .map_err(|_| ApiError::Validation("date must be an ISO date (YYYY-MM-DD)".into()))
}

/// Long weekday name for a calendar date, e.g. "Monday".
pub fn long_weekday(date: Date) -> String {
    date.weekday().to_string()
}

/// Group routines by (year, month) of their stored date. Buckets keep the
/// order of first occurrence; routines with the same key merge into one
/// bucket. Dates are validated at save time, so a parse failure here means
/// the row predates the canonical format and is skipped.
pub fn group_by_month(routines: Vec<Routine>) -> Vec<MonthlyGroup> {
    let mut groups: Vec<MonthlyGroup> = Vec::new();
    for routine in routines {
        let date = match parse_date(&routine.date) {
            Ok(d) => d,
            Err(_) => {
                warn!(routine_id = %routine.id, date = %routine.date, "unparseable routine date");
                continue;
            }
        };
        let (year, month) = (date.year(), date.month() as u8);
        match groups.iter_mut().find(|g| g.year == year && g.month == month) {
            Some(group) => group.routines.push(routine),
            None => groups.push(MonthlyGroup {
                month,
                year,
                routines: vec![routine],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn routine(date: &str) -> Routine {
        Routine {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            duration: "30 min".into(),
            routine_type: "Cardio".into(),
            level: "Beginner".into(),
            date: date.into(),
            weekday: "Monday".into(),
            exercises: vec!["Run".into()],
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn parse_date_accepts_iso() {
        let date = parse_date("2026-02-14").expect("parse");
        assert_eq!(date.year(), 2026);
        assert_eq!(date.month() as u8, 2);
        assert_eq!(date.day(), 14);
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert!(parse_date("Friday, June 6, 2025").is_err());
        assert!(parse_date("06/14/2026").is_err());
        assert!(parse_date("2026-13-01").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn long_weekday_names() {
        assert_eq!(long_weekday(parse_date("2026-08-31").unwrap()), "Monday");
        assert_eq!(long_weekday(parse_date("2026-09-06").unwrap()), "Sunday");
    }

    #[test]
    fn grouping_splits_months_of_same_year() {
        let routines = vec![
            routine("2026-01-05"),
            routine("2026-02-10"),
            routine("2026-01-20"),
        ];
        let groups = group_by_month(routines);
        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].year, groups[0].month), (2026, 1));
        assert_eq!(groups[0].routines.len(), 2);
        assert_eq!((groups[1].year, groups[1].month), (2026, 2));
        assert_eq!(groups[1].routines.len(), 1);
    }

    #[test]
    fn grouping_separates_same_month_of_different_years() {
        let groups = group_by_month(vec![routine("2025-03-01"), routine("2026-03-01")]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn bucket_order_is_first_occurrence() {
        let groups = group_by_month(vec![
            routine("2026-04-01"),
            routine("2026-01-01"),
            routine("2026-04-15"),
        ]);
        assert_eq!(groups[0].month, 4);
        assert_eq!(groups[1].month, 1);
    }

    #[test]
    fn unparseable_dates_are_skipped() {
        let groups = group_by_month(vec![routine("garbage"), routine("2026-05-01")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].month, 5);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_month(Vec::new()).is_empty());
    }
}

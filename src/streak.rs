use chrono::{DateTime, Local, NaiveDate};

use crate::models::LearnedSkill;

// Current consecutive-day learning streak. A day counts if it has at least
// one completion; the chain must end today or yesterday or the streak is 0.
pub fn current_streak(completions: &[LearnedSkill], today: NaiveDate) -> u32 {
    let dates: Vec<NaiveDate> = completions
        .iter()
        .filter_map(|c| local_date(&c.learned_at))
        .collect();
    streak_from_dates(&dates, today)
}

// Calendar-day bucket for a stored timestamp, in the evaluator's local
// timezone. Unparseable timestamps are skipped rather than counted.
fn local_date(timestamp: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Local).date_naive())
}

pub fn streak_from_dates(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = dates.to_vec();
    days.sort_unstable();
    days.dedup();

    let Some(&latest) = days.last() else {
        return 0;
    };

    let yesterday = today.pred_opt().unwrap_or(today);
    if latest != today && latest != yesterday {
        return 0;
    }

    // Walk backwards from the most recent day, counting exact one-day steps.
    let mut count = 1u32;
    for pair in days.windows(2).rev() {
        if pair[0].succ_opt() == Some(pair[1]) {
            count += 1;
        } else {
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days_before(today: NaiveDate, n: i64) -> NaiveDate {
        today - Duration::days(n)
    }

    mod date_walk_tests {
        use super::*;

        fn today() -> NaiveDate {
            date(2024, 1, 3)
        }

        #[test]
        fn empty_set_is_zero() {
            assert_eq!(streak_from_dates(&[], today()), 0);
        }

        #[test]
        fn single_completion_today() {
            assert_eq!(streak_from_dates(&[today()], today()), 1);
        }

        #[test]
        fn single_completion_yesterday() {
            assert_eq!(streak_from_dates(&[days_before(today(), 1)], today()), 1);
        }

        #[test]
        fn today_and_yesterday() {
            let dates = [today(), days_before(today(), 1)];
            assert_eq!(streak_from_dates(&dates, today()), 2);
        }

        #[test]
        fn gap_breaks_the_chain() {
            // today, yesterday, then a jump to 3 days ago
            let dates = [today(), days_before(today(), 1), days_before(today(), 3)];
            assert_eq!(streak_from_dates(&dates, today()), 2);
        }

        #[test]
        fn lapsed_streak_is_zero() {
            // most recent activity two days ago: streak has lapsed
            let dates = [days_before(today(), 2), days_before(today(), 3)];
            assert_eq!(streak_from_dates(&dates, today()), 0);
        }

        #[test]
        fn invariant_under_reordering_and_duplicates() {
            let a = [today(), days_before(today(), 1), days_before(today(), 2)];
            let b = [
                days_before(today(), 2),
                today(),
                today(),
                days_before(today(), 1),
                days_before(today(), 1),
            ];
            assert_eq!(streak_from_dates(&a, today()), 3);
            assert_eq!(streak_from_dates(&b, today()), 3);
        }

        #[test]
        fn only_current_run_counts() {
            // 5-day history with a hole: only the run ending today counts
            let dates = [
                today(),
                days_before(today(), 1),
                days_before(today(), 3),
                days_before(today(), 4),
                days_before(today(), 5),
            ];
            assert_eq!(streak_from_dates(&dates, today()), 2);
        }

        #[test]
        fn three_consecutive_days_in_january() {
            let dates = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
            assert_eq!(streak_from_dates(&dates, date(2024, 1, 3)), 3);
        }

        #[test]
        fn chain_across_month_boundary() {
            let dates = [date(2024, 1, 31), date(2024, 2, 1), date(2024, 2, 2)];
            assert_eq!(streak_from_dates(&dates, date(2024, 2, 2)), 3);
        }
    }

    mod record_projection_tests {
        use super::*;

        fn record(skill_id: i64, learned_at: String) -> LearnedSkill {
            LearnedSkill {
                skill_id,
                skill_title: format!("Skill {}", skill_id),
                category_title: "Test".to_string(),
                learned_at,
            }
        }

        // Noon local time avoids DST edges in the fixtures.
        fn local_noon(d: NaiveDate) -> String {
            Local
                .from_local_datetime(&d.and_hms_opt(12, 0, 0).unwrap())
                .unwrap()
                .to_rfc3339()
        }

        #[test]
        fn empty_history_is_zero() {
            let today = Local::now().date_naive();
            assert_eq!(current_streak(&[], today), 0);
        }

        #[test]
        fn multiple_completions_same_day_count_once() {
            let today = Local::now().date_naive();
            let records = vec![
                record(1, local_noon(today)),
                record(2, local_noon(today)),
                record(3, local_noon(today)),
            ];
            assert_eq!(current_streak(&records, today), 1);
        }

        #[test]
        fn consecutive_days_accumulate() {
            let today = Local::now().date_naive();
            let records = vec![
                record(1, local_noon(today)),
                record(2, local_noon(days_before(today, 1))),
                record(3, local_noon(days_before(today, 2))),
            ];
            assert_eq!(current_streak(&records, today), 3);
        }

        #[test]
        fn unparseable_timestamps_are_skipped() {
            let today = Local::now().date_naive();
            let records = vec![
                record(1, local_noon(today)),
                record(2, "not-a-timestamp".to_string()),
            ];
            assert_eq!(current_streak(&records, today), 1);
        }

        #[test]
        fn garbage_only_history_is_zero_not_an_error() {
            let today = Local::now().date_naive();
            let records = vec![record(1, String::new()), record(2, "???".to_string())];
            assert_eq!(current_streak(&records, today), 0);
        }
    }
}

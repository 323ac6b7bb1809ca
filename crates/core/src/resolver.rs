use crate::record::{Candidate, CandidateSet};
use anyhow::{bail, Result};
use chrono::{NaiveDateTime, TimeDelta};

/// 複数の日時候補からどれを採用するかの方針。CLI の 0〜5 に対応する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Earliest,
    Latest,
    SimpleFirst,
    DigitizedFirst,
    OriginalThenSimple,
    OriginalThenDigitized,
}

impl Priority {
    pub fn from_index(index: u8) -> Result<Self> {
        Ok(match index {
            0 => Self::Earliest,
            1 => Self::Latest,
            2 => Self::SimpleFirst,
            3 => Self::DigitizedFirst,
            4 => Self::OriginalThenSimple,
            5 => Self::OriginalThenDigitized,
            other => bail!("priority には 0〜5 を指定してください: {other}"),
        })
    }
}

/// 採用可能な日時の範囲。両端を含む。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub min: NaiveDateTime,
    pub max: NaiveDateTime,
}

impl DateWindow {
    pub fn new(min: NaiveDateTime, max: NaiveDateTime) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, datetime: NaiveDateTime) -> bool {
        datetime >= self.min && datetime <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted {
        datetime: NaiveDateTime,
        offset: Option<TimeDelta>,
    },
    /// 候補はあるがすべて範囲外。カメラの日時設定が狂っている兆候。
    RejectedOutOfRange,
    /// 日時メタデータ自体がない。
    Absent,
}

pub fn resolve(set: &CandidateSet, priority: Priority, window: &DateWindow) -> Resolution {
    let chosen = match priority {
        Priority::Earliest => extremum(set, window, |candidate, best| candidate <= best),
        Priority::Latest => extremum(set, window, |candidate, best| candidate >= best),
        Priority::SimpleFirst => {
            first_in_window(&[set.simple, set.original, set.digitized], window)
        }
        Priority::DigitizedFirst => {
            first_in_window(&[set.digitized, set.original, set.simple], window)
        }
        Priority::OriginalThenSimple => {
            first_in_window(&[set.original, set.simple, set.digitized], window)
        }
        Priority::OriginalThenDigitized => {
            first_in_window(&[set.original, set.digitized, set.simple], window)
        }
    };

    match chosen {
        Some(candidate) => Resolution::Accepted {
            datetime: candidate.datetime,
            offset: backfill_offset(candidate, set),
        },
        None if set.is_empty() => Resolution::Absent,
        None => Resolution::RejectedOutOfRange,
    }
}

fn extremum(
    set: &CandidateSet,
    window: &DateWindow,
    replaces: impl Fn(NaiveDateTime, NaiveDateTime) -> bool,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in [set.simple, set.original, set.digitized].into_iter().flatten() {
        if !window.contains(candidate.datetime) {
            continue;
        }
        match best {
            Some(current) if !replaces(candidate.datetime, current.datetime) => {}
            _ => best = Some(candidate),
        }
    }
    best
}

fn first_in_window(ordered: &[Option<Candidate>], window: &DateWindow) -> Option<Candidate> {
    ordered
        .iter()
        .flatten()
        .copied()
        .find(|candidate| window.contains(candidate.datetime))
}

/// 採用候補にオフセットが無いとき、同一時刻の別フィールドから引き継ぐ。
fn backfill_offset(chosen: Candidate, set: &CandidateSet) -> Option<TimeDelta> {
    if chosen.offset.is_some() {
        return chosen.offset;
    }
    [set.simple, set.original, set.digitized]
        .into_iter()
        .flatten()
        .filter(|other| other.datetime == chosen.datetime)
        .find_map(|other| other.offset)
}

#[cfg(test)]
mod tests {
    use super::{resolve, DateWindow, Priority, Resolution};
    use crate::record::{Candidate, CandidateSet};
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(at(1, 0), at(30, 0))
    }

    fn candidate(datetime: NaiveDateTime) -> Option<Candidate> {
        Some(Candidate {
            datetime,
            offset: None,
        })
    }

    #[test]
    fn earliest_picks_minimum_across_fields() {
        let set = CandidateSet {
            simple: candidate(at(10, 12)),
            original: candidate(at(5, 8)),
            digitized: candidate(at(20, 0)),
        };
        match resolve(&set, Priority::Earliest, &window()) {
            Resolution::Accepted { datetime, .. } => assert_eq!(datetime, at(5, 8)),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn latest_picks_maximum_across_fields() {
        let set = CandidateSet {
            simple: candidate(at(10, 12)),
            original: candidate(at(5, 8)),
            digitized: candidate(at(20, 0)),
        };
        match resolve(&set, Priority::Latest, &window()) {
            Resolution::Accepted { datetime, .. } => assert_eq!(datetime, at(20, 0)),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn earliest_ignores_out_of_window_fields() {
        let set = CandidateSet {
            simple: candidate(at(1, 0) - TimeDelta::days(400)),
            original: candidate(at(5, 8)),
            digitized: None,
        };
        match resolve(&set, Priority::Earliest, &window()) {
            Resolution::Accepted { datetime, .. } => assert_eq!(datetime, at(5, 8)),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn fixed_order_falls_through_missing_fields() {
        let set = CandidateSet {
            simple: None,
            original: None,
            digitized: candidate(at(7, 7)),
        };
        match resolve(&set, Priority::OriginalThenSimple, &window()) {
            Resolution::Accepted { datetime, .. } => assert_eq!(datetime, at(7, 7)),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn fixed_order_prefers_its_first_field() {
        let set = CandidateSet {
            simple: candidate(at(10, 0)),
            original: candidate(at(5, 0)),
            digitized: candidate(at(20, 0)),
        };
        match resolve(&set, Priority::DigitizedFirst, &window()) {
            Resolution::Accepted { datetime, .. } => assert_eq!(datetime, at(20, 0)),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn empty_set_is_absent() {
        let set = CandidateSet::default();
        assert_eq!(
            resolve(&set, Priority::Earliest, &window()),
            Resolution::Absent
        );
    }

    #[test]
    fn all_out_of_window_is_rejected() {
        let set = CandidateSet {
            simple: candidate(at(1, 0) - TimeDelta::days(4000)),
            original: None,
            digitized: None,
        };
        assert_eq!(
            resolve(&set, Priority::Earliest, &window()),
            Resolution::RejectedOutOfRange
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let set = CandidateSet {
            simple: candidate(at(30, 0)),
            original: None,
            digitized: None,
        };
        match resolve(&set, Priority::Earliest, &window()) {
            Resolution::Accepted { datetime, .. } => assert_eq!(datetime, at(30, 0)),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn offset_backfills_from_equal_timestamp() {
        let zone = TimeDelta::hours(9);
        let set = CandidateSet {
            simple: candidate(at(5, 8)),
            original: Some(Candidate {
                datetime: at(5, 8),
                offset: Some(zone),
            }),
            digitized: None,
        };
        match resolve(&set, Priority::SimpleFirst, &window()) {
            Resolution::Accepted { offset, .. } => assert_eq!(offset, Some(zone)),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn offset_does_not_backfill_from_different_timestamp() {
        let set = CandidateSet {
            simple: candidate(at(5, 8)),
            original: Some(Candidate {
                datetime: at(5, 9),
                offset: Some(TimeDelta::hours(9)),
            }),
            digitized: None,
        };
        match resolve(&set, Priority::SimpleFirst, &window()) {
            Resolution::Accepted { offset, .. } => assert_eq!(offset, None),
            other => panic!("採用を期待: {other:?}"),
        }
    }

    #[test]
    fn priority_index_is_validated() {
        assert!(Priority::from_index(5).is_ok());
        assert!(Priority::from_index(6).is_err());
    }
}

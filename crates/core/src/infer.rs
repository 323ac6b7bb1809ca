use crate::record::{format_offset, RenameEntry};
use chrono::{NaiveDateTime, TimeDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// ビデオが無い、または参照できる写真がそもそも無い。
    NotNeeded,
    /// 写真の時間帯が一種類だったので、全ビデオに適用した。
    AppliedUniform(TimeDelta),
    /// 写真の時間帯が複数。ビデオごとに撮影時刻が最も近い写真の時間帯を使った。
    AppliedNearest,
    /// ビデオも写真もあるが、時間帯の判る写真が無い。
    NoReference,
}

/// 設定ルールが無いバッチで、写真のオフセットからビデオの時間帯を推定する。
/// ビデオの日時は UTC に戻してから推定オフセットを足し直す。
pub fn infer_video_timezones(
    entries: &mut [RenameEntry],
    notes: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> InferenceOutcome {
    if !entries.iter().any(|e| e.is_video) {
        return InferenceOutcome::NotNeeded;
    }

    let mut distinct: Vec<TimeDelta> = Vec::new();
    for entry in entries.iter() {
        if entry.is_video {
            continue;
        }
        let Some(offset) = entry.offset else { continue };
        if offset == TimeDelta::zero() {
            continue;
        }
        if !distinct.contains(&offset) {
            distinct.push(offset);
        }
    }

    match distinct.len() {
        1 => {
            let zone = distinct[0];
            notes.push(format!(
                "写真の時間帯 {} をビデオにも適用します",
                format_offset(zone)
            ));
            for entry in entries.iter_mut().filter(|e| e.is_video) {
                let claimed = entry.offset.unwrap_or_else(TimeDelta::zero);
                entry.datetime = entry.datetime + zone - claimed;
                entry.offset = Some(zone);
            }
            InferenceOutcome::AppliedUniform(zone)
        }
        0 => {
            if entries.iter().all(|e| e.is_video) {
                return InferenceOutcome::NotNeeded;
            }
            warnings.push(
                "時間帯の判る写真が無いため、ビデオの時刻は補正されません".to_string(),
            );
            InferenceOutcome::NoReference
        }
        _ => {
            apply_nearest(entries);
            notes.push("写真の時間帯が複数あるため、ビデオごとに最も近い写真の時間帯を使います".to_string());
            InferenceOutcome::AppliedNearest
        }
    }
}

fn apply_nearest(entries: &mut [RenameEntry]) {
    let mut index: Vec<(NaiveDateTime, TimeDelta)> = entries
        .iter()
        .filter(|e| !e.is_video)
        .filter_map(|e| e.offset.map(|offset| (e.datetime - offset, offset)))
        .collect();
    index.sort_by_key(|(utc, _)| *utc);

    for entry in entries.iter_mut().filter(|e| e.is_video) {
        let utc = entry.datetime - entry.offset.unwrap_or_else(TimeDelta::zero);
        let Some(offset) = nearest_offset(&index, utc) else {
            continue;
        };
        entry.datetime = utc + offset;
        entry.offset = Some(offset);
    }
}

fn nearest_offset(index: &[(NaiveDateTime, TimeDelta)], target: NaiveDateTime) -> Option<TimeDelta> {
    if index.is_empty() {
        return None;
    }
    let upper = index.partition_point(|(utc, _)| *utc <= target);
    if upper == 0 {
        return Some(index[0].1);
    }
    if upper == index.len() {
        return Some(index[index.len() - 1].1);
    }
    let lower = upper - 1;
    let to_lower = target - index[lower].0;
    let to_upper = index[upper].0 - target;
    // 等距離なら早い方
    if to_lower <= to_upper {
        Some(index[lower].1)
    } else {
        Some(index[upper].1)
    }
}

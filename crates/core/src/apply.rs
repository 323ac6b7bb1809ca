use crate::record::RenameEntry;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, TimeZone, Timelike};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApplyResult {
    pub renamed: usize,
}

/// バッチ内の表示・適用順。日時、オフセット (不明が先)、元名、新名。
pub fn sort_entries(entries: &mut [RenameEntry]) {
    entries.sort_by(|a, b| {
        a.datetime
            .cmp(&b.datetime)
            .then(a.offset.cmp(&b.offset))
            .then_with(|| a.original_name.cmp(&b.original_name))
            .then_with(|| a.final_name.cmp(&b.final_name))
    });
}

/// 二段階コミット。まず全ファイルを一時名へ、次に一時名から最終名へ。
/// 一時名を経由するので「A→B、B→A」のような入れ替えでも衝突しない。
/// どこで失敗しても単一のロールバックスタックを逆順に巻き戻す。
pub fn apply_batch(directory: &Path, entries: &[RenameEntry]) -> Result<ApplyResult> {
    let mut rollback: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(entries.len() * 2);

    for entry in entries {
        let src = directory.join(&entry.original_name);
        let dst = directory.join(&entry.temp_name);
        if let Err(err) = fs::rename(&src, &dst) {
            let cause = anyhow::Error::from(err).context(format!(
                "一時名への変更に失敗しました: {} -> {}",
                src.display(),
                dst.display()
            ));
            return Err(unwind(rollback, cause));
        }
        rollback.push((dst, src));
    }

    for entry in entries {
        let src = directory.join(&entry.temp_name);
        let dst = directory.join(&entry.final_name);
        if let Err(err) = finalize_entry(&src, &dst, entry.datetime) {
            let cause = err.context(format!(
                "最終名への変更に失敗しました: {} -> {}",
                src.display(),
                dst.display()
            ));
            return Err(unwind(rollback, cause));
        }
        rollback.push((dst, src));
    }

    Ok(ApplyResult {
        renamed: entries.len(),
    })
}

fn finalize_entry(src: &Path, dst: &Path, datetime: NaiveDateTime) -> Result<()> {
    fs::rename(src, dst)?;
    let stamp = FileTime::from_unix_time(local_timestamp(datetime), datetime.nanosecond());
    filetime::set_file_times(dst, stamp, stamp)?;
    Ok(())
}

/// 解決済みの日時はローカル時刻として保存する。DST の切り替えで
/// 存在しない時刻になった場合だけ UTC 扱いに落とす。
fn local_timestamp(datetime: NaiveDateTime) -> i64 {
    match Local.from_local_datetime(&datetime).earliest() {
        Some(local) => local.timestamp(),
        None => datetime.and_utc().timestamp(),
    }
}

fn unwind(rollback: Vec<(PathBuf, PathBuf)>, cause: anyhow::Error) -> anyhow::Error {
    for (current, previous) in rollback.into_iter().rev() {
        if let Err(err) = fs::rename(&current, &previous) {
            return cause.context(format!(
                "ロールバックにも失敗しました: {} -> {} ({err})",
                current.display(),
                previous.display()
            ));
        }
    }
    cause.context("エラーのため全ファイルを元の名前に戻しました")
}

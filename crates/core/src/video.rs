use crate::extract::VideoMeta;
use crate::record::Candidate;
use crate::rules::TimezoneRules;
use anyhow::{bail, Result};
use chrono::{DateTime, Local, TimeDelta};
use std::fs;
use std::path::Path;

/// Major Brand がコンテナ作成日時の基準をどう扱うか。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandClass {
    /// ローカル時刻で記録される (qt, 3gp5)。補正不要。
    ZeroOffset,
    /// UTC で記録される。ローカルへの補正が要る。
    NeedsOffset,
    Unknown,
}

pub fn classify_brand(brand: &str) -> BrandClass {
    match brand.trim().to_ascii_lowercase().as_str() {
        "qt" | "3gp5" => BrandClass::ZeroOffset,
        "isom" | "mp42" | "3gp" | "3gp2" | "3gp3" | "3gp4" | "m4v" => BrandClass::NeedsOffset,
        _ => BrandClass::Unknown,
    }
}

/// ファイル更新時刻の時点でのローカルと UTC の差。DST を跨いだ古い
/// ファイルでも、その時点のオフセットが得られる。
pub fn filesystem_offset(path: &Path) -> Option<TimeDelta> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let local: DateTime<Local> = modified.into();
    Some(TimeDelta::seconds(i64::from(
        local.offset().local_minus_utc(),
    )))
}

/// コンテナ作成日時から採用候補を導出する。設定ルールがあればそれが
/// ブランド由来の補正より優先。ルールセットが空でないのにビデオ向けの
/// ルールが引けない場合は設定不備として即エラー。
pub fn video_candidate(
    meta: &VideoMeta,
    path: &Path,
    file_name: &str,
    extension: &str,
    rules: &TimezoneRules,
    warnings: &mut Vec<String>,
) -> Result<Candidate> {
    let derived = match classify_brand(&meta.major_brand) {
        BrandClass::ZeroOffset => Some(TimeDelta::zero()),
        BrandClass::NeedsOffset => filesystem_offset(path),
        BrandClass::Unknown => {
            warnings.push(format!(
                "ファイル '{}' の Major Brand '{}' は未知です。時刻補正なしで処理します",
                file_name,
                meta.major_brand.trim()
            ));
            None
        }
    };

    let rule = rules.resolve_video(extension);
    if !rules.is_empty() && rule.is_none() {
        bail!(
            "設定ファイルに \"VIDEO\" 行か既定行がありません (ファイル: {file_name}, 拡張子: {extension})"
        );
    }

    let offset = rule.map(|r| r.shift).or(derived);
    Ok(Candidate {
        datetime: meta.created_utc + offset.unwrap_or_else(TimeDelta::zero),
        offset,
    })
}

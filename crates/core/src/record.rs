use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// メタデータ由来の日時候補。オフセットは判明している場合のみ持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub datetime: NaiveDateTime,
    pub offset: Option<TimeDelta>,
}

/// EXIF の 3 つの日時フィールドに対応する候補のセット。
/// ビデオはコンテナ作成日時から導出した候補を `simple` に入れる。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub simple: Option<Candidate>,
    pub original: Option<Candidate>,
    pub digitized: Option<Candidate>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.simple.is_none() && self.original.is_none() && self.digitized.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraIdentity {
    pub serial_number: Option<String>,
    pub owner: Option<String>,
    pub model: Option<String>,
    pub maker: Option<String>,
}

impl CameraIdentity {
    /// 設定ファイル照合に使う識別子。優先順はシリアル番号、所有者、モデル、メーカー。
    pub fn lookup_order(&self) -> Vec<&str> {
        [
            self.serial_number.as_deref(),
            self.owner.as_deref(),
            self.model.as_deref(),
            self.maker.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
    }
}

/// 探索段階のレコード。メタデータ抽出の結果をそのまま保持する。
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
    pub extension: String,
    pub is_video: bool,
    pub candidates: CandidateSet,
    pub camera: CameraIdentity,
}

/// 日時が確定したリネーム対象。名前系フィールドは NameAllocator が埋める。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameEntry {
    pub original_path: PathBuf,
    pub original_name: String,
    pub stem: String,
    pub extension: String,
    pub is_video: bool,
    pub datetime: NaiveDateTime,
    #[serde(with = "offset_seconds")]
    pub offset: Option<TimeDelta>,
    pub comment: String,
    pub datetime_part: String,
    pub temp_name: String,
    pub final_name: String,
}

pub fn format_offset(offset: TimeDelta) -> String {
    let total = offset.num_minutes();
    let sign = if total < 0 { '-' } else { '+' };
    let abs = total.abs();
    format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
}

pub(crate) mod offset_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<TimeDelta>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(|v| v.num_seconds()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<TimeDelta>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<i64>::deserialize(deserializer)?.map(TimeDelta::seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::{format_offset, CameraIdentity};
    use chrono::TimeDelta;

    #[test]
    fn format_offset_renders_sign_and_minutes() {
        assert_eq!(format_offset(TimeDelta::minutes(180)), "+03:00");
        assert_eq!(format_offset(TimeDelta::minutes(-330)), "-05:30");
        assert_eq!(format_offset(TimeDelta::zero()), "+00:00");
    }

    #[test]
    fn lookup_order_skips_missing_and_blank_identifiers() {
        let camera = CameraIdentity {
            serial_number: None,
            owner: Some("  ".to_string()),
            model: Some("X-T5".to_string()),
            maker: Some("FUJIFILM".to_string()),
        };
        assert_eq!(camera.lookup_order(), vec!["X-T5", "FUJIFILM"]);
    }

    #[test]
    fn lookup_order_prefers_serial_number() {
        let camera = CameraIdentity {
            serial_number: Some("7A001234".to_string()),
            owner: Some("kelly".to_string()),
            model: Some("X-T5".to_string()),
            maker: Some("FUJIFILM".to_string()),
        };
        assert_eq!(
            camera.lookup_order(),
            vec!["7A001234", "kelly", "X-T5", "FUJIFILM"]
        );
    }
}

use crate::record::{CameraIdentity, Candidate, CandidateSet};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// QuickTime エポック (1904-01-01 UTC) と Unix エポックの差。
const QUICKTIME_TO_UNIX_SECONDS: i64 = 2_082_844_800;

#[derive(Debug, Clone)]
pub enum Extracted {
    /// EXIF も MP4 コンテナも読めなかった。処理対象外として黙ってスキップする。
    Unsupported,
    Photo(PhotoMeta),
    Video(VideoMeta),
}

#[derive(Debug, Clone, Default)]
pub struct PhotoMeta {
    pub candidates: CandidateSet,
    pub camera: CameraIdentity,
}

#[derive(Debug, Clone)]
pub struct VideoMeta {
    pub created_utc: NaiveDateTime,
    pub major_brand: String,
}

pub fn extract(path: &Path) -> Result<Extracted> {
    let file = File::open(path)
        .with_context(|| format!("ファイルを開けませんでした: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    if let Ok(exif) = Reader::new().read_from_container(&mut reader) {
        return Ok(Extracted::Photo(read_photo(&exif)));
    }
    read_video(path)
}

fn read_photo(exif: &Exif) -> PhotoMeta {
    let candidates = CandidateSet {
        simple: read_candidate(exif, Tag::DateTime, Tag::SubSecTime, Tag::OffsetTime),
        original: read_candidate(
            exif,
            Tag::DateTimeOriginal,
            Tag::SubSecTimeOriginal,
            Tag::OffsetTimeOriginal,
        ),
        digitized: read_candidate(
            exif,
            Tag::DateTimeDigitized,
            Tag::SubSecTimeDigitized,
            Tag::OffsetTimeDigitized,
        ),
    };
    let camera = CameraIdentity {
        serial_number: ascii_value(exif, Tag::BodySerialNumber),
        owner: ascii_value(exif, Tag::CameraOwnerName),
        model: ascii_value(exif, Tag::Model),
        maker: ascii_value(exif, Tag::Make),
    };
    PhotoMeta { candidates, camera }
}

fn read_candidate(exif: &Exif, date_tag: Tag, subsec_tag: Tag, offset_tag: Tag) -> Option<Candidate> {
    let raw = ascii_value(exif, date_tag)?;
    let base = parse_exif_datetime(&raw)?;
    let datetime = match ascii_value(exif, subsec_tag).and_then(|s| s.trim().parse::<u32>().ok()) {
        Some(subsec) => base + subsecond_delta(subsec),
        None => base,
    };
    let offset = ascii_value(exif, offset_tag)
        .as_deref()
        .and_then(parse_exif_offset);
    Some(Candidate { datetime, offset })
}

fn read_video(path: &Path) -> Result<Extracted> {
    let file = File::open(path)
        .with_context(|| format!("ファイルを開けませんでした: {}", path.display()))?;
    let size = file
        .metadata()
        .with_context(|| format!("ファイル情報を取得できませんでした: {}", path.display()))?
        .len();
    let mp4_file = match mp4::Mp4Reader::read_header(BufReader::new(file), size) {
        Ok(mp4_file) => mp4_file,
        Err(_) => return Ok(Extracted::Unsupported),
    };
    let creation_time = mp4_file.moov.mvhd.creation_time;
    if creation_time == 0 {
        return Ok(Extracted::Unsupported);
    }
    let unix_seconds = creation_time as i64 - QUICKTIME_TO_UNIX_SECONDS;
    let Some(created) = DateTime::from_timestamp(unix_seconds, 0) else {
        return Ok(Extracted::Unsupported);
    };
    Ok(Extracted::Video(VideoMeta {
        created_utc: created.naive_utc(),
        major_brand: mp4_file.ftyp.major_brand.to_string(),
    }))
}

fn ascii_value(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let text = match &field.value {
        Value::Ascii(blocks) if !blocks.is_empty() => {
            String::from_utf8(blocks[0].clone()).ok()?
        }
        _ => field.display_value().with_unit(exif).to_string(),
    };
    let text = text.trim().trim_matches('"').trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn parse_exif_datetime(input: &str) -> Option<NaiveDateTime> {
    let normalized = input.trim();
    for format in ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(normalized, format) {
            return Some(datetime);
        }
    }
    None
}

/// SubSecTime の桁数はカメラによって揺れる。4 桁 (例: 0123) を書く機種は
/// 1/10 ミリ秒単位なので 10 で割ってミリ秒に揃える。
fn subsecond_delta(value: u32) -> TimeDelta {
    if value >= 1000 {
        TimeDelta::milliseconds(i64::from(value) / 10)
    } else {
        TimeDelta::milliseconds(i64::from(value))
    }
}

/// OffsetTime ("+09:00" 等) を解釈する。区切りの揺れに備えて
/// +, -, : のどれでも分割し、時と分の 2 要素だけを受け付ける。
pub(crate) fn parse_exif_offset(zone: &str) -> Option<TimeDelta> {
    let zone = zone.trim();
    if zone.is_empty() {
        return None;
    }
    let parts: Vec<&str> = zone.split(['+', '-', ':']).filter(|p| !p.is_empty()).collect();
    if parts.len() != 2 {
        return None;
    }
    let hours: i64 = parts[0].trim().parse().ok()?;
    let minutes: i64 = parts[1].trim().parse().ok()?;
    let delta = TimeDelta::minutes(hours * 60 + minutes);
    Some(if zone.contains('-') { -delta } else { delta })
}

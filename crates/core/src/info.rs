use crate::extract::{extract, Extracted};
use anyhow::{bail, Context, Result};
use exif::{Reader, Tag};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// 1 ファイル分のメタデータダンプ。リネーム判断に使われるタグには
/// 注記が付く。
#[derive(Debug, Clone)]
pub struct FileInformation {
    pub name: String,
    pub lines: Vec<String>,
}

pub fn inspect_path(path: &Path) -> Result<Vec<FileInformation>> {
    if path.is_file() {
        return Ok(inspect_file(path)?.into_iter().collect());
    }
    if path.is_dir() {
        let mut out = Vec::new();
        let mut paths: Vec<_> = fs::read_dir(path)
            .with_context(|| format!("フォルダを読めませんでした: {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();
        for file_path in paths {
            if let Some(info) = inspect_file(&file_path)? {
                out.push(info);
            }
        }
        return Ok(out);
    }
    bail!("存在しないパスが指定されました: {}", path.display());
}

fn inspect_file(path: &Path) -> Result<Option<FileInformation>> {
    let name = path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();

    let file = File::open(path)
        .with_context(|| format!("ファイルを開けませんでした: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    if let Ok(exif) = Reader::new().read_from_container(&mut reader) {
        let mut lines = Vec::new();
        for field in exif.fields() {
            let value = field.display_value().with_unit(&exif);
            match tag_marker(field.tag) {
                Some(marker) => lines.push(format!("{}: {}     {}", field.tag, value, marker)),
                None => lines.push(format!("{}: {}", field.tag, value)),
            }
        }
        return Ok(Some(FileInformation { name, lines }));
    }

    match extract(path)? {
        Extracted::Video(meta) => Ok(Some(FileInformation {
            name,
            lines: vec![
                format!("Major Brand: {}", meta.major_brand.trim()),
                format!("Created: {} (UTC)     => DATE/TIME", meta.created_utc),
            ],
        })),
        _ => Ok(None),
    }
}

fn tag_marker(tag: Tag) -> Option<&'static str> {
    if tag == Tag::Make || tag == Tag::Model || tag == Tag::BodySerialNumber {
        Some("=> CAMERA in config")
    } else if tag == Tag::CameraOwnerName {
        Some("=> OWNER in config")
    } else if tag == Tag::DateTime {
        Some("=> DATE/TIME")
    } else if tag == Tag::DateTimeOriginal {
        Some("=> DATE/TIME Original")
    } else if tag == Tag::DateTimeDigitized {
        Some("=> DATE/TIME Digitized")
    } else {
        None
    }
}

use crate::allocator::{allocate_names, extract_comment};
use crate::apply::sort_entries;
use crate::extract::{extract, Extracted};
use crate::infer::infer_video_timezones;
use crate::record::{CameraIdentity, Candidate, CandidateSet, MediaFile, RenameEntry};
use crate::resolver::{resolve, DateWindow, Priority, Resolution};
use crate::rules::{TimezoneRules, RULES_FILE_NAME};
use crate::template::{parse_template, DEFAULT_TEMPLATE};
use crate::video::video_candidate;
use anyhow::{bail, Context, Result};
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub directory: PathBuf,
    pub priority: u8,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub template: String,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            priority: 0,
            min_date: default_min_date(),
            max_date: default_max_date(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// デジタルカメラ普及前の日時はカメラの初期化値とみなして弾く。
pub fn default_min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2004, 3, 1).unwrap_or(NaiveDate::MIN)
}

/// 明日の 00:00 までを許容する。カメラの時計が多少進んでいても通る。
pub fn default_max_date() -> NaiveDate {
    Local::now().date_naive() + Days::new(1)
}

pub fn parse_date_arg(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .with_context(|| format!("日付は YYYY-MM-DD 形式で指定してください: {text}"))
}

pub fn parse_max_date_arg(text: &str) -> Result<NaiveDate> {
    if text.trim().eq_ignore_ascii_case("tomorrow") {
        return Ok(default_max_date());
    }
    parse_date_arg(text)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenameStats {
    pub scanned_files: usize,
    pub skipped_unsupported: usize,
    pub skipped_no_metadata: usize,
    pub rejected_out_of_range: usize,
    pub photos: usize,
    pub videos: usize,
    pub planned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub directory: PathBuf,
    pub template: String,
    pub entries: Vec<RenameEntry>,
    pub stats: RenameStats,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

/// ディレクトリ直下を走査してリネーム計画を立てる。ファイルには触らない。
pub fn generate_plan(options: &PlanOptions) -> Result<RenamePlan> {
    if !options.directory.is_dir() {
        bail!("ディレクトリが存在しません: {}", options.directory.display());
    }

    let parts = parse_template(&options.template)?;
    let priority = Priority::from_index(options.priority)?;
    let window = date_window(options)?;
    let rules = TimezoneRules::load(&options.directory)?;

    let mut stats = RenameStats::default();
    let mut notes = Vec::new();
    let mut warnings = Vec::new();

    if !rules.is_empty() {
        notes.push(format!(
            "設定ファイルを読み込みました: {}",
            options.directory.join(RULES_FILE_NAME).display()
        ));
    }

    let mut entries = Vec::new();
    for path in collect_files(&options.directory)? {
        stats.scanned_files += 1;
        let Some(file) = discover(&path, &rules, &mut warnings)? else {
            stats.skipped_unsupported += 1;
            continue;
        };
        match resolve(&file.candidates, priority, &window) {
            Resolution::Absent => stats.skipped_no_metadata += 1,
            Resolution::RejectedOutOfRange => {
                stats.rejected_out_of_range += 1;
                warnings.push(out_of_range_warning(&file, &window));
            }
            Resolution::Accepted { datetime, offset } => {
                if !file.is_video {
                    check_camera_rule(&file, &rules)?;
                    stats.photos += 1;
                } else {
                    stats.videos += 1;
                }
                entries.push(RenameEntry {
                    original_path: file.path.clone(),
                    original_name: file.file_name.clone(),
                    stem: file.stem.clone(),
                    extension: file.extension.clone(),
                    is_video: file.is_video,
                    datetime,
                    offset,
                    comment: extract_comment(&file.stem),
                    datetime_part: String::new(),
                    temp_name: String::new(),
                    final_name: String::new(),
                });
            }
        }
    }

    if rules.is_empty() {
        infer_video_timezones(&mut entries, &mut notes, &mut warnings);
    }

    allocate_names(&mut entries, &parts)?;
    sort_entries(&mut entries);
    stats.planned = entries.len();

    Ok(RenamePlan {
        directory: options.directory.clone(),
        template: options.template.clone(),
        entries,
        stats,
        notes,
        warnings,
    })
}

fn date_window(options: &PlanOptions) -> Result<DateWindow> {
    if options.min_date > options.max_date {
        bail!(
            "min 日付が max 日付より後です: {} > {}",
            options.min_date,
            options.max_date
        );
    }
    let min = options
        .min_date
        .and_hms_opt(0, 0, 0)
        .context("min 日付を時刻に展開できません")?;
    let max = options
        .max_date
        .and_hms_opt(0, 0, 0)
        .context("max 日付を時刻に展開できません")?;
    Ok(DateWindow::new(min, max))
}

/// 直下のファイルだけを名前順に集める。サブディレクトリには降りない。
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(root)
        .with_context(|| format!("フォルダを読めませんでした: {}", root.display()))?
    {
        let entry =
            entry.with_context(|| format!("フォルダの走査に失敗しました: {}", root.display()))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

fn discover(
    path: &Path,
    rules: &TimezoneRules,
    warnings: &mut Vec<String>,
) -> Result<Option<MediaFile>> {
    let file_name = path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|v| format!(".{}", v.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    match extract(path)? {
        Extracted::Unsupported => Ok(None),
        Extracted::Photo(meta) => Ok(Some(MediaFile {
            path: path.to_path_buf(),
            file_name,
            stem,
            extension,
            is_video: false,
            candidates: meta.candidates,
            camera: meta.camera,
        })),
        Extracted::Video(meta) => {
            let candidate = video_candidate(&meta, path, &file_name, &extension, rules, warnings)?;
            Ok(Some(MediaFile {
                path: path.to_path_buf(),
                file_name,
                stem,
                extension,
                is_video: true,
                candidates: CandidateSet {
                    simple: Some(candidate),
                    ..CandidateSet::default()
                },
                camera: CameraIdentity::default(),
            }))
        }
    }
}

/// ルールセットが空でなければ、全写真が何らかのルールに該当することを
/// 要求する。該当の無いカメラは設定漏れとして即エラー。
fn check_camera_rule(file: &MediaFile, rules: &TimezoneRules) -> Result<()> {
    if rules.is_empty() {
        return Ok(());
    }
    let identifiers = file.camera.lookup_order();
    if rules.resolve(&file.extension, &identifiers).is_some() {
        return Ok(());
    }
    bail!(
        "設定ファイルに該当するカメラの行がありません:\n  ファイル: {}\n  シリアル番号: {}\n  所有者: {}\n  モデル: {}\n  メーカー: {}",
        file.file_name,
        file.camera.serial_number.as_deref().unwrap_or("-"),
        file.camera.owner.as_deref().unwrap_or("-"),
        file.camera.model.as_deref().unwrap_or("-"),
        file.camera.maker.as_deref().unwrap_or("-"),
    )
}

fn out_of_range_warning(file: &MediaFile, window: &DateWindow) -> String {
    format!(
        "ファイル '{}' の日時が許容範囲 {} 〜 {} の外です:\n  Date/Time: {}\n  Date/Time Original: {}\n  Date/Time Digitized: {}\nカメラの日時設定を確認してください",
        file.file_name,
        window.min.date(),
        window.max.date(),
        fmt_candidate(file.candidates.simple),
        fmt_candidate(file.candidates.original),
        fmt_candidate(file.candidates.digitized),
    )
}

fn fmt_candidate(candidate: Option<Candidate>) -> String {
    candidate
        .map(|c| c.datetime.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

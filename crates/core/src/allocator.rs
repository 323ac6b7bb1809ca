use crate::record::RenameEntry;
use crate::template::{render_template, TemplatePart};
use chrono::TimeDelta;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

/// 元ファイル名の先頭部分 (英数字・文字・括弧・ハイフン・アンダースコア・
/// 数字前の空白) とそれ以降のコメント部分を切り分けるマスク。
const NAME_MASK: &str = r"^((?:\p{L}|[()_\-]|\d| \d)+)(.*)$";

const NUDGE_MILLIS: i64 = 100;

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("重複しない名前を割り当てられませんでした: {name} (テンプレートの粒度を上げてください)")]
    Exhausted { name: String },
}

fn name_mask() -> &'static Regex {
    static MASK: OnceLock<Regex> = OnceLock::new();
    MASK.get_or_init(|| Regex::new(NAME_MASK).expect("name mask"))
}

/// 元ファイル名の末尾コメント (" - 海岸" など) を取り出す。
/// マスクに合わない名前はコメント無し扱い。
pub fn extract_comment(stem: &str) -> String {
    name_mask()
        .captures(stem)
        .and_then(|captures| captures.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// 各エントリに日時部分・最終名・一時名を割り当てる。日時部分が既出なら
/// 表示用の時刻を 100 ミリ秒ずつずらして再試行する。エントリの日時自体は
/// 変更しない。試行回数は件数 + 2 で打ち切り。
pub fn allocate_names(entries: &mut [RenameEntry], parts: &[TemplatePart]) -> Result<(), AllocError> {
    let budget = entries.len() + 2;
    let mut used = HashSet::<String>::new();

    for entry in entries.iter_mut() {
        let mut display_time = entry.datetime;
        let mut attempts = budget;
        let datetime_part = loop {
            let rendered = render_template(parts, &display_time);
            if !used.contains(&rendered) {
                break rendered;
            }
            if attempts == 0 {
                return Err(AllocError::Exhausted {
                    name: entry.original_name.clone(),
                });
            }
            attempts -= 1;
            display_time += TimeDelta::milliseconds(NUDGE_MILLIS);
        };
        used.insert(datetime_part.clone());
        entry.final_name = format!("{}{}{}", datetime_part, entry.comment, entry.extension);
        entry.temp_name = format!("{}._tmp_{}", entry.stem, entry.extension);
        entry.datetime_part = datetime_part;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{allocate_names, extract_comment};
    use crate::record::RenameEntry;
    use crate::template::parse_template;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::path::PathBuf;

    fn at_milli(milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_milli_opt(9, 5, 7, milli)
            .unwrap()
    }

    fn entry(stem: &str, comment: &str, datetime: NaiveDateTime) -> RenameEntry {
        RenameEntry {
            original_path: PathBuf::from(format!("{stem}.jpg")),
            original_name: format!("{stem}.jpg"),
            stem: stem.to_string(),
            extension: ".jpg".to_string(),
            is_video: false,
            datetime,
            offset: None,
            comment: comment.to_string(),
            datetime_part: String::new(),
            temp_name: String::new(),
            final_name: String::new(),
        }
    }

    #[test]
    fn comment_extraction() {
        assert_eq!(extract_comment("IMG_0001 - 夕焼け"), " - 夕焼け");
        assert_eq!(extract_comment("DSC01234"), "");
        assert_eq!(extract_comment("2023-06-01-1000000 休暇"), " 休暇");
        assert_eq!(extract_comment("Фото 1"), "");
    }

    #[test]
    fn names_compose_part_comment_extension() {
        let parts = parse_template("{year}-{month}-{day}-{hour}{minute}{second}{subsec}").unwrap();
        let mut entries = vec![entry("IMG_0001 - 夕焼け", " - 夕焼け", at_milli(300))];
        allocate_names(&mut entries, &parts).unwrap();
        assert_eq!(entries[0].datetime_part, "2023-06-01-0905073");
        assert_eq!(entries[0].final_name, "2023-06-01-0905073 - 夕焼け.jpg");
        assert_eq!(entries[0].temp_name, "IMG_0001 - 夕焼け._tmp_.jpg");
    }

    #[test]
    fn collision_nudges_display_time_only() {
        let parts = parse_template("{year}-{month}-{day}-{hour}{minute}{second}{subsec}").unwrap();
        let mut entries = vec![
            entry("a", "", at_milli(0)),
            entry("b", "", at_milli(0)),
        ];
        allocate_names(&mut entries, &parts).unwrap();
        assert_eq!(entries[0].datetime_part, "2023-06-01-0905070");
        assert_eq!(entries[1].datetime_part, "2023-06-01-0905071");
        // 保存される日時はずらさない
        assert_eq!(entries[1].datetime, at_milli(0));
    }

    #[test]
    fn coarse_template_exhausts_the_budget() {
        let parts = parse_template("{year}").unwrap();
        let mut entries = vec![
            entry("a", "", at_milli(0)),
            entry("b", "", at_milli(0)),
        ];
        assert!(allocate_names(&mut entries, &parts).is_err());
    }

    #[test]
    fn renaming_already_renamed_files_is_idempotent() {
        // 既に揃えた名前をもう一度処理しても同じ名前になる
        let parts = parse_template("{year}-{month}-{day}-{hour}{minute}{second}{subsec}").unwrap();
        let stem = "2023-06-01-0905073";
        assert_eq!(extract_comment(stem), "");
        let mut entries = vec![entry(stem, "", at_milli(300))];
        allocate_names(&mut entries, &parts).unwrap();
        assert_eq!(entries[0].final_name, "2023-06-01-0905073.jpg");
    }

    #[test]
    fn different_comments_do_not_prevent_the_nudge() {
        // 衝突判定はコメント抜きの日時部分だけで行う
        let parts = parse_template("{date}{subsec}").unwrap();
        let mut entries = vec![
            entry("a - 朝", " - 朝", at_milli(0)),
            entry("b - 夜", " - 夜", at_milli(0)),
        ];
        allocate_names(&mut entries, &parts).unwrap();
        assert_eq!(entries[0].final_name, "202306010905070 - 朝.jpg");
        assert_eq!(entries[1].final_name, "202306010905071 - 夜.jpg");
    }
}

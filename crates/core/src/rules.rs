use chrono::TimeDelta;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const RULES_FILE_NAME: &str = "exif-renamer.config";

const RULE_PATTERN: &str =
    r"^(?P<ext>\.\S+)\s+(?P<sign>[+-])(?P<time>\d{1,2}:\d{1,2}(?::\d{1,2}(?:\.\d{1,3})?)?)\s*(?P<camera>.*?)\s*$";

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("設定ファイルを読めませんでした: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("設定ファイル {line} 行目を解釈できません: {text}")]
    Syntax { line: usize, text: String },
}

/// 設定ファイルの 1 行。`.jpg +09:00 FUJIFILM` のような形。
/// カメラ欄が空のルールはその拡張子の既定ルールになる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRule {
    pub extension: String,
    pub camera: String,
    pub shift: TimeDelta,
}

#[derive(Debug, Clone, Default)]
pub struct TimezoneRules {
    rules: Vec<ConfigRule>,
}

impl TimezoneRules {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<ConfigRule>) -> Self {
        Self { rules }
    }

    /// 対象ディレクトリ直下の設定ファイルを読む。無ければ空のルールセット。
    pub fn load(directory: &Path) -> Result<Self, RulesError> {
        let path = directory.join(RULES_FILE_NAME);
        if !path.exists() {
            return Ok(Self::empty());
        }
        let text = fs::read_to_string(&path).map_err(|source| RulesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, RulesError> {
        let pattern = Regex::new(RULE_PATTERN).expect("rule pattern");
        let mut rules = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || is_comment(line) {
                continue;
            }
            let syntax_error = || RulesError::Syntax {
                line: index + 1,
                text: line.to_string(),
            };
            let captures = pattern.captures(line).ok_or_else(syntax_error)?;
            let shift =
                parse_shift(&captures["sign"], &captures["time"]).ok_or_else(syntax_error)?;
            rules.push(ConfigRule {
                extension: captures["ext"].to_string(),
                camera: captures["camera"].to_string(),
                shift,
            });
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 識別子を優先順に走査し、拡張子が一致してカメラ欄が空か部分一致する
    /// 最初のルールを返す。外側が識別子、内側がファイル内のルール順。
    pub fn resolve(&self, extension: &str, identifiers: &[&str]) -> Option<&ConfigRule> {
        for identifier in identifiers {
            for rule in &self.rules {
                if !rule.extension.eq_ignore_ascii_case(extension) {
                    continue;
                }
                if rule.camera.is_empty() || contains_ignore_case(identifier.trim(), &rule.camera) {
                    return Some(rule);
                }
            }
        }
        None
    }

    /// ビデオは固定の識別子 "VIDEO" と空文字列(既定ルール)で照合する。
    pub fn resolve_video(&self, extension: &str) -> Option<&ConfigRule> {
        self.resolve(extension, &["VIDEO", ""])
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") || line.starts_with('#') || line.starts_with("--") || line.starts_with("REM")
}

fn parse_shift(sign: &str, time: &str) -> Option<TimeDelta> {
    let (main, millis) = match time.split_once('.') {
        Some((main, fraction)) => {
            let mut digits = fraction.to_string();
            while digits.len() < 3 {
                digits.push('0');
            }
            (main, digits[..3].parse::<i64>().ok()?)
        }
        None => (time, 0),
    };
    let mut parts = main.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = match parts.next() {
        Some(value) => value.parse().ok()?,
        None => 0,
    };
    let total = (hours * 3600 + minutes * 60 + seconds) * 1000 + millis;
    let delta = TimeDelta::milliseconds(total);
    Some(if sign == "-" { -delta } else { delta })
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{RulesError, TimezoneRules};
    use chrono::TimeDelta;

    #[test]
    fn parses_rules_with_comments_and_blank_lines() {
        let text = "\
// カメラごとの時間帯
# もうひとつのコメント形式
-- さらにもうひとつ
REM DOS 風

.jpg +09:00 FUJIFILM
.jpg -05:30
.mov +00:00 VIDEO
";
        let rules = TimezoneRules::parse(text).unwrap();
        assert!(!rules.is_empty());
        let rule = rules.resolve(".jpg", &["FUJIFILM X-T5"]).unwrap();
        assert_eq!(rule.shift, TimeDelta::hours(9));
        assert_eq!(rule.camera, "FUJIFILM");
    }

    #[test]
    fn parses_seconds_and_fraction() {
        let rules = TimezoneRules::parse(".arw +01:02:03.5 SONY").unwrap();
        let rule = rules.resolve(".arw", &["SONY ILCE-7M4"]).unwrap();
        assert_eq!(
            rule.shift,
            TimeDelta::seconds(3600 + 2 * 60 + 3) + TimeDelta::milliseconds(500)
        );
    }

    #[test]
    fn negative_shift() {
        let rules = TimezoneRules::parse(".jpg -10:00").unwrap();
        let rule = rules.resolve(".jpg", &["anything"]).unwrap();
        assert_eq!(rule.shift, TimeDelta::hours(-10));
    }

    #[test]
    fn syntax_error_carries_line_number() {
        let text = ".jpg +09:00\nこの行は壊れている\n";
        match TimezoneRules::parse(text) {
            Err(RulesError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("構文エラーを期待: {other:?}"),
        }
    }

    #[test]
    fn empty_text_yields_empty_rules() {
        let rules = TimezoneRules::parse("\n// コメントだけ\n").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn identifier_priority_beats_file_order() {
        // シリアル番号の照合がファイル先頭のモデル行より優先される
        let text = ".jpg +01:00 X-T5\n.jpg +02:00 7A001234\n";
        let rules = TimezoneRules::parse(text).unwrap();
        let rule = rules.resolve(".jpg", &["7A001234", "X-T5"]).unwrap();
        assert_eq!(rule.shift, TimeDelta::hours(2));
    }

    #[test]
    fn catch_all_matches_any_camera() {
        let rules = TimezoneRules::parse(".jpg +00:00\n").unwrap();
        assert!(rules.resolve(".jpg", &["未知のカメラ"]).is_some());
        assert!(rules.resolve(".png", &["未知のカメラ"]).is_none());
    }

    #[test]
    fn video_lookup_uses_fixed_identifiers() {
        let rules = TimezoneRules::parse(".mov +09:00 VIDEO\n").unwrap();
        assert!(rules.resolve_video(".mov").is_some());
        assert!(rules.resolve_video(".mp4").is_none());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let rules = TimezoneRules::parse(".JPG +09:00\n").unwrap();
        assert!(rules.resolve(".jpg", &["cam"]).is_some());
    }

    #[test]
    fn missing_file_is_empty_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rules = TimezoneRules::load(dir.path()).unwrap();
        assert!(rules.is_empty());
    }
}

use crate::template::DEFAULT_TEMPLATE;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// CLI 引数で上書きできる既定値。OS の設定ディレクトリに TOML で保存する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub template: String,
    pub priority: u8,
    pub min_date: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            priority: 0,
            min_date: "2004-03-01".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let dirs = ProjectDirs::from("com", "kelly", "exif-renamer")
        .context("設定ディレクトリを特定できませんでした")?;
    let config_dir = dirs.config_dir().to_path_buf();
    let config_path = config_dir.join("config.toml");
    Ok(AppPaths {
        config_dir,
        config_path,
    })
}

/// 設定ファイルが無ければ既定値を返す。壊れた TOML はエラー。
pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }
    let text = fs::read_to_string(&paths.config_path).with_context(|| {
        format!(
            "設定ファイルを読めませんでした: {}",
            paths.config_path.display()
        )
    })?;
    toml::from_str(&text).with_context(|| {
        format!(
            "設定ファイルを解釈できませんでした: {}",
            paths.config_path.display()
        )
    })
}

pub fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let paths = app_paths()?;
    fs::create_dir_all(&paths.config_dir).with_context(|| {
        format!(
            "設定ディレクトリを作成できませんでした: {}",
            paths.config_dir.display()
        )
    })?;
    let text = toml::to_string_pretty(config).context("設定をシリアライズできませんでした")?;
    fs::write(&paths.config_path, text).with_context(|| {
        format!(
            "設定ファイルを書けませんでした: {}",
            paths.config_path.display()
        )
    })?;
    Ok(paths.config_path)
}

//! 撮影日時 (EXIF / QuickTime) でフォト・ビデオのファイル名を揃える
//! ライブラリ。走査と計画立案 ([`generate_plan`]) は読み取り専用で、
//! 適用 ([`apply_batch`]) だけがファイルに触る。

mod allocator;
mod apply;
mod config;
mod extract;
mod infer;
mod info;
mod planner;
mod record;
mod resolver;
mod rules;
mod template;
mod video;

pub use allocator::{allocate_names, extract_comment, AllocError};
pub use apply::{apply_batch, sort_entries, ApplyResult};
pub use config::{app_paths, load_config, save_config, AppConfig, AppPaths};
pub use extract::{extract, Extracted, PhotoMeta, VideoMeta};
pub use infer::{infer_video_timezones, InferenceOutcome};
pub use info::{inspect_path, FileInformation};
pub use planner::{
    default_max_date, default_min_date, generate_plan, parse_date_arg, parse_max_date_arg,
    PlanOptions, RenamePlan, RenameStats,
};
pub use record::{
    format_offset, CameraIdentity, Candidate, CandidateSet, MediaFile, RenameEntry,
};
pub use resolver::{resolve, DateWindow, Priority, Resolution};
pub use rules::{ConfigRule, RulesError, TimezoneRules, RULES_FILE_NAME};
pub use template::{
    parse_template, render_template, validate_template, TemplateError, TemplatePart, Token,
    DEFAULT_TEMPLATE,
};
pub use video::{classify_brand, filesystem_offset, video_candidate, BrandClass};

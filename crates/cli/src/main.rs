use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use exif_renamer_core::{
    apply_batch, default_max_date, default_min_date, format_offset, generate_plan, inspect_path,
    load_config, parse_date_arg, parse_max_date_arg, save_config, validate_template, AppConfig,
    PlanOptions, RenamePlan,
};
use std::path::PathBuf;

const PRIORITY_HELP: &str = "\
--priority の意味:
  0  最も早い日時 (既定)
  1  最も遅い日時
  2  Date/Time、無ければ Original、Digitized の順
  3  Date/Time Digitized、無ければ Original、Date/Time の順
  4  Date/Time Original、無ければ Date/Time、Digitized の順
  5  Date/Time Original、無ければ Digitized、Date/Time の順
範囲外の候補は飛ばして次を見ます。";

#[derive(Debug, Parser)]
#[command(name = "exif-renamer", version)]
#[command(about = "撮影日時でフォト・ビデオのファイル名を一括リネームします")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// ディレクトリ直下のフォト・ビデオを撮影日時の名前に揃える
    #[command(after_help = PRIORITY_HELP)]
    Rename(RenameArgs),
    /// ファイルのメタデータを表示する
    Info(InfoArgs),
    /// 保存済みの既定値を扱う
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// 対象ディレクトリ (省略時は現在のディレクトリ)
    path: Option<PathBuf>,

    /// 採用する日時の下限 (YYYY-MM-DD)
    #[arg(long)]
    min: Option<String>,

    /// 採用する日時の上限 (YYYY-MM-DD または tomorrow)
    #[arg(long)]
    max: Option<String>,

    /// 日時候補の優先順位 (0〜5)
    #[arg(long)]
    priority: Option<u8>,

    /// ファイル名テンプレート (例: {year}-{month}-{day}-{hour}{minute}{second}{subsec})
    #[arg(long)]
    template: Option<String>,

    /// 計画の表示のみ行い、ファイルには触らない
    #[arg(long)]
    dry_run: bool,

    /// 出力形式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Args)]
struct InfoArgs {
    /// ファイルまたはディレクトリ (省略時は現在のディレクトリ)
    path: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// 現在の既定値と設定ファイルの場所を表示する
    Show,
    /// 既定値を設定ファイルに書き出す
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Info(args) => cmd_info(args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => cmd_config_show(),
            ConfigCommands::Init => cmd_config_init(),
        },
    }
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let directory = match args.path {
        Some(path) => path,
        None => {
            eprintln!("パスが指定されていないため、現在のディレクトリを処理します。");
            std::env::current_dir()?
        }
    };
    if directory.is_file() {
        bail!(
            "ディレクトリではなくファイルが指定されました: {}\nファイルの中身は `exif-renamer info` で確認できます",
            directory.display()
        );
    }

    let template = args.template.unwrap_or(config.template);
    validate_template(&template)?;

    let options = PlanOptions {
        directory,
        priority: args.priority.unwrap_or(config.priority),
        min_date: match args.min.as_deref() {
            Some(text) => parse_date_arg(text)?,
            None => parse_date_arg(&config.min_date).unwrap_or_else(|_| default_min_date()),
        },
        max_date: match args.max.as_deref() {
            Some(text) => parse_max_date_arg(text)?,
            None => default_max_date(),
        },
        template,
    };

    let plan = generate_plan(&options)?;

    for warning in &plan.warnings {
        eprintln!("警告: {warning}");
    }
    for note in &plan.notes {
        println!("{note}");
    }

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Table => print_table(&plan),
    }

    if args.dry_run {
        println!("dry-run モード: ファイルは変更していません。");
    } else {
        let result = apply_batch(&plan.directory, &plan.entries)?;
        println!("リネーム完了: {} 件", result.renamed);
    }
    Ok(())
}

fn print_table(plan: &RenamePlan) {
    if plan.entries.is_empty() {
        println!("リネーム対象のファイルはありません。");
    } else {
        let width = plan
            .entries
            .iter()
            .map(|e| e.original_name.chars().count())
            .max()
            .unwrap_or(0);
        for entry in &plan.entries {
            let kind = if entry.is_video { "[V]" } else { "   " };
            let offset = entry
                .offset
                .map(format_offset)
                .unwrap_or_else(|| "  -  ".to_string());
            println!(
                "{kind} {:width$}  ->  {}  ({} {})",
                entry.original_name, entry.final_name, entry.datetime, offset,
            );
        }
    }
    let stats = &plan.stats;
    println!(
        "走査 {} 件 / 計画 {} 件 (写真 {}, ビデオ {}) / 対象外 {} 件 / 日時なし {} 件 / 範囲外 {} 件",
        stats.scanned_files,
        stats.planned,
        stats.photos,
        stats.videos,
        stats.skipped_unsupported,
        stats.skipped_no_metadata,
        stats.rejected_out_of_range,
    );
}

fn cmd_info(args: InfoArgs) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let infos = inspect_path(&path)?;
    if infos.is_empty() {
        println!("メタデータを読めるファイルはありません。");
        return Ok(());
    }
    for info in infos {
        println!("--------  {}  --------", info.name);
        for line in info.lines {
            println!("  {line}");
        }
        println!();
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let paths = exif_renamer_core::app_paths()?;
    let config = load_config()?;
    println!("設定ファイル: {}", paths.config_path.display());
    if !paths.config_path.exists() {
        println!("(未作成のため既定値を表示しています)");
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = save_config(&AppConfig::default())?;
    println!("既定値を書き出しました: {}", path.display());
    Ok(())
}

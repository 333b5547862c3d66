// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use subfont::app_config::{self, Config};
use subfont::file_utils::FileManager;
use subfont::report::Report;
use subfont::requirements::RequirementSet;
use subfont::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect required font names and glyphs and export them
    Scan {
        /// Subtitle files or directories containing .ass/.ssa files
        #[arg(value_name = "SUBTITLES", required = true)]
        inputs: Vec<PathBuf>,

        /// Export file
        #[arg(short, long, default_value = "ASSInfo.txt")]
        output: PathBuf,
    },

    /// Show which library fonts the subtitles would use
    Resolve {
        /// Subtitle files or directories containing .ass/.ssa files
        #[arg(value_name = "SUBTITLES", required = true)]
        inputs: Vec<PathBuf>,

        /// Font library root (overrides the config file)
        #[arg(short, long)]
        library: Option<PathBuf>,
    },

    /// Resolve fonts and stage them into an output directory
    Pack {
        /// Subtitle files or directories containing .ass/.ssa files
        #[arg(value_name = "SUBTITLES", required = true)]
        inputs: Vec<PathBuf>,

        /// Font library root (overrides the config file)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Output root, recreated on every run (overrides the config file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Subset staged fonts to the required glyphs
        #[arg(short, long)]
        subset: bool,

        /// Also convert staged OTF/TTC fonts into TTF files
        #[arg(long)]
        convert: bool,

        /// Write the report as JSON to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Subset font files to the glyphs listed in an exported requirement file
    Subset {
        /// Font files to subset
        #[arg(value_name = "FONTS", required = true)]
        fonts: Vec<PathBuf>,

        /// Requirement export or plain character file
        #[arg(long)]
        chars: PathBuf,

        /// Output directory, recreated on every run
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert OTF/TTC fonts into TTF files named after their family
    Convert {
        /// Font files or directories containing .otf/.ttc files
        #[arg(value_name = "FONTS", required = true)]
        fonts: Vec<PathBuf>,

        /// Output directory, recreated on every run
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate shell completions for subfont
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subfont - collect, match and stage the fonts used by subtitles
#[derive(Parser, Debug)]
#[command(name = "subfont")]
#[command(version)]
#[command(about = "Resolve and stage the fonts required by ASS/SSA subtitles")]
#[command(long_about = "subfont reads ASS/SSA subtitles, finds the fonts they declare in a font library
and copies (optionally subsets) them into an output directory.

EXAMPLES:
    subfont scan episode01.ass                      # Export font names and glyphs to ASSInfo.txt
    subfont resolve subs/ -l ~/fonts                 # Show exact, fuzzy and missing fonts
    subfont pack subs/ -l ~/fonts -o out             # Copy matched fonts into out/
    subfont pack subs/ -l ~/fonts -o out --subset    # ...and subset them with pyftsubset
    subfont subset a.ttf b.otf --chars ASSInfo.txt -o slim
    subfont convert ~/fonts/otf_ttc -o ttf            # Split TTC faces and save OTF/TTC as TTF
    subfont completions bash > subfont.bash

CONFIGURATION:
    Configuration is stored in subfont.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "subfont.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger with trace so that the max level alone filters
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subfont", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    if let Err(e) = run_command(cli.command, config).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run_command(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Scan { inputs, output } => {
            let controller = Controller::with_config(config)?;
            let documents = collect_documents(&inputs)?;
            let (requirements, _) = controller.load_documents(&documents);
            print_requirements(&requirements);
            controller.export_requirements(&requirements, &output)?;
        }
        Commands::Resolve { inputs, library } => {
            let library = library.or(config.library_root.clone())
                .ok_or_else(|| anyhow!("No font library given (use --library or set library_root)"))?;
            let controller = Controller::with_config(config)?;
            let documents = collect_documents(&inputs)?;
            let (requirements, decode_errors) = controller.load_documents(&documents);
            let records = controller.resolve_fonts(&requirements, &library)?;
            let report = controller.build_report(&requirements, &records, &decode_errors, &[], &[], &[]);
            print!("{}", report);
        }
        Commands::Pack { inputs, library, output, subset, convert, report } => {
            let library = library.or(config.library_root.clone())
                .ok_or_else(|| anyhow!("No font library given (use --library or set library_root)"))?;
            let output = output.unwrap_or_else(|| config.output_dir.clone());
            config.subset.enabled |= subset;
            config.convert.enabled |= convert;

            let controller = Controller::with_config(config)?;
            let documents = collect_documents(&inputs)?;
            let outcome = controller.run(&documents, &library, &output).await?;
            print!("{}", outcome.report);
            if let Some(report_path) = report {
                write_report(&outcome.report, &report_path)?;
            }
        }
        Commands::Subset { fonts, chars, output } => {
            let content = FileManager::read_to_string(&chars)?;
            let requirements = RequirementSet::parse_export(&content);
            info!("Loaded {} glyphs from {}", requirements.glyph_count(), chars.display());

            let controller = Controller::with_config(config)?;
            let jobs = controller.subset_files(&fonts, requirements.glyphs(), &output).await?;
            let failed = jobs.iter().filter(|job| !job.succeeded()).count();
            info!("Subset {} of {} fonts into {}", jobs.len() - failed, jobs.len(), output.display());
            if failed > 0 {
                return Err(anyhow!("{} font(s) could not be subset", failed));
            }
        }
        Commands::Convert { fonts, output } => {
            let controller = Controller::with_config(config)?;
            let fonts = collect_fonts(&fonts)?;
            let jobs = controller.convert_files(&fonts, &output).await?;
            let failed = jobs.iter().filter(|job| !job.succeeded()).count();
            let faces: usize = jobs.iter().map(|job| job.outputs.len()).sum();
            info!("Converted {} faces from {} fonts into {}", faces, jobs.len(), output.display());
            if failed > 0 {
                return Err(anyhow!("{} font(s) could not be converted", failed));
            }
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

// Expand directories into the subtitle files they contain
fn collect_documents(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let extensions = ["ass".to_string(), "ssa".to_string()];
    let mut documents = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let found = FileManager::find_files(input, &extensions);
            if found.is_empty() {
                warn!("No subtitle files found in {}", input.display());
            }
            documents.extend(found);
        } else if input.is_file() {
            documents.push(input.clone());
        } else {
            return Err(anyhow!("Input path does not exist: {}", input.display()));
        }
    }

    if documents.is_empty() {
        return Err(anyhow!("No subtitle files to process"));
    }
    Ok(documents)
}

// Expand directories into the OTF/TTC files they contain
fn collect_fonts(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let extensions = ["otf".to_string(), "ttc".to_string()];
    let mut fonts = Vec::new();

    for input in inputs {
        if input.is_dir() {
            fonts.extend(FileManager::find_files(input, &extensions));
        } else if input.is_file() {
            fonts.push(input.clone());
        } else {
            return Err(anyhow!("Input path does not exist: {}", input.display()));
        }
    }

    if fonts.is_empty() {
        return Err(anyhow!("No font files to convert"));
    }
    Ok(fonts)
}

fn print_requirements(requirements: &RequirementSet) {
    println!("Font names: {}", requirements.name_count());
    for name in requirements.names() {
        println!("  {}", name);
    }
    println!("Glyphs: {}", requirements.glyph_count());
}

fn write_report(report: &Report, path: &Path) -> Result<()> {
    let json = report.to_json().context("Failed to serialize report")?;
    FileManager::write_to_file(path, &json)?;
    info!("Report written to {}", path.display());
    Ok(())
}

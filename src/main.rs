use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use lore_core::{LoreConfig, LoreError, OutputFormat, Priority, RepositoryActivity};
use lore_expertise::ownership::{FileExpert, FileExpertise};
use lore_expertise::{assemble, find_experts_for_file, AnalysisOptions, ExpertiseAnalysis};

#[derive(Parser)]
#[command(
    name = "lore",
    version,
    about = "Who knows what in your repository",
    long_about = "Lore turns repository activity into an expertise map: who owns which files,\n\
                   where knowledge is concentrated, and what to do about it.\n\n\
                   Input is a normalized activity snapshot (JSON), produced by any adapter\n\
                   over git or a hosting provider's API.\n\n\
                   Examples:\n  \
                     lore analyze --activity activity.json            Full expertise analysis\n  \
                     cat activity.json | lore analyze --activity -   Read the snapshot from stdin\n  \
                     lore analyze --activity a.json --format json > analysis.json\n  \
                     lore experts src/auth/session.rs --analysis analysis.json\n  \
                     lore fingerprint --activity activity.json       Cache key for a snapshot"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .lore.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Build the expertise analysis for an activity snapshot
    #[command(long_about = "Build the expertise analysis for an activity snapshot.\n\n\
                      Scores contributors, detects specializations, maps file ownership,\n\
                      evaluates team health, and derives management insights.\n\n\
                      Examples:\n  \
                        lore analyze --activity activity.json\n  \
                        lore analyze --activity activity.json --top 5 --format markdown")]
    Analyze {
        /// Activity snapshot JSON file, or '-' for stdin
        #[arg(long)]
        activity: PathBuf,

        /// Rows to show per table in text and markdown output
        #[arg(long, default_value = "10")]
        top: usize,
    },
    /// Show who knows a file best
    #[command(long_about = "Show who knows a file best.\n\n\
                      Looks the path up in a saved analysis (from 'lore analyze --format json'),\n\
                      or computes one on the fly from an activity snapshot.\n\n\
                      Examples:\n  \
                        lore experts src/auth/session.rs --analysis analysis.json\n  \
                        lore experts ./src/main.rs --activity activity.json")]
    Experts {
        /// File path, relative to the repository root
        path: String,

        /// Saved analysis JSON file
        #[arg(long, conflicts_with = "activity", required_unless_present = "activity")]
        analysis: Option<PathBuf>,

        /// Activity snapshot JSON file, or '-' for stdin
        #[arg(long)]
        activity: Option<PathBuf>,
    },
    /// Print the content fingerprint of an activity snapshot
    #[command(long_about = "Print the content fingerprint of an activity snapshot.\n\n\
                      Snapshots with the same repository, commits, contributors and files\n\
                      share a fingerprint; use it as a cache key for saved analyses.")]
    Fingerprint {
        /// Activity snapshot JSON file, or '-' for stdin
        #[arg(long)]
        activity: PathBuf,
    },
    /// Create a default .lore.toml configuration file
    #[command(long_about = "Create a default .lore.toml configuration file.\n\n\
                      Writes a commented template in the current directory.\n\
                      Refuses to overwrite an existing file.")]
    Init,
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1m\x1b[33m◆\x1b[0m \x1b[1mlore\x1b[0m v{version}, who knows what in your repository\n");

        println!("Quick start:");
        println!("  \x1b[36mlore init\x1b[0m                               Create a .lore.toml config file");
        println!("  \x1b[36mlore analyze --activity activity.json\x1b[0m   Map expertise across the team\n");

        println!("All commands:");
        println!("  \x1b[32manalyze\x1b[0m      Expertise, ownership, team health, insights");
        println!("  \x1b[32mexperts\x1b[0m      Who knows a file best");
        println!("  \x1b[32mfingerprint\x1b[0m  Cache key for an activity snapshot");
        println!("  \x1b[32minit\x1b[0m         Create default configuration\n");
    } else {
        println!("lore v{version}, who knows what in your repository\n");

        println!("Quick start:");
        println!("  lore init                               Create a .lore.toml config file");
        println!("  lore analyze --activity activity.json   Map expertise across the team\n");

        println!("All commands:");
        println!("  analyze      Expertise, ownership, team health, insights");
        println!("  experts      Who knows a file best");
        println!("  fingerprint  Cache key for an activity snapshot");
        println!("  init         Create default configuration\n");
    }

    println!("Run 'lore <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LoreConfig> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            LoreConfig::from_file(path)
                .into_diagnostic()
                .wrap_err(format!("loading {}", path.display()))
        }
        None => {
            let default_path = Path::new(".lore.toml");
            if default_path.exists() {
                tracing::debug!("loading ./.lore.toml");
                LoreConfig::from_file(default_path)
                    .into_diagnostic()
                    .wrap_err("loading .lore.toml")
            } else {
                tracing::debug!("no configuration file, using defaults");
                Ok(LoreConfig::default())
            }
        }
    }
}

fn read_activity(path: &Path) -> Result<RepositoryActivity> {
    let parsed = if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .into_diagnostic()
            .wrap_err("reading stdin")?;
        RepositoryActivity::from_json(&input)
    } else {
        RepositoryActivity::from_file(path)
    };

    parsed.map_err(|e| activity_diagnostic(e, path))
}

fn activity_diagnostic(err: LoreError, path: &Path) -> miette::Report {
    match err {
        LoreError::FileNotFound(_) => miette::miette!(
            help = "Pass the path of an activity snapshot JSON file, or '-' to read stdin",
            "Activity snapshot not found: {}",
            path.display()
        ),
        LoreError::EmptyActivity => miette::miette!(
            help = "The snapshot needs at least one contributor with one commit",
            "{}",
            err
        ),
        LoreError::MalformedActivity(_) => miette::miette!(
            help = "Regenerate the snapshot; contributor and file maps must agree with the commits",
            "{}",
            err
        ),
        other => miette::miette!("{}", other).wrap_err(format!("reading {}", path.display())),
    }
}

fn analyze(activity_path: &Path, config: &LoreConfig) -> Result<ExpertiseAnalysis> {
    let options = AnalysisOptions::from_config(config).into_diagnostic()?;
    let activity = read_activity(activity_path)?;

    eprintln!(
        "Analyzing {} ({} commits, {} contributors, {} files)...",
        activity.repository_id,
        activity.commits.len(),
        activity.contributors.len(),
        activity.files.len()
    );

    assemble(&activity, &options).map_err(|e| activity_diagnostic(e, activity_path))
}

fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "\x1b[31m",
        Priority::Medium => "\x1b[33m",
        Priority::Low => "\x1b[36m",
    }
}

fn print_analysis_text(analysis: &ExpertiseAnalysis, top: usize, use_color: bool) {
    let health = &analysis.team_health_metrics;
    let (bold, reset) = if use_color {
        ("\x1b[1m", "\x1b[0m")
    } else {
        ("", "")
    };

    println!("{bold}Expertise analysis: {}{reset}", analysis.repository);
    println!(
        "Contributors: {}  Files: {}  Risk: {}/100  Knowledge sharing: {}%\n",
        analysis.expert_profiles.len(),
        analysis.total_files,
        health.knowledge_distribution.risk_score,
        health.collaboration_metrics.knowledge_sharing,
    );

    println!("{bold}Experts (top {top}):{reset}");
    println!("{:-<72}", "");
    for (i, p) in analysis.expert_profiles.iter().take(top).enumerate() {
        let role = p.team_role.map(|r| r.to_string()).unwrap_or_default();
        println!(
            "{:>2}. {:<28} {:>3}%  commits={:<5} {:<10} {}",
            i + 1,
            p.name,
            p.expertise_percent,
            p.contributions,
            role,
            p.specializations.join(", "),
        );
    }
    println!();

    println!("{bold}Most-changed files (top {top}):{reset}");
    println!("{:-<72}", "");
    for f in busiest_files(analysis, top) {
        let owner = f
            .experts
            .first()
            .map(|e| format!("{} ({:.1})", e.name, e.score))
            .unwrap_or_default();
        println!(
            "  {:<40} touches={:<4} {:<6}  {owner}",
            f.file_path, f.touches, f.change_frequency
        );
    }
    println!();

    println!("{bold}Insights:{reset}");
    println!("{:-<72}", "");
    for insight in &analysis.management_insights {
        if use_color {
            println!(
                "  {}[{}]{reset} {}: {bold}{}{reset}",
                priority_color(insight.priority),
                insight.priority,
                insight.category,
                insight.title
            );
        } else {
            println!(
                "  [{}] {}: {}",
                insight.priority, insight.category, insight.title
            );
        }
        if !insight.description.is_empty() {
            println!("      {}", insight.description);
        }
        for item in &insight.action_items {
            println!("      - {item}");
        }
    }
}

fn print_analysis_markdown(analysis: &ExpertiseAnalysis, top: usize) {
    let health = &analysis.team_health_metrics;

    println!("# Expertise Analysis: {}\n", analysis.repository);
    println!("- **Contributors:** {}", analysis.expert_profiles.len());
    println!("- **Files:** {}", analysis.total_files);
    println!(
        "- **Knowledge concentration risk:** {}/100",
        health.knowledge_distribution.risk_score
    );
    println!(
        "- **Knowledge sharing:** {}% ({} collaborative commits)\n",
        health.collaboration_metrics.knowledge_sharing,
        health.collaboration_metrics.collaborative_commits
    );

    println!("## Experts\n");
    println!("| Rank | Name | Expertise | Commits | Role | Specializations |");
    println!("|------|------|-----------|---------|------|-----------------|");
    for (i, p) in analysis.expert_profiles.iter().take(top).enumerate() {
        println!(
            "| {} | {} | {}% | {} | {} | {} |",
            i + 1,
            p.name,
            p.expertise_percent,
            p.contributions,
            p.team_role.map(|r| r.to_string()).unwrap_or_default(),
            p.specializations.join(", "),
        );
    }
    println!();

    println!("## Most-Changed Files\n");
    println!("| File | Touches | Frequency | Top Expert |");
    println!("|------|---------|-----------|------------|");
    for f in busiest_files(analysis, top) {
        let owner = f
            .experts
            .first()
            .map(|e| format!("{} ({:.1})", e.name, e.score))
            .unwrap_or_default();
        println!(
            "| `{}` | {} | {} | {owner} |",
            f.file_path, f.touches, f.change_frequency
        );
    }
    println!();

    println!("## Insights\n");
    for insight in &analysis.management_insights {
        println!(
            "### {} ({} / {})\n",
            insight.title, insight.category, insight.priority
        );
        if !insight.description.is_empty() {
            println!("{}\n", insight.description);
        }
        if !insight.timeline.is_empty() {
            println!("- **Timeline:** {}", insight.timeline);
        }
        if !insight.impact.is_empty() {
            println!("- **Impact:** {}", insight.impact);
        }
        println!();
        for item in &insight.action_items {
            println!("- [ ] {item}");
        }
        println!();
    }
}

/// Files with the most touches first, ties by path.
fn busiest_files(
    analysis: &ExpertiseAnalysis,
    top: usize,
) -> Vec<&FileExpertise> {
    let mut files: Vec<_> = analysis.file_expertise.iter().collect();
    files.sort_by(|a, b| {
        b.touches
            .cmp(&a.touches)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    files.truncate(top);
    files
}

fn print_experts(path: &str, experts: &[FileExpert], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "filePath": path,
                    "experts": experts,
                }))
                .into_diagnostic()?
            );
        }
        OutputFormat::Markdown => {
            println!("## Experts for `{path}`\n");
            println!("| Rank | Name | Identity | Score | Touches |");
            println!("|------|------|----------|-------|---------|");
            for (i, e) in experts.iter().enumerate() {
                println!(
                    "| {} | {} | {} | {:.2} | {} |",
                    i + 1,
                    e.name,
                    e.identity,
                    e.score,
                    e.touches
                );
            }
        }
        OutputFormat::Text => {
            println!("Experts for {path}:");
            println!("{:-<72}", "");
            for (i, e) in experts.iter().enumerate() {
                println!(
                    "{:>2}. {:<28} {:<32} score={:.2}  touches={}",
                    i + 1,
                    e.name,
                    e.identity,
                    e.score,
                    e.touches
                );
            }
        }
    }
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Lore Configuration
# See: https://github.com/Meru143/lore

[ownership]
# Percentile rank cut points for change-frequency tiers
# medium_from = 0.3333
# high_from = 0.6667

[health]
# Commit message keywords that mark a commit as collaborative
# collaboration_keywords = ["review", "pair", "merge", "thanks", "helped", "co-authored"]

[insights]
# dormant_days = 90
# dormant_min_expertise = 50

# Custom insight rules replace the built-in table
# [[insights.rules]]
# metric = "risk_score"
# comparison = "above"
# threshold = 70.0
# category = "Risk"
# priority = "High"
# title = "Knowledge concentrated in one contributor"
# action_items = ["Pair the top contributor with a second owner"]

# Custom specializations replace the built-in table
# [[specializations]]
# label = "Payments"
# keywords = ["stripe", "invoice"]
# paths = ["*/billing/*"]
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    tracing::debug!(format = %cli.format, "output format");
    if !config.specializations.is_empty() {
        tracing::debug!(
            rules = config.specializations.len(),
            "custom specialization table"
        );
    }
    if !config.insights.rules.is_empty() {
        tracing::debug!(rules = config.insights.rules.len(), "custom insight rules");
    }

    match cli.command {
        None => {
            print_welcome(use_color);
            return Ok(());
        }
        Some(Command::Analyze {
            ref activity,
            top,
        }) => {
            let analysis = analyze(activity, &config)?;
            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&analysis).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => print_analysis_markdown(&analysis, top),
                OutputFormat::Text => print_analysis_text(&analysis, top, use_color),
            }
        }
        Some(Command::Experts {
            ref path,
            ref analysis,
            ref activity,
        }) => {
            let analysis = match (analysis, activity) {
                (Some(saved), _) => ExpertiseAnalysis::from_file(saved)
                    .into_diagnostic()
                    .wrap_err(format!("reading {}", saved.display()))?,
                (None, Some(activity)) => analyze(activity, &config)?,
                (None, None) => miette::bail!("either --analysis or --activity is required"),
            };

            let Some(experts) = find_experts_for_file(&analysis, path) else {
                miette::bail!(miette::miette!(
                    help = "Paths are relative to the repository root, e.g. src/main.rs",
                    "No file {} in the analysis of {}",
                    path,
                    analysis.repository
                ));
            };
            print_experts(path, experts, cli.format)?;
        }
        Some(Command::Fingerprint { ref activity }) => {
            let snapshot = read_activity(activity)?;
            let fingerprint = snapshot.fingerprint();
            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "repository": snapshot.repository_id,
                            "fingerprint": fingerprint,
                        }))
                        .into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    println!("`{}`: `{fingerprint}`", snapshot.repository_id);
                }
                OutputFormat::Text => println!("{fingerprint}"),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(".lore.toml");
            if path.exists() {
                miette::bail!(".lore.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .lore.toml with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "lore", &mut std::io::stdout());
        }
    }

    Ok(())
}

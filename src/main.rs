use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::{ColoredString, Colorize};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cardpull::{
    EnvCredentials, FetchJob, HttpClient, IntegrationStatus, JsonOptions, ProgressEvent,
    ProgressReporter, ReqwestClient, Router, SkippedSource, SourceId, TOKENS, TransportOptions,
    decode_card, decode_card_to_file, default_router, inject_sheet, render_report,
};

// Emoji with fallback for terminals without Unicode support
static CARDS: Emoji<'_, '_> = Emoji("🃏 ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Fetch, decode and modify V2/V3 character cards
#[derive(Parser, Debug)]
#[command(name = "cardpull")]
#[command(about = "Fetch, decode and modify V2/V3 character cards")]
#[command(version)]
struct Cli {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch cards from one or more URLs
    Fetch {
        /// Character page URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Directory the cards are saved to (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// File name format; the token list is filled in at startup
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Decode a card and output its JSON document
    Decode {
        file: PathBuf,

        /// Write the JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON output
        #[arg(short, long)]
        pretty: bool,

        /// Sort object keys for stable output
        #[arg(short, long)]
        stable: bool,
    },

    /// Replace the JSON document embedded in a card, in place
    Inject {
        /// Card image to modify
        card: PathBuf,

        /// JSON document to embed
        json: PathBuf,
    },

    /// List the available sources and check that they are reachable
    Sources {
        /// Render a colored dashboard
        #[arg(short, long)]
        pretty: bool,
    },
}

/// Parse the command line, listing the name tokens in `fetch --format` help
fn parse_cli() -> Cli {
    let keys = TOKENS.iter().map(|t| t.key).collect::<Vec<_>>().join(", ");
    let command = Cli::command().mut_subcommand("fetch", |fetch| {
        fetch.mut_arg("format", |arg| {
            arg.help(format!(
                "File name format (use any of the following tokens): {keys}"
            ))
        })
    });

    let matches = command.get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins; otherwise stay silent so logs don't garble the progress bar
    let default = if verbose { "trace" } else { "off" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Result<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}",
        )?
        .progress_chars("█▓░");

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Ok(Self { bar })
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::UrlsClassified { total, invalid, .. } => {
                self.bar.set_length(total as u64);
                // Invalid URLs are already done
                self.bar.set_position(invalid as u64);
            }

            ProgressEvent::FetchStarting {
                url,
                task_index,
                total_tasks,
            } => {
                self.bar.set_message(format!(
                    "{SEARCH}[{}/{}] {}",
                    (task_index + 1).to_string().cyan(),
                    total_tasks.to_string().cyan(),
                    truncate(&url, 60)
                ));
            }

            ProgressEvent::FetchSucceeded { url, path } => {
                self.bar.inc(1);
                self.bar.println(format!(
                    "{SUCCESS}{} {}",
                    truncate(&url, 60).green(),
                    path.display().to_string().dimmed()
                ));
            }

            ProgressEvent::FetchFailed { url, error, .. } => {
                self.bar.inc(1);
                self.bar.println(format!(
                    "{FAILURE}{} - {}",
                    truncate(&url, 50).red(),
                    error.red()
                ));
            }

            ProgressEvent::BatchCompleted { .. } => {
                self.bar.finish_and_clear();
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn build_router() -> Result<Router> {
    let client: Arc<dyn HttpClient> = Arc::new(
        ReqwestClient::with_options(TransportOptions::default())
            .context("Failed to build HTTP client")?,
    );
    let (router, skipped) = default_router(client, Arc::new(EnvCredentials::new("pygmalion")));
    for SkippedSource { id, reason } in &skipped {
        eprintln!(
            "{WARNING}{}",
            format!("Source '{id}' disabled: {reason}").yellow()
        );
    }
    Ok(router)
}

async fn run_fetch(urls: Vec<String>, output: Option<PathBuf>, format: Option<String>) -> Result<()> {
    // Pre-flight: nothing is classified or fetched if this fails
    let job = FetchJob::prepare(output.as_deref(), format.as_deref())
        .context("Invalid fetch options")?;
    let router = build_router()?;

    let reporter = Arc::new(IndicatifReporter::new()?);
    let report = job.run(&router, &urls, reporter).await;

    println!("\n{}", render_report(&report));
    println!(
        "{FOLDER}Output: {}\n",
        job.output_dir().display().to_string().cyan()
    );

    if report.all_failed() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_decode(file: PathBuf, output: Option<PathBuf>, options: JsonOptions) -> Result<()> {
    match output {
        Some(output) => decode_card_to_file(&file, &output, options)
            .with_context(|| format!("Failed to decode {}", file.display())),
        None => {
            let json = decode_card(&file, options)
                .with_context(|| format!("Failed to decode {}", file.display()))?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&json)?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

/// Background/foreground colors per source, as RGB
fn source_colors(id: SourceId) -> ((u8, u8, u8), (u8, u8, u8)) {
    match id {
        SourceId::CharacterTavern => ((0xe8, 0x3e, 0x8c), (0xff, 0xff, 0xff)),
        SourceId::ChubAi => ((0xe5, 0xe7, 0xeb), (0x1f, 0x29, 0x37)),
        SourceId::Pygmalion => ((0x4b, 0x00, 0x82), (0xff, 0xff, 0xff)),
    }
}

fn status_style(status: &IntegrationStatus, text: &str) -> ColoredString {
    if status.is_available() {
        text.white().on_green().bold()
    } else {
        text.white().on_red().bold()
    }
}

fn render_sources_plain(entries: &[(SourceId, &str, IntegrationStatus)]) -> String {
    let mut out = String::new();
    for (id, _, status) in entries {
        let ((r, g, b), _) = source_colors(*id);
        let status_text = status.to_string();
        let status_text = if status.is_available() {
            status_text.green()
        } else {
            status_text.red()
        };
        out.push_str(&format!(
            "{}: {}\n",
            id.as_str().truecolor(r, g, b).bold(),
            status_text
        ));
    }
    out
}

/// Tiles of label, URL and status, three per row
fn render_sources_dashboard(entries: &[(SourceId, &str, IntegrationStatus)]) -> String {
    let width = entries
        .iter()
        .map(|(id, url, status)| {
            id.as_str()
                .chars()
                .count()
                .max(url.chars().count())
                .max(status.to_string().chars().count())
        })
        .max()
        .unwrap_or(0)
        + 2;

    let tiles: Vec<[String; 3]> = entries
        .iter()
        .map(|(id, url, status)| {
            let ((br, bg, bb), (fr, fg, fb)) = source_colors(*id);
            let paint = |text: &str| {
                format!("{text:^width$}")
                    .truecolor(fr, fg, fb)
                    .on_truecolor(br, bg, bb)
                    .to_string()
            };
            [
                paint(id.as_str()),
                paint(url),
                status_style(status, &format!("{:^width$}", status.to_string())).to_string(),
            ]
        })
        .collect();

    tiles
        .chunks(3)
        .map(|row| {
            (0..3)
                .map(|line| {
                    row.iter()
                        .map(|tile| tile[line].as_str())
                        .collect::<Vec<_>>()
                        .join("  ")
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

async fn run_sources(pretty: bool) -> Result<()> {
    let router = build_router()?;

    let mut entries = Vec::new();
    for (id, base_url) in router
        .sources()
        .map(|s| (s.id(), s.base_url()))
        .collect::<Vec<_>>()
    {
        let status = router.check_integration(id).await;
        tracing::debug!(source = %id, %status, "Integration checked");
        entries.push((id, base_url, status));
    }

    if pretty {
        println!("{}", render_sources_dashboard(&entries));
    } else {
        print!("{}", render_sources_plain(&entries));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();

    // Credentials may live in a .env file; a missing file is fine
    let _ = dotenvy::dotenv();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Fetch {
            urls,
            output,
            format,
        } => {
            println!(
                "\n{}{} {}\n",
                CARDS,
                "cardpull".bold().magenta(),
                "- Character Card Fetcher".dimmed()
            );
            run_fetch(urls, output, format).await
        }

        Command::Decode {
            file,
            output,
            pretty,
            stable,
        } => run_decode(file, output, JsonOptions { pretty, stable }),

        Command::Inject { card, json } => {
            inject_sheet(&card, &json).with_context(|| {
                format!("Failed to inject {} into {}", json.display(), card.display())
            })?;
            println!(
                "{SUCCESS}Injected {} into {}",
                json.display().to_string().cyan(),
                card.display().to_string().cyan()
            );
            Ok(())
        }

        Command::Sources { pretty } => run_sources(pretty).await,
    }
}

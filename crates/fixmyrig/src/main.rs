//! A terminal front-end for the FixMyRig assistant.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fixmyrig::core::chat_log::Role;
use fixmyrig::core::{LinkPolicy, SearchResult};
use fixmyrig::gemini::{GeminiConfigBuilder, GeminiProvider};
use fixmyrig::media::media_type_for_path;
use fixmyrig::{Assistant, AssistantBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";

/// Diagnose PC hardware problems with a Gemini-backed assistant.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// The model to use instead of `GEMINI_MODEL` or the default.
    #[arg(long, global = true)]
    model: Option<String>,
    /// Keep only the first citation of each page in search results.
    #[arg(long, global = true)]
    dedup_links: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat about a problem (the default).
    Chat,
    /// Inspect a photo of a component for damage.
    Inspect {
        /// The image file.
        path: PathBuf,
    },
    /// Search for drivers, manuals and forum solutions.
    Search {
        /// What to look for.
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = GeminiConfigBuilder::from_env()
        .context("no Gemini API key, set GEMINI_API_KEY")?;
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }
    let model_provider = GeminiProvider::new(config.build());

    let link_policy = if cli.dedup_links {
        LinkPolicy::DedupByUrl
    } else {
        LinkPolicy::KeepDuplicates
    };
    let mut assistant = AssistantBuilder::with_model_provider(model_provider)
        .with_link_policy(link_policy)
        .build();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&mut assistant).await,
        Command::Inspect { path } => inspect(&assistant, &path).await,
        Command::Search { query } => search(&assistant, &query.join(" ")).await,
    }
}

/// A line typed into the chat.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Reset,
    Inspect(&'a Path),
    Search(&'a str),
    Message(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };
        match command {
            "/reset" if arg.is_empty() => Self::Reset,
            "/inspect" if !arg.is_empty() => Self::Inspect(Path::new(arg)),
            "/search" if !arg.is_empty() => Self::Search(arg),
            _ => Self::Message(line),
        }
    }
}

async fn chat(assistant: &mut Assistant) -> anyhow::Result<()> {
    if let Some(greeting) = assistant.messages().first() {
        print_model_message(&greeting.text);
    }

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await else {
            break;
        };
        let line = match ReplCommand::parse(&line) {
            ReplCommand::Reset => {
                assistant.reset();
                if let Some(notice) = assistant.messages().first() {
                    print_model_message(&notice.text);
                }
                continue;
            }
            ReplCommand::Inspect(path) => {
                if let Err(err) = inspect(assistant, path).await {
                    print_failure(&format!("{err:#}"));
                }
                continue;
            }
            ReplCommand::Search(query) => {
                if let Err(err) = search(assistant, query).await {
                    print_failure(&format!("{err:#}"));
                }
                continue;
            }
            ReplCommand::Message(line) => line,
        };

        let progress_bar = spinner("🤔 Thinking...")?;
        let mut started = false;
        let result = assistant
            .send_message(line, |fragment| {
                if !started {
                    // Finish the progress bar before printing anything else.
                    progress_bar.finish_and_clear();
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                    started = true;
                }
                print!("{}", fragment.bright_white());
                std::io::stdout().flush().ok();
            })
            .await;
        progress_bar.finish_and_clear();
        if started {
            println!();
        }

        if let Err(err) = result {
            warn!("message was not sent: {err}");
            continue;
        }
        let failed = assistant.messages().last().filter(|message| {
            message.role == Role::Model && message.is_error
        });
        if let Some(message) = failed {
            print_failure(&message.text);
        }
    }

    Ok(())
}

async fn inspect(assistant: &Assistant, path: &Path) -> anyhow::Result<()> {
    let image = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let media_type = media_type_for_path(path);
    debug!("inspecting {} as {media_type}", path.display());

    let progress_bar = spinner("🔍 Inspecting...")?;
    let report = assistant.inspect(image, media_type).await;
    progress_bar.finish_and_clear();

    print_model_message(&report);
    Ok(())
}

async fn search(assistant: &Assistant, query: &str) -> anyhow::Result<()> {
    let progress_bar = spinner("🌐 Searching...")?;
    let result = assistant.search(query).await;
    progress_bar.finish_and_clear();

    let Some(SearchResult { summary, links }) = result else {
        return Ok(());
    };
    print_model_message(&summary);
    for link in links {
        println!(
            "{}🔗 {} {}",
            BAR_CHAR.bright_cyan(),
            link.title.bright_white().bold(),
            link.url.underline()
        );
    }
    Ok(())
}

fn spinner(message: &'static str) -> anyhow::Result<ProgressBar> {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::with_template("{spinner} {wide_msg}")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    progress_bar.set_message(message);
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    Ok(progress_bar)
}

fn print_failure(text: &str) {
    println!("{}⚠️  {}", BAR_CHAR.bright_red(), text.bright_red());
}

fn print_model_message(text: &str) {
    println!("{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

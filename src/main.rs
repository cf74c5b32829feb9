use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use standup_sync::{
    AmbiguousPolicy, AnthropicClient, AnthropicConfig, ConfirmationSurface, Extraction, Extractor,
    JiraClient, JiraConfig, KeyAnchoring, Normalizer, Orchestrator, OrchestratorConfig,
    NormalizedTranscript, ProjectKeys, PromptConfirmation, ReviewOnly, RunReport, list_transcripts,
    pick_transcript, read_transcript,
};

#[derive(Parser)]
#[command(name = "standup-sync")]
#[command(author, version, about = "Turn stand-up transcripts into issue tracker notes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose and commit stand-up notes for every item the transcript mentions
    Process {
        #[command(flatten)]
        source: TranscriptSource,

        /// Comma-separated project keys, e.g. OSC,ML
        #[arg(short, long, env = "STANDUP_PROJECT_KEYS")]
        keys: String,

        /// Only match keys at the start of a word, with a same-line separator
        #[arg(long)]
        strict_keys: bool,

        /// Number of items fetched and analyzed at once
        #[arg(long, default_value = "1")]
        concurrency: usize,

        /// What to do with a blank model response
        #[arg(long, value_enum, default_value_t = Ambiguous::Skip)]
        ambiguous: Ambiguous,

        /// Show proposed notes without committing anything
        #[arg(long)]
        dry_run: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show participants and item references without contacting any service
    Analyze {
        #[command(flatten)]
        source: TranscriptSource,

        /// Comma-separated project keys, e.g. OSC,ML
        #[arg(short, long, env = "STANDUP_PROJECT_KEYS")]
        keys: String,

        /// Only match keys at the start of a word, with a same-line separator
        #[arg(long)]
        strict_keys: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List available transcripts
    List {
        /// Directory holding .txt transcripts
        #[arg(short, long, default_value = "transcripts")]
        dir: PathBuf,
    },
}

/// A transcript path, or its number in the `list` output
#[derive(Debug, Args)]
struct TranscriptSource {
    /// Transcript file (.txt)
    #[arg(short, long, required_unless_present = "pick", conflicts_with = "pick")]
    input: Option<PathBuf>,

    /// Number of a transcript as shown by `list`
    #[arg(long)]
    pick: Option<usize>,

    /// Directory searched by --pick
    #[arg(short, long, default_value = "transcripts")]
    dir: PathBuf,
}

impl TranscriptSource {
    fn resolve(&self) -> Result<PathBuf> {
        match (&self.input, self.pick) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(number)) => pick_transcript(&self.dir, number),
            (None, None) => bail!("Either --input or --pick is required"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Ambiguous {
    Skip,
    Fail,
}

impl From<Ambiguous> for AmbiguousPolicy {
    fn from(value: Ambiguous) -> Self {
        match value {
            Ambiguous::Skip => AmbiguousPolicy::Skip,
            Ambiguous::Fail => AmbiguousPolicy::Fail,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            source,
            keys,
            strict_keys,
            concurrency,
            ambiguous,
            dry_run,
            verbose,
        } => {
            setup_logging(verbose);
            let config = OrchestratorConfig {
                ambiguous_policy: ambiguous.into(),
                analysis_concurrency: concurrency,
            };
            process_transcript(&source, &keys, anchoring(strict_keys), config, dry_run).await
        }
        Commands::Analyze {
            source,
            keys,
            strict_keys,
            verbose,
        } => {
            setup_logging(verbose);
            analyze_transcript(&source, &keys, anchoring(strict_keys))
        }
        Commands::List { dir } => {
            setup_logging(false);
            list(dir)
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn anchoring(strict_keys: bool) -> KeyAnchoring {
    if strict_keys {
        KeyAnchoring::WordBoundary
    } else {
        KeyAnchoring::Loose
    }
}

/// Validate the key set and compile the text stages for it
fn build_stages(
    keys: &str,
    anchoring: KeyAnchoring,
) -> Result<(ProjectKeys, Normalizer, Extractor)> {
    let keys = ProjectKeys::parse(keys).context("Invalid project keys")?;
    let normalizer = Normalizer::new(&keys, anchoring).context("Invalid project keys")?;
    let extractor = Extractor::new(&keys).context("Invalid project keys")?;
    Ok((keys, normalizer, extractor))
}

/// Normalize and extract; shared by `process` and `analyze`.
/// Keys are checked before the transcript is touched.
fn prepare(
    source: &TranscriptSource,
    keys: &str,
    anchoring: KeyAnchoring,
) -> Result<(NormalizedTranscript, Extraction)> {
    let (keys, normalizer, extractor) = build_stages(keys, anchoring)?;

    let input = source.resolve()?;
    info!("Loading transcript from {:?}", input);
    let transcript = read_transcript(&input).context("Failed to load transcript")?;
    info!("Loaded {} lines, project keys {}", transcript.line_count(), keys);

    let normalized = normalizer.normalize(&transcript);
    let extraction = extractor.extract(&normalized);
    Ok((normalized, extraction))
}

async fn process_transcript(
    source: &TranscriptSource,
    keys: &str,
    anchoring: KeyAnchoring,
    config: OrchestratorConfig,
    dry_run: bool,
) -> Result<()> {
    let (normalized, extraction) = prepare(source, keys, anchoring)?;

    if extraction.references.is_empty() {
        info!("No item references found, nothing to do");
        return Ok(());
    }

    let jira = JiraClient::new(JiraConfig::from_env()?);
    let model = AnthropicClient::new(AnthropicConfig::from_env()?);
    let confirmation: Arc<dyn ConfirmationSurface> = if dry_run {
        info!("Dry run: notes are shown but never committed");
        Arc::new(ReviewOnly)
    } else {
        Arc::new(PromptConfirmation::stdio())
    };

    let orchestrator = Orchestrator::new(Arc::new(jira), Arc::new(model), confirmation, config)
        .with_mentions(extraction.mentions);
    let report = orchestrator.run(&normalized, &extraction.references).await;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("Summary");
    println!("=======");
    for item in &report.items {
        match &item.result {
            Ok(outcome) => println!("{}: {}", item.reference, outcome),
            Err(e) => println!("{}: failed ({})", item.reference, e),
        }
    }
    println!();
    println!(
        "{} committed, {} declined, {} without new information, {} failed",
        report.committed(),
        report.declined(),
        report.skipped(),
        report.failed()
    );
}

fn analyze_transcript(source: &TranscriptSource, keys: &str, anchoring: KeyAnchoring) -> Result<()> {
    let (_, extraction) = prepare(source, keys, anchoring)?;

    println!("Transcript Analysis");
    println!("==================");
    println!("Participants ({}):", extraction.participants.len());
    for participant in &extraction.participants {
        println!("  {}", participant);
    }
    println!();

    println!("Item References ({}):", extraction.references.len());
    for reference in &extraction.references {
        let speakers: Vec<&str> = extraction
            .mentions
            .get(reference)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default();
        if speakers.is_empty() {
            println!("  {}", reference);
        } else {
            println!("  {} (raised by {})", reference, speakers.join(", "));
        }
    }

    Ok(())
}

fn list(dir: PathBuf) -> Result<()> {
    let transcripts = list_transcripts(&dir)?;
    if transcripts.is_empty() {
        println!("No transcripts found in {:?}", dir);
        return Ok(());
    }

    println!("Available transcripts:");
    for (index, path) in transcripts.iter().enumerate() {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        println!("{}. {}", index + 1, name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(input: PathBuf) -> TranscriptSource {
        TranscriptSource {
            input: Some(input),
            pick: None,
            dir: PathBuf::from("transcripts"),
        }
    }

    #[test]
    fn test_build_stages_rejects_bad_keys() {
        for keys in ["", " , ", "OSC,1AB", "O-SC"] {
            let err = build_stages(keys, KeyAnchoring::Loose).unwrap_err();
            assert!(err.to_string().contains("Invalid project keys"), "{keys:?}");
        }
        assert!(build_stages("osc,ML", KeyAnchoring::WordBoundary).is_ok());
    }

    #[tokio::test]
    async fn test_key_errors_come_before_input_and_gateways() {
        let missing = source(PathBuf::from("does-not-exist.txt"));

        let err = process_transcript(
            &missing,
            "OSC,1AB",
            KeyAnchoring::Loose,
            Default::default(),
            true,
        )
        .await
        .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("Invalid project keys"), "{chain}");
        assert!(chain.contains("1AB"), "{chain}");

        let err = process_transcript(
            &missing,
            "OSC",
            KeyAnchoring::Loose,
            Default::default(),
            true,
        )
        .await
        .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("Failed to load transcript"), "{chain}");
    }

    #[tokio::test]
    async fn test_transcript_without_references_needs_no_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.txt");
        std::fs::write(&path, "Alice: nothing to report\nBob: same here\n").unwrap();

        let quiet = source(path);
        process_transcript(&quiet, "OSC", KeyAnchoring::Loose, Default::default(), true)
            .await
            .unwrap();
    }

    #[test]
    fn test_pick_resolves_through_listing() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let picked = TranscriptSource {
            input: None,
            pick: Some(2),
            dir: dir.path().to_path_buf(),
        };

        assert!(picked.resolve().unwrap().ends_with("b.txt"));
    }

    #[test]
    fn test_cli_requires_a_transcript_source() {
        assert!(Cli::try_parse_from(["standup-sync", "analyze", "--keys", "OSC"]).is_err());
        assert!(
            Cli::try_parse_from(["standup-sync", "analyze", "--keys", "OSC", "--pick", "1"]).is_ok()
        );
        assert!(
            Cli::try_parse_from([
                "standup-sync", "analyze", "--keys", "OSC", "--pick", "1", "--input", "a.txt"
            ])
            .is_err()
        );
    }
}

//! CLI tool to convert a project export (JSON) to Automerge binary format.
//!
//! Usage:
//!   stories2automerge --input project.json [--output project.automerge] [--validate] [--stats] [--config editor.yaml]

mod input;
mod transform;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use input::InputProject;
use storycollab::validation::MarkdownValidator;
use storycollab::{load_config, EditorConfig, ProjectManager};

#[derive(Parser, Debug)]
#[command(
    name = "stories2automerge",
    about = "Convert a chatbot project export to Automerge binary format",
    version
)]
struct Args {
    /// Input JSON file path (project export)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (defaults to input path with .automerge extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Editor configuration (YAML)
    #[arg(long, env = "STORYCOLLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Validate output by hydrating back to structs
    #[arg(long, default_value = "false")]
    validate: bool,

    /// Print statistics, including validation counts per story
    #[arg(long, default_value = "false")]
    stats: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stories2automerge={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 1. Load configuration
    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    debug!(?config, "Using editor configuration");

    // 2. Validate input exists
    let input_path = &args.input;
    if !input_path.exists() {
        anyhow::bail!("Input file does not exist: {}", input_path.display());
    }

    // 3. Read and parse JSON
    let json_content =
        std::fs::read_to_string(input_path).context("Failed to read input file")?;
    let input: InputProject =
        serde_json::from_str(&json_content).context("Failed to parse JSON")?;

    let project_id = input.id.clone();
    let num_stories = input.stories.len();
    let total_stories: usize = input.stories.iter().map(|s| s.tree_size()).sum();
    let num_responses = input.responses.len();

    // 4. Transform to Rust model
    let root = transform::into_root(input, &config.default_language)
        .context("Failed to convert stories")?;

    // 5. Create Automerge document and save
    let mut manager =
        ProjectManager::from_root(root).context("Failed to build Automerge document")?;
    let binary = manager.save();

    // 6. Write output
    let output_path = args.output.unwrap_or_else(|| {
        let mut path = input_path.clone();
        path.set_extension("automerge");
        path
    });
    std::fs::write(&output_path, &binary).context("Failed to write output file")?;

    // 7. Optional validation
    if args.validate {
        let mut loaded =
            ProjectManager::from_bytes(&binary).context("Failed to load binary for validation")?;
        let hydrated = loaded
            .get_state()
            .context("Failed to hydrate for validation")?;

        if hydrated.stories.len() != num_stories {
            anyhow::bail!(
                "Validation failed: story count mismatch (expected {}, got {})",
                num_stories,
                hydrated.stories.len()
            );
        }
        let hydrated_total: usize = hydrated.stories.values().map(|s| s.tree_size()).sum();
        if hydrated_total != total_stories {
            anyhow::bail!(
                "Validation failed: branch count mismatch (expected {}, got {})",
                total_stories,
                hydrated_total
            );
        }
        if hydrated.responses.len() != num_responses {
            anyhow::bail!(
                "Validation failed: response count mismatch (expected {}, got {})",
                num_responses,
                hydrated.responses.len()
            );
        }

        info!("Validation passed");
    }

    // 8. Optional stats
    if args.stats {
        let state = manager.get_state().context("Failed to read document state")?;
        let validator = MarkdownValidator::new().with_known_responses(state.responses.keys());

        println!();
        println!("Conversion statistics:");
        println!("  Project ID: {}", project_id);
        println!("  Language:   {}", state.default_language);
        println!();
        println!("  Input JSON:    {:>10} bytes", json_content.len());
        println!("  Output binary: {:>10} bytes", binary.len());
        println!(
            "  Compression:   {:>10.2}x",
            json_content.len() as f64 / binary.len() as f64
        );
        println!();
        println!("  Stories:   {}", num_stories);
        println!("  Branches:  {}", total_stories - num_stories);
        println!("  Responses: {}", num_responses);
        println!();
        println!("Validation:");
        for story in state.ordered_stories() {
            let tree = manager
                .validate_story(&story.id, &validator)
                .with_context(|| format!("Failed to validate story {}", story.id))?;
            if tree.total.is_clean() {
                println!("  {:<40} ok", story.title);
                continue;
            }
            let labels: Vec<String> = [tree.total.error_label(), tree.total.warning_label()]
                .into_iter()
                .flatten()
                .collect();
            warn!(story_id = %story.id, errors = tree.total.errors, warnings = tree.total.warnings, "Story has problems");
            println!("  {:<40} {}", story.title, labels.join(", "));
        }
    }

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        "Conversion finished"
    );

    Ok(())
}

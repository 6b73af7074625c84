//! Kiln CLI - idempotent build pipelines

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::warn;

use kiln::config::DEFAULT_CONFIG_FILE;
use kiln::{
    create_toolkit, BuildConfig, BuildEnv, FixSuggestion, KilnError, Options, Pipeline, Project,
    TaskRegistry,
};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Kiln - idempotent build pipelines")]
#[command(version)]
struct Cli {
    /// Path to the project config
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Build toolkit (local, mock)
    #[arg(long, global = true, default_value = "local")]
    toolkit: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks in order
    Run {
        /// Task identifiers, executed left to right
        tasks: Vec<String>,

        /// Option as key=value (repeatable)
        #[arg(short = 'o', long = "opt", value_name = "KEY=VALUE")]
        opts: Vec<String>,

        /// YAML file with initial options
        #[arg(long)]
        options: Option<PathBuf>,

        /// Print the event log as JSON
        #[arg(long)]
        events: bool,
    },

    /// List registered tasks
    Tasks,

    /// Print the resolved project configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            tasks,
            opts,
            options,
            events,
        } => run_pipeline(&cli.config, &cli.toolkit, &tasks, &opts, options.as_deref(), events),
        Commands::Tasks => {
            list_tasks();
            Ok(())
        }
        Commands::Config => show_config(&cli.config, &cli.toolkit),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_env(config_path: &Path, toolkit: &str) -> Result<BuildEnv, KilnError> {
    let config = BuildConfig::load(config_path)?;
    let root = match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let root = root.canonicalize()?;

    let toolkit = create_toolkit(toolkit, &root, &config.commands)?;
    let project = Project::resolve(config, &root, toolkit.as_ref())?;
    Ok(BuildEnv::new(project, toolkit))
}

fn run_pipeline(
    config_path: &Path,
    toolkit: &str,
    tasks: &[String],
    pairs: &[String],
    options_file: Option<&Path>,
    show_events: bool,
) -> Result<(), KilnError> {
    let mut options = match options_file {
        Some(path) => Options::from_yaml(&fs::read_to_string(path)?)?,
        None => Options::new(),
    };
    for pair in pairs {
        let (key, value) = Options::parse_pair(pair)?;
        options.set(&key, &value)?;
    }

    if tasks.is_empty() {
        warn!("no tasks given, nothing to do");
    }

    let env = load_env(config_path, toolkit)?;
    let registry = TaskRegistry::builtin();

    println!(
        "{} {} {} | toolkit: {}",
        "→".cyan(),
        env.project.artifact.cyan().bold(),
        env.project.version.cyan(),
        env.toolkit.name().cyan()
    );

    let result = Pipeline::new(&registry, &env).run(options, tasks);

    if show_events {
        let json = serde_json::to_string_pretty(&env.events.to_json()).unwrap_or_default();
        println!("{}", json);
    }

    let final_options = result?;
    let executed = env.events.executed_steps();
    let skipped = env.events.skipped_steps();
    println!(
        "{} {} tasks done ({} steps built, {} up to date)",
        "✓".green(),
        tasks.len(),
        executed.len(),
        skipped.len()
    );

    let yaml = serde_yaml::to_string(&final_options)?;
    if yaml.trim() != "{}" {
        println!("{}", "Options:".cyan().bold());
        print!("{}", yaml);
    }
    Ok(())
}

fn list_tasks() {
    for id in TaskRegistry::builtin().ids() {
        println!("{}", id);
    }
}

fn show_config(config_path: &Path, toolkit: &str) -> Result<(), KilnError> {
    let env = load_env(config_path, toolkit)?;
    print!("{}", serde_yaml::to_string(&env.project)?);
    Ok(())
}

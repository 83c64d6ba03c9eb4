use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{debug, info};
use std::path::{Path, PathBuf};
use temple_core::{marker, Bindings, FsSource, LoaderConfig, MarkerKind, TemplateLoader, TemplateSource};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a template and write the result
    Render {
        /// Template path, relative to the project root
        #[arg(short, long)]
        template: String,

        /// Project root that import paths are resolved against
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Output file path (optional, prints to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Variable binding (format: name=value), may be repeated
        #[arg(long)]
        set: Vec<String>,

        /// JSON file with an object of variable bindings
        #[arg(long)]
        vars: Option<PathBuf>,

        /// Leave undefined variables in the output instead of failing
        #[arg(long)]
        skip_undefined: bool,

        /// Maximum import nesting depth (0 disables the limit)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Disable import cycle detection
        #[arg(long)]
        no_cycle_check: bool,
    },

    /// List the imports and variables a template refers to
    Inspect {
        /// Template path, relative to the project root
        #[arg(short, long)]
        template: String,

        /// Project root that import paths are resolved against
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Print markers as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { template, root, output, set, vars, skip_undefined, max_depth, no_cycle_check } => {
            let mut config = LoaderConfig::try_from_env().context("Invalid TEMPLE_* environment")?;
            if skip_undefined {
                config = config.with_skip_undefined(true);
            }
            if let Some(depth) = max_depth {
                config = config.with_max_depth((depth > 0).then_some(depth));
            }
            if no_cycle_check {
                config = config.with_cycle_detection(false);
            }
            let bindings = collect_bindings(vars.as_deref(), &set)?;
            let loader = TemplateLoader::new(FsSource::new(root)).with_config(config);
            debug!("Loader config: {:?}", loader.config());
            info!(
                "Rendering {} from {:?} with {} binding(s)",
                template,
                loader.source().root(),
                bindings.len()
            );

            let result = loader
                .load(&template, &bindings)
                .with_context(|| format!("Failed to render template '{}'", template))?;

            if let Some(out_path) = output {
                std::fs::write(&out_path, &result).context("Failed to write output file")?;
                info!("Success! Output written to {:?}", out_path);
            } else {
                print!("{}", result);
            }
        }
        Commands::Inspect { template, root, json } => {
            let source = FsSource::new(root);
            let content = source
                .read_text(&template)
                .with_context(|| format!("Failed to read template '{}'", template))?;
            let markers = marker::scan(&content);

            if json {
                println!("{}", serde_json::to_string_pretty(&markers)?);
            } else {
                for m in &markers {
                    let kind = match m.kind {
                        MarkerKind::Import => "import",
                        MarkerKind::Variable => "variable",
                    };
                    let line = content[..m.start].matches('\n').count() + 1;
                    println!("{:>5}  {:<8}  {}", line, kind, m.payload);
                }
            }
        }
    }

    Ok(())
}

/// Build the binding set from an optional JSON file plus `name=value` overrides.
fn collect_bindings(vars: Option<&Path>, set: &[String]) -> Result<Bindings> {
    let mut bindings = match vars {
        Some(path) => Bindings::from_json_file(path)
            .with_context(|| format!("Failed to read bindings from {:?}", path))?,
        None => Bindings::new(),
    };

    for assignment in set {
        match Bindings::parse_assignment(assignment) {
            Some((name, value)) => {
                bindings.insert(name, value);
            }
            None => bail!("Invalid binding '{}', expected name=value", assignment),
        }
    }

    Ok(bindings)
}

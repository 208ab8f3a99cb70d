//! `msk-synth`: synthesize, validate and look up MSK clusters from the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{debug, LevelFilter};
use msk_constructs_cluster::{
    fetch, Cluster, ClusterProps, ClusterReference, Diagnostic, DiagnosticLevel,
    KafkaLookupClient, LookupField, Stack,
};

/// Exit code when the input produced error diagnostics
const EXIT_DIAGNOSTICS: u8 = 1;
/// Exit code when the command itself failed
const EXIT_FAILURE: u8 = 2;

const DEFAULT_STACK_NAME: &str = "MskStack";
const DEFAULT_CONSTRUCT_ID: &str = "Cluster";

#[derive(Debug, Parser)]
#[command(
    name = "msk-synth",
    version,
    about = "Synthesize CloudFormation templates for Amazon MSK clusters."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the template for the cluster described in a properties file
    Synth {
        /// Cluster properties as camelCase JSON
        #[arg(long, value_name = "FILE")]
        props: PathBuf,

        #[arg(long, env = "MSK_SYNTH_STACK_NAME", default_value = DEFAULT_STACK_NAME)]
        stack_name: String,

        /// Construct id of the cluster inside the stack
        #[arg(long, default_value = DEFAULT_CONSTRUCT_ID)]
        id: String,

        /// Write the template here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit single-line JSON
        #[arg(long)]
        compact: bool,

        /// Connection strings to expose as stack outputs (repeatable)
        #[arg(long = "lookup", value_name = "FIELD")]
        lookups: Vec<LookupField>,
    },

    /// Check a properties file and print every diagnostic
    Validate {
        #[arg(long, value_name = "FILE")]
        props: PathBuf,
    },

    /// Fetch one connection string from a running cluster
    Lookup {
        #[arg(long)]
        cluster_arn: String,

        /// Response field name or its short alias, e.g. bootstrap-brokers-tls
        #[arg(long, value_name = "FIELD")]
        field: LookupField,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Synth {
            props,
            stack_name,
            id,
            output,
            compact,
            lookups,
        } => synth(&props, stack_name, &id, output.as_deref(), compact, &lookups),
        Commands::Validate { props } => validate(&props),
        Commands::Lookup { cluster_arn, field } => lookup(&cluster_arn, field),
    }
}

fn load_props(path: &Path) -> Result<ClusterProps> {
    ClusterProps::from_path(path)
        .with_context(|| format!("Failed to load cluster properties from {}", path.display()))
}

fn report(diagnostics: &[Diagnostic]) -> bool {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
    diagnostics
        .iter()
        .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
}

fn synth(
    props_path: &Path,
    stack_name: String,
    id: &str,
    output: Option<&Path>,
    compact: bool,
    lookups: &[LookupField],
) -> Result<ExitCode> {
    let props = load_props(props_path)?;
    let mut stack = Stack::new(stack_name);
    stack.set_description(format!("Amazon MSK cluster {}", props.cluster_name));

    let cluster = Cluster::new(&mut stack, id, props)?;
    stack.add_output(
        &format!("{id}Arn"),
        cluster.cluster_arn(),
        Some("ARN of the MSK cluster".to_string()),
    )?;

    let mut requested: Vec<LookupField> = Vec::with_capacity(lookups.len());
    for field in lookups {
        if requested.contains(field) {
            continue;
        }
        requested.push(*field);
        let handle = cluster.lookup(&mut stack, *field);
        stack.add_output(
            &format!("{id}{field}"),
            &handle.token(),
            Some(format!("{field} of {id}")),
        )?;
    }

    let synthesis = stack.synthesize()?;
    if report(&synthesis.diagnostics) {
        eprintln!("Synthesis failed; fix the errors above and try again");
        return Ok(ExitCode::from(EXIT_DIAGNOSTICS));
    }

    let rendered = synthesis.template.to_json_string(!compact)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            debug!("Template written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(props_path: &Path) -> Result<ExitCode> {
    let props = load_props(props_path)?;
    let mut stack = Stack::new(DEFAULT_STACK_NAME);
    Cluster::new(&mut stack, DEFAULT_CONSTRUCT_ID, props)?;
    let synthesis = stack.synthesize()?;

    if synthesis.diagnostics.is_empty() {
        println!("No problems found in {}", props_path.display());
        return Ok(ExitCode::SUCCESS);
    }
    if report(&synthesis.diagnostics) {
        return Ok(ExitCode::from(EXIT_DIAGNOSTICS));
    }
    Ok(ExitCode::SUCCESS)
}

fn lookup(cluster_arn: &str, field: LookupField) -> Result<ExitCode> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let value = runtime.block_on(async {
        let client = KafkaLookupClient::new().await;
        fetch(&client, cluster_arn, field).await
    })?;
    println!("{value}");
    Ok(ExitCode::SUCCESS)
}

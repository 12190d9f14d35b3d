use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use command_signature_config::{DispatchConfig, build_dispatcher};
use command_signature_core::{Binding, compile, tokenize};
use tracing_subscriber::EnvFilter;

/// Output format for compiled signatures.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum SignatureFormat {
    Json,
    Yaml,
    Tree,
}

#[derive(Debug, Parser)]
#[command(name = "sigmatch")]
#[command(about = "Compile command signatures and match input lines against them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a signature and print its tree.
    Compile(CompileArgs),
    /// Print the classified tokens of an input line as JSON.
    Tokenize(TokenizeArgs),
    /// Dispatch an input line to a configured command and print the binding.
    Match(MatchArgs),
    /// Load a config file and compile every signature in it.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Signature text, e.g. "(str) name [(int) --times]".
    #[arg(allow_hyphen_values = true)]
    signature: String,
    #[arg(long, default_value = "tree")]
    format: SignatureFormat,
}

#[derive(Debug, Args)]
struct TokenizeArgs {
    /// Input words; joined with single spaces.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    input: Vec<String>,
}

#[derive(Debug, Args)]
struct MatchArgs {
    /// YAML or JSON dispatcher config.
    #[arg(long)]
    config: PathBuf,
    /// Apply the configured fallback policy instead of reporting every failure.
    #[arg(long)]
    respect_fallback: bool,
    /// Command name to dispatch to.
    command: String,
    /// Input words; joined with single spaces.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    input: Vec<String>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// YAML or JSON dispatcher config.
    #[arg(long)]
    config: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compile(args) => run_compile(args),
        Command::Tokenize(args) => run_tokenize(args),
        Command::Match(args) => run_match(args),
        Command::Check(args) => run_check(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_compile(args: CompileArgs) -> Result<(), String> {
    let signature = compile(&args.signature).map_err(|err| err.to_string())?;
    let rendered = match args.format {
        SignatureFormat::Tree => signature.render_tree(),
        SignatureFormat::Json => serde_json::to_string_pretty(&signature)
            .map_err(|err| format!("Failed to serialize signature: {err}"))?,
        SignatureFormat::Yaml => serde_yaml::to_string(&signature)
            .map_err(|err| format!("Failed to serialize signature: {err}"))?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn run_tokenize(args: TokenizeArgs) -> Result<(), String> {
    let tokens = tokenize(&args.input.join(" "));
    let raw = serde_json::to_string_pretty(&tokens)
        .map_err(|err| format!("Failed to serialize tokens: {err}"))?;
    println!("{raw}");
    Ok(())
}

fn run_match(args: MatchArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let dispatcher = build_dispatcher(&config).map_err(|err| err.to_string())?;
    let input = args.input.join(" ");

    let binding = if args.respect_fallback {
        dispatcher
            .dispatch(&args.command, &input)
            .map_err(|err| err.to_string())?
    } else {
        Some(
            dispatcher
                .resolve(&args.command, &input)
                .map_err(|err| err.to_string())?,
        )
    };

    match binding {
        Some(binding) => print_binding(&binding),
        None => {
            println!("null");
            Ok(())
        }
    }
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let dispatcher = build_dispatcher(&config).map_err(|err| err.to_string())?;

    let commands = dispatcher.commands();
    let signatures: usize = commands.iter().map(|c| c.signatures().len()).sum();
    for command in &commands {
        println!("{}", command.name());
        for signature in command.signatures() {
            println!("  {}", signature.source());
        }
    }
    println!(
        "Checked {} command(s), {} signature(s), {} custom type(s).",
        commands.len(),
        signatures,
        dispatcher.types().len()
    );
    Ok(())
}

fn load_config(path: &Path) -> Result<DispatchConfig, String> {
    DispatchConfig::load(path)
        .map_err(|err| format!("Failed to load '{}': {err}", path.display()))
}

fn print_binding(binding: &Binding) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(binding)
        .map_err(|err| format!("Failed to serialize binding: {err}"))?;
    println!("{raw}");
    Ok(())
}

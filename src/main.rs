use clap::{Parser as ClapParser, Subcommand};
use jf_lang::cli::{self, CliError, RunOptions, RunResult};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "jf")]
#[command(about = "jf - terse pipeline queries over streams of JSON records")]
#[command(version)]
struct Cli {
    /// Log compiler and engine steps (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and run it over JSON records
    Run {
        /// The query, e.g. 'map(x.id), filter(.id > 1)'
        query: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Print the compiled pipeline instead of running it
        #[arg(long)]
        explain: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Run {
            query,
            input,
            pretty,
            explain,
        } => run(query, input, pretty, explain),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(query: String, input: Option<String>, pretty: bool, explain: bool) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !explain && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = RunOptions {
        query,
        input,
        pretty,
        explain,
    };

    match cli::execute_run(&options)? {
        RunResult::Explain(description) => println!("{}", description),
        RunResult::Success { output, .. } => println!("{}", output),
    }
    Ok(())
}

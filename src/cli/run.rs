//! Compile jf queries and run them against JSON input

use log::debug;

use super::{CliError, parse_records};
use crate::{Engine, Value, compile, output::JsonPrinter};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// The jf query to compile
    pub query: String,
    /// JSON input: one array of records, or a stream of documents
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Print the compiled pipeline instead of running it
    pub explain: bool,
}

/// Result of a run operation
#[derive(Debug)]
pub enum RunResult {
    /// Textual description of the compiled pipeline
    Explain(String),
    /// Records produced by the pipeline, in order, and their JSON text
    Success { records: Vec<Value>, output: String },
}

/// Execute a jf run operation
pub fn execute_run(options: &RunOptions) -> Result<RunResult, CliError> {
    let pipeline = compile(&options.query)?;
    debug!("compiled {} stage(s): {}", pipeline.len(), pipeline);

    if options.explain {
        return Ok(RunResult::Explain(pipeline.to_string()));
    }

    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let records = parse_records(input)?;
    debug!("read {} record(s)", records.len());

    let records = Engine::new()
        .run(&pipeline, records)
        .collect::<Result<Vec<_>, _>>()?;
    let output = JsonPrinter::new(options.pretty).print_stream(&records);
    Ok(RunResult::Success { records, output })
}

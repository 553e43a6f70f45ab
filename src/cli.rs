//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

/// Annotate Python function signatures with type hints using an external
/// text-completion service.
#[derive(Debug, Parser)]
#[command(name = "auto-typer", version)]
pub struct Cli {
    /// Path to a Python file or a folder of Python files.
    pub path: PathBuf,

    /// Edit files in place instead of writing derived copies.
    #[arg(long)]
    pub inplace: bool,

    /// Naming template for derived output files.
    #[arg(long, default_value = typing_engine::output::DEFAULT_FORMAT)]
    pub format: String,

    /// Run the full pipeline but write nothing to disk.
    #[arg(long)]
    pub pretend: bool,

    /// Maximum full-file passes per file; -1 for unlimited.
    #[arg(long = "max-tries", default_value_t = 3, allow_negative_numbers = true)]
    pub max_tries: i64,

    /// Files processed concurrently (functions within a file stay sequential).
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Prompt budget in estimated tokens.
    #[arg(long = "token-budget", default_value_t = 2048)]
    pub token_budget: usize,

    /// Output-token ceiling per completion call.
    #[arg(long = "max-output-tokens", default_value_t = 64)]
    pub max_output_tokens: u32,
}

impl Cli {
    pub fn engine_config(&self) -> typing_engine::EngineConfig {
        typing_engine::EngineConfig {
            max_tries: self.max_tries,
            token_budget: self.token_budget,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

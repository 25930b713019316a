use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "refute",
    version,
    about = "Checks claimed SQL counterexamples by running both queries on the claimed database"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute the counterexamples of false-positive candidates
    Verify(VerifyArgs),
    /// Print the false-positive breakdown of a results CSV
    Score(ScoreArgs),
    /// Execution accuracy of predicted queries on benchmark databases
    Ex(ExArgs),
    /// Ask an external prover about every question at bounds 1..=max
    Prove(ProveArgs),
    Init(InitArgs),
    Version,
}

/// Settings shared by every command that schedules work.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct RunOpts {
    /// YAML harness settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long, alias = "timeout_seconds")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Parser, Clone, Debug)]
pub struct VerifyArgs {
    /// Prover results CSV with a 'counterexample' column
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "verification_results.csv")]
    pub out: PathBuf,

    /// Compare rows as sequences instead of multisets
    #[arg(long, alias = "order_sensitive")]
    pub order_sensitive: bool,

    /// List every failed attack
    #[arg(long)]
    pub list: bool,

    /// Write the relabelled dataset to ATTACK_UPDATED.csv next to the input
    #[arg(long, alias = "update_original")]
    pub update_original: bool,

    #[command(flatten)]
    pub run: RunOpts,
}

#[derive(Parser, Clone, Debug)]
pub struct ScoreArgs {
    #[arg(long)]
    pub input: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct ExArgs {
    /// JSONL with question_id, predicted_sql, gold_sql, db_id and optional difficulty
    #[arg(long)]
    pub pairs: PathBuf,

    /// Directory holding <db_id>/<db_id>.sqlite
    #[arg(long, alias = "db_root_path")]
    pub db_root: PathBuf,

    #[arg(long, alias = "order_sensitive")]
    pub order_sensitive: bool,

    /// Optional per-pair results CSV
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunOpts,
}

#[derive(Parser, Clone, Debug)]
pub struct ProveArgs {
    /// JSONL with question_id, generated_sql, gold_sql, schema and constraints
    #[arg(long)]
    pub questions: PathBuf,

    /// Prover command line; receives each request as JSON on stdin
    #[arg(long, env = "REFUTE_PROVER")]
    pub prover: String,

    #[arg(long, default_value_t = 5)]
    pub max_bound: i64,

    #[arg(long, default_value = "prover_results.csv")]
    pub out: PathBuf,

    #[command(flatten)]
    pub run: RunOpts,
}

#[derive(Parser, Clone, Debug)]
pub struct InitArgs {
    #[arg(long, default_value = "refute.yaml")]
    pub config: PathBuf,
}

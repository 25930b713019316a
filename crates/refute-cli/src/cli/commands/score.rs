use super::exit_codes;
use crate::cli::args::ScoreArgs;
use refute_core::dataset::{Dataset, COL_EQUIVALENT, COL_QUESTION_ID, COL_RES};
use refute_core::report::console;
use refute_core::scoring::breakdown;

pub fn run(args: ScoreArgs) -> anyhow::Result<i32> {
    let dataset = Dataset::read(&args.input)?;
    dataset.require_columns(&[COL_QUESTION_ID, COL_EQUIVALENT, COL_RES])?;
    print!("{}", console::format_breakdown(&breakdown(&dataset.records())));
    Ok(exit_codes::OK)
}

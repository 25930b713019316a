use super::{batch_exit, ctrl_c, exit_codes, harness_config};
use crate::cli::args::VerifyArgs;
use refute_core::dataset::{
    cases_from_records, false_positive_candidates, write_results, Dataset, COL_COUNTEREXAMPLE,
    COL_EQUIVALENT, COL_RES,
};
use refute_core::engine::verify_cases;
use refute_core::errors::HarnessError;
use refute_core::report::console;
use refute_core::scoring::{apply_claim_overrides, breakdown, failed_attacks};

pub const UPDATED_FILE_NAME: &str = "ATTACK_UPDATED.csv";

pub async fn run(args: VerifyArgs) -> anyhow::Result<i32> {
    let cfg = match harness_config(&args.run, args.order_sensitive) {
        Ok(cfg) => cfg,
        Err(code) => return Ok(code),
    };

    let mut dataset = Dataset::read(&args.input)?;
    dataset.require_columns(&[COL_COUNTEREXAMPLE, COL_EQUIVALENT, COL_RES])?;

    let candidates = false_positive_candidates(&dataset.records());
    let cases = cases_from_records(&candidates);
    tracing::info!(
        event = "verify.cases",
        records = dataset.len(),
        candidates = candidates.len(),
        cases = cases.len()
    );
    if cases.is_empty() {
        eprintln!(
            "{}",
            HarnessError::NoCases {
                source_name: args.input.display().to_string()
            }
        );
        return Ok(exit_codes::CONFIG_ERROR);
    }

    let results = match verify_cases(cases, &cfg, ctrl_c()).await {
        Ok(r) => r,
        Err(e) => return batch_exit(e),
    };

    write_results(&args.out, &results, cfg.inline_max_rows)?;
    console::print_case_summary(&results);

    let attacks = failed_attacks(&results);
    print!("{}", console::format_failed_attacks(&attacks, args.list));

    let changed = apply_claim_overrides(&mut dataset, &attacks)?;
    tracing::info!(event = "verify.relabelled", attacks = attacks.len(), rows = changed);
    print!("{}", console::format_breakdown(&breakdown(&dataset.records())));

    if args.update_original {
        let updated = args.input.with_file_name(UPDATED_FILE_NAME);
        dataset.write(&updated)?;
        eprintln!("wrote {}", updated.display());
    }

    println!("Wrote {} results to {}", results.len(), args.out.display());
    Ok(exit_codes::OK)
}

use super::{batch_exit, ctrl_c, exit_codes, harness_config};
use crate::cli::args::ExArgs;
use refute_core::dataset::write_results;
use refute_core::engine::Scheduler;
use refute_core::ex::{ex_executor, ex_flags, ex_tasks, load_pairs};
use refute_core::model::DifficultyBand;
use refute_core::report::console;
use refute_core::scoring::score_by_band;
use std::sync::Arc;

pub async fn run(args: ExArgs) -> anyhow::Result<i32> {
    let cfg = match harness_config(&args.run, args.order_sensitive) {
        Ok(cfg) => cfg,
        Err(code) => return Ok(code),
    };

    let pairs = load_pairs(&args.pairs)?;
    if pairs.is_empty() {
        eprintln!("no pairs found in {}", args.pairs.display());
        return Ok(exit_codes::CONFIG_ERROR);
    }

    let executor = Arc::new(ex_executor(cfg.order_sensitive, cfg.sample_rows));
    let tasks = ex_tasks(&pairs, &args.db_root, executor);
    let results = match Scheduler::new(cfg.workers, cfg.timeout())
        .run(tasks, ctrl_c())
        .await
    {
        Ok(r) => r.into_iter().map(|r| r.value).collect::<Vec<_>>(),
        Err(e) => return batch_exit(e),
    };

    let flags = ex_flags(&results);
    let bands: Vec<Option<DifficultyBand>> = pairs.iter().map(|p| p.band()).collect();
    let labelled = bands.iter().any(Option::is_some);
    let scores = score_by_band(&flags, labelled.then_some(bands.as_slice()))?;

    tracing::info!(
        event = "ex.done",
        pairs = pairs.len(),
        accuracy = scores.total.accuracy_percent
    );
    print!("{}", console::format_band_table("execution accuracy", &scores));

    if let Some(out) = &args.out {
        write_results(out, &results, cfg.inline_max_rows)?;
        eprintln!("wrote {}", out.display());
    }
    Ok(exit_codes::OK)
}

use super::{batch_exit, ctrl_c, exit_codes, harness_config};
use crate::cli::args::ProveArgs;
use refute_core::engine::Scheduler;
use refute_core::provers::{
    load_questions, prover_tasks, write_prover_records, CommandProver, EquivalenceProver,
};
use refute_core::report::console;
use std::sync::Arc;

pub async fn run(args: ProveArgs) -> anyhow::Result<i32> {
    let cfg = match harness_config(&args.run, false) {
        Ok(cfg) => cfg,
        Err(code) => return Ok(code),
    };
    if args.max_bound < 1 {
        eprintln!("config error: --max-bound must be at least 1");
        return Ok(exit_codes::CONFIG_ERROR);
    }

    let questions = load_questions(&args.questions)?;
    let prover: Arc<dyn EquivalenceProver> = Arc::new(CommandProver::from_command_line(&args.prover)?);
    let tasks = prover_tasks(&questions, args.max_bound, Default::default(), prover);
    tracing::info!(
        event = "prove.start",
        questions = questions.len(),
        requests = tasks.len()
    );

    let records = match Scheduler::new(cfg.workers, cfg.timeout())
        .run(tasks, ctrl_c())
        .await
    {
        Ok(r) => r.into_iter().map(|r| r.value).collect::<Vec<_>>(),
        Err(e) => return batch_exit(e),
    };

    write_prover_records(&args.out, &records)?;
    console::print_prover_summary(&records);
    println!("Wrote {} prover results to {}", records.len(), args.out.display());
    Ok(exit_codes::OK)
}

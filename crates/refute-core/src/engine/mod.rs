pub mod cancel;
pub mod executor;
pub mod normalize;
pub mod scheduler;
pub mod tasks;
pub mod timed;

pub use cancel::CancelToken;
pub use executor::CaseExecutor;
pub use normalize::{results_equal, ResultSet};
pub use scheduler::{Indexed, Scheduler};
pub use tasks::{case_tasks, verify_cases, CaseTask};
pub use timed::{TimedRunner, TimedTask};

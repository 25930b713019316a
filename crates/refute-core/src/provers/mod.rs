//! Driving an external SQL-equivalence prover.
//!
//! The prover itself lives outside this crate. It is reached through the
//! [`EquivalenceProver`] trait so the scheduling and bookkeeping can be
//! exercised without it.

pub mod command;
pub mod task;

pub use command::CommandProver;
pub use task::{
    load_questions, prover_tasks, write_prover_records, ProverQuestion, ProverRecord, ProverTask,
};

use crate::engine::CancelToken;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverOptions {
    pub generate_code: bool,
    pub timer: bool,
    pub show_counterexample: bool,
}

impl Default for ProverOptions {
    fn default() -> Self {
        Self {
            generate_code: true,
            timer: true,
            show_counterexample: true,
        }
    }
}

/// One `(query pair, bound)` question for the prover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProverRequest {
    pub sql_a: String,
    pub sql_b: String,
    pub schema: serde_json::Value,
    pub bound_size: i64,
    #[serde(default)]
    pub constraints: serde_json::Value,
    #[serde(default)]
    pub options: ProverOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProverResponse {
    pub equivalent: bool,
    /// Counterexample block text, present when the prover found one.
    #[serde(default, deserialize_with = "text_or_json")]
    pub counterexample: Option<String>,
    #[serde(default)]
    pub time_cost: Option<f64>,
}

// Provers are free to return the counterexample as structured JSON.
fn text_or_json<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

pub trait EquivalenceProver: Send + Sync {
    fn name(&self) -> &str;

    /// Long-running implementations should give up once `cancel` fires.
    fn verify(&self, request: &ProverRequest, cancel: &CancelToken) -> anyhow::Result<ProverResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_accepts_structured_counterexample() {
        let r: ProverResponse =
            serde_json::from_str(r#"{"equivalent": false, "counterexample": {"t": [1]}, "time_cost": 0.5}"#)
                .unwrap();
        assert!(!r.equivalent);
        assert_eq!(r.counterexample.as_deref(), Some(r#"{"t":[1]}"#));
        assert_eq!(r.time_cost, Some(0.5));

        let r: ProverResponse = serde_json::from_str(r#"{"equivalent": true, "counterexample": ""}"#).unwrap();
        assert_eq!(r.counterexample, None);
        assert_eq!(r.time_cost, None);
    }

    #[test]
    fn test_request_defaults() {
        let r: ProverRequest =
            serde_json::from_str(r#"{"sql_a": "A", "sql_b": "B", "schema": {}, "bound_size": 2}"#).unwrap();
        assert_eq!(r.options, ProverOptions::default());
        assert!(r.constraints.is_null());
    }
}

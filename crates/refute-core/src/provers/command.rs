use super::{EquivalenceProver, ProverRequest, ProverResponse};
use crate::engine::CancelToken;
use anyhow::{bail, Context};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs an external program per request: the request goes to stdin as JSON,
/// a [`ProverResponse`] JSON object is read back from stdout. When stdout
/// holds more than the object, the last non-empty line is used.
#[derive(Debug, Clone)]
pub struct CommandProver {
    program: String,
    args: Vec<String>,
}

impl CommandProver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a command line on whitespace.
    pub fn from_command_line(line: &str) -> anyhow::Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("empty prover command");
        };
        Ok(Self::new(program, parts.collect()))
    }
}

fn drain<R: Read + Send + 'static>(mut r: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = r.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn parse_response(stdout: &str) -> anyhow::Result<ProverResponse> {
    let trimmed = stdout.trim();
    if let Ok(r) = serde_json::from_str(trimmed) {
        return Ok(r);
    }
    let last = trimmed
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default();
    serde_json::from_str(last).with_context(|| format!("unparseable prover output: {}", last))
}

impl EquivalenceProver for CommandProver {
    fn name(&self) -> &str {
        &self.program
    }

    fn verify(&self, request: &ProverRequest, cancel: &CancelToken) -> anyhow::Result<ProverResponse> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start prover '{}'", self.program))?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        if let Some(mut stdin) = child.stdin.take() {
            // a prover that exits without reading its input is reported below
            thread::spawn(move || {
                let _ = stdin.write_all(&payload);
            });
        }

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                bail!("prover '{}' cancelled", self.program);
            }
            thread::sleep(POLL_INTERVAL);
        };

        let out = stdout.map(|h| h.join().unwrap_or_default()).unwrap_or_default();
        let err = stderr.map(|h| h.join().unwrap_or_default()).unwrap_or_default();
        if !status.success() {
            bail!(
                "prover '{}' failed ({}): {}",
                self.program,
                status,
                err.trim()
            );
        }
        parse_response(&out)
    }
}

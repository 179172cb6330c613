use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use super::runner::{CommandOutput, CommandRunner, SimctlError};

/// One invocation observed by the mock, with the instant it happened.
///
/// The instant comes from `tokio::time`, so tests running under paused
/// time can assert on exact pacing.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub args: Vec<String>,
    pub at: Instant,
}

/// Scriptable stand-in for the external tool.
///
/// Records every invocation and replays queued results in order. Once
/// the queue is empty every call succeeds with empty output.
#[derive(Clone, Default)]
pub struct MockRunner {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    scripted: Arc<Mutex<VecDeque<Result<CommandOutput, SimctlError>>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the full result of the next unscripted invocation
    pub fn push_result(&self, result: Result<CommandOutput, SimctlError>) {
        self.scripted.lock().unwrap().push_back(result);
    }

    /// Queue a successful invocation with the given stdout
    pub fn push_stdout(&self, stdout: &str) {
        self.push_result(Ok(CommandOutput {
            code: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }));
    }

    /// Queue an invocation that exits nonzero with the given stderr
    pub fn push_failure(&self, code: i32, stderr: &str) {
        self.push_result(Ok(CommandOutput {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }));
    }

    /// Snapshot of every call recorded so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Drain the recorded calls, leaving the mock empty
    pub fn take_calls(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, SimctlError> {
        self.calls.lock().unwrap().push(RecordedCall {
            args: args.iter().map(|s| s.to_string()).collect(),
            at: Instant::now(),
        });

        match self.scripted.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(CommandOutput {
                code: Some(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_arguments_in_order() {
        let mock = MockRunner::new();

        mock.run(&["simctl", "list"]).await.unwrap();
        mock.run(&["simctl", "location"]).await.unwrap();

        let calls = mock.take_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, vec!["simctl", "list"]);
        assert_eq!(calls[1].args, vec!["simctl", "location"]);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_replays_scripted_results_then_succeeds() {
        let mock = MockRunner::new();
        mock.push_failure(1, "no such device");

        let first = mock.run(&["simctl"]).await.unwrap();
        assert_eq!(first.code, Some(1));
        assert_eq!(first.stderr_text(), "no such device");

        let second = mock.run(&["simctl"]).await.unwrap();
        assert!(second.success());
    }
}

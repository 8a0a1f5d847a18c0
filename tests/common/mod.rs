/// Common test utilities and helpers for gitspace tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use gitspace::{
    CommandRunner, GitSettings, Invocation, OutputStream, ProcessFailure, StatusSink,
    SubprocessOutcome, SyncEngine, SyncError,
};

/// What the scripted runner does for the next invocation
#[derive(Debug, Clone)]
pub enum Script {
    /// Exit 0. A successful `clone` leaves a checkout at its target.
    Succeed,
    /// Exit with the given code and stderr lines
    Fail { exit_code: i32, stderr: Vec<String> },
    /// Leave some files behind, then exit non-zero
    FailLeavingFiles { exit_code: i32 },
    /// Behave like an expired timeout
    Timeout,
}

/// Fake git: records every invocation and replays scripted outcomes.
/// Invocations past the end of the script succeed.
#[derive(Default)]
pub struct ScriptedRunner {
    script: Mutex<VecDeque<Script>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new(script: impl IntoIterator<Item = Script>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .filter_map(|i| i.args.first().cloned())
            .collect()
    }
}

fn clone_target(invocation: &Invocation) -> Option<PathBuf> {
    match invocation.args.first().map(String::as_str) {
        Some("clone") => invocation.args.last().map(PathBuf::from),
        _ => None,
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        sink: &dyn StatusSink,
    ) -> Result<SubprocessOutcome, SyncError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Script::Succeed);

        match step {
            Script::Succeed => {
                if let Some(target) = clone_target(invocation) {
                    std::fs::create_dir_all(target.join(".git")).unwrap();
                }
                sink.output(OutputStream::Stdout, "done");
                Ok(SubprocessOutcome::success())
            }
            Script::Fail { exit_code, stderr } => {
                for line in &stderr {
                    sink.output(OutputStream::Stderr, line);
                }
                Err(ProcessFailure {
                    command: invocation.display(),
                    exit_code,
                    signal: None,
                    stderr_lines: stderr,
                }
                .into())
            }
            Script::FailLeavingFiles { exit_code } => {
                if let Some(target) = clone_target(invocation) {
                    std::fs::create_dir_all(target.join(".git")).unwrap();
                    std::fs::write(target.join(".git").join("HEAD"), "partial").unwrap();
                }
                Err(ProcessFailure {
                    command: invocation.display(),
                    exit_code,
                    signal: None,
                    stderr_lines: vec!["fatal: early EOF".to_string()],
                }
                .into())
            }
            Script::Timeout => Err(SyncError::Timeout {
                command: invocation.display(),
                limit: Duration::from_secs(1),
            }),
        }
    }
}

/// One call made on a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Info(String),
    Start(String),
    Succeed(String),
    Fail(String),
    Output(OutputStream, String),
}

/// Sink that remembers everything it was told
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Fail(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Succeed(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl StatusSink for RecordingSink {
    fn info(&self, message: &str) {
        self.push(Event::Info(message.to_string()));
    }

    fn start(&self, message: &str) {
        self.push(Event::Start(message.to_string()));
    }

    fn succeed(&self, message: &str) {
        self.push(Event::Succeed(message.to_string()));
    }

    fn fail(&self, message: &str) {
        self.push(Event::Fail(message.to_string()));
    }

    fn output(&self, stream: OutputStream, line: &str) {
        self.push(Event::Output(stream, line.to_string()));
    }
}

/// Engine over a scripted runner
pub fn engine(
    workspace: impl Into<PathBuf>,
    script: impl IntoIterator<Item = Script>,
) -> SyncEngine<ScriptedRunner> {
    SyncEngine::new(workspace, GitSettings::default(), ScriptedRunner::new(script))
}

pub fn engine_with(
    workspace: impl Into<PathBuf>,
    git: GitSettings,
    script: impl IntoIterator<Item = Script>,
) -> SyncEngine<ScriptedRunner> {
    SyncEngine::new(workspace, git, ScriptedRunner::new(script))
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}

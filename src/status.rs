//! Progress narration for people watching a sync

use std::io::Write;
use tracing::debug;

/// Which subprocess stream a forwarded line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives human-readable progress. Implementations must tolerate being
/// called from any step of a sync, including after a failure.
pub trait StatusSink: Send + Sync {
    fn info(&self, message: &str);
    fn start(&self, message: &str);
    fn succeed(&self, message: &str);
    fn fail(&self, message: &str);

    /// A line of output from a running subprocess
    fn output(&self, _stream: OutputStream, _line: &str) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl StatusSink for NoopSink {
    fn info(&self, _message: &str) {}
    fn start(&self, _message: &str) {}
    fn succeed(&self, _message: &str) {}
    fn fail(&self, _message: &str) {}
}

/// Line-oriented terminal output
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn info(&self, message: &str) {
        println!("ℹ️  {}", message);
    }

    fn start(&self, message: &str) {
        println!("⏳ {}", message);
    }

    fn succeed(&self, message: &str) {
        println!("✅ {}", message);
    }

    fn fail(&self, message: &str) {
        let mut lines = message.lines();
        if let Some(first) = lines.next() {
            eprintln!("❌ {}", first);
        }
        for line in lines {
            eprintln!("   {}", line);
        }
    }

    fn output(&self, stream: OutputStream, line: &str) {
        debug!(?stream, "{}", line);
        // A closed terminal is not an error for the subprocess
        let _ = match stream {
            OutputStream::Stdout => writeln!(std::io::stdout().lock(), "    {}", line),
            OutputStream::Stderr => writeln!(std::io::stderr().lock(), "    {}", line),
        };
    }
}

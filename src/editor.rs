//! Open a synced checkout in the user's editor

use std::path::Path;
use tracing::warn;

use crate::process::{CommandRunner, Invocation};
use crate::status::StatusSink;

/// Run `command <path>`. A failing editor does not undo a sync, so the
/// outcome is only reported and returned as a flag.
pub async fn open<R: CommandRunner>(
    runner: &R,
    command: &str,
    path: &Path,
    sink: &dyn StatusSink,
) -> bool {
    let invocation = match editor_invocation(command, path) {
        Ok(invocation) => invocation,
        Err(reason) => {
            warn!("Bad editor command {:?}: {}", command, reason);
            sink.fail(&format!("Could not open editor: {}", reason));
            return false;
        }
    };

    sink.info(&format!("Opening in {}...", invocation.program));
    match runner.run(&invocation, sink).await {
        Ok(_) => {
            sink.succeed("All good, happy coding");
            true
        }
        Err(e) => {
            warn!("Editor {} failed: {}", command, e);
            sink.fail(&format!("Could not open editor: {}", e.report()));
            false
        }
    }
}

/// Split `command` shell-style, so `code --wait` or `subl -n` work, and
/// append the checkout path as the last argument
pub fn editor_invocation(command: &str, path: &Path) -> Result<Invocation, String> {
    let mut words = shell_words::split(command)
        .map_err(|e| format!("cannot parse editor command `{}`: {}", command, e))?;
    if words.is_empty() {
        return Err("editor command is empty".to_string());
    }

    let program = words.remove(0);
    words.push(path.to_string_lossy().into_owned());
    Ok(Invocation::new(program, words))
}

/// Executable named by an editor command, if it parses
pub fn editor_program(command: &str) -> Option<String> {
    shell_words::split(command).ok()?.into_iter().next()
}

//! Diagnostics and the solver trace.
//!
//! Map building and solving never panic on bad declarations; they report
//! through a [`Diagnostics`] collector and carry on where the original
//! declaration still makes sense. The collector owns the error threshold
//! and an optional handler callback so an embedding shell (an editor
//! integration, say) can re-route messages to its own UI.
//!
//! The solver trace is a separate stream: indented progress lines keyed to
//! the `solver_messages` verbosity variable. It is a user-facing product,
//! not logging.

use ifm_data::Vars;
use log::debug;
use thiserror::Error;

/// How bad a diagnostic is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Internal chatter, only kept when debugging is enabled.
    Debug,
    /// Suspicious but recoverable; never aborts a run.
    Warning,
    /// Wrong; accumulated, and past the threshold the run is abandoned.
    Error,
    /// Wrong enough that the stage cannot continue.
    Fatal,
}

/// One collected message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Errors that abort the pipeline.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("too many errors ({count})")]
    TooManyErrors { count: usize },
    #[error("{message}")]
    Fatal { message: String },
    #[error("{message}")]
    CyclicTasks { count: usize, message: String },
    #[error("can't solve game (stopped after {limit} solver iterations)")]
    StepLimit { limit: u32 },
}

/// Callback handed each diagnostic as it is recorded.
pub type DiagnosticHandler = Box<dyn FnMut(Severity, &str)>;

/// Collector for diagnostics and solver-trace lines.
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    trace: Vec<String>,
    handler: Option<DiagnosticHandler>,
    error_count: usize,
    max_errors: usize,
    verbosity: u32,
    debug_enabled: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            trace: Vec::new(),
            handler: None,
            error_count: 0,
            max_errors: 10,
            verbosity: 0,
            debug_enabled: false,
        }
    }

    /// Route every recorded diagnostic through `handler` as well.
    pub fn with_handler(mut self, handler: DiagnosticHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Adopt the threshold and verbosity a declaration asked for.
    pub fn configure(&mut self, vars: &Vars) {
        self.max_errors = vars.max_errors.max(1) as usize;
        self.verbosity = vars.solver_messages;
    }

    pub fn set_debug(&mut self, on: bool) {
        self.debug_enabled = on;
    }

    fn record(&mut self, severity: Severity, message: String) {
        if let Some(handler) = self.handler.as_mut() {
            handler(severity, &message);
        }
        self.entries.push(Diagnostic { severity, message });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{message}");
        if self.debug_enabled {
            self.record(Severity::Debug, message);
        }
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.record(Severity::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.error_count += 1;
        self.record(Severity::Error, message.into());
    }

    /// Record a fatal diagnostic and return the error that unwinds the run.
    pub fn fatal(&mut self, message: impl Into<String>) -> WorldError {
        let message = message.into();
        self.record(Severity::Fatal, message.clone());
        WorldError::Fatal { message }
    }

    /// Err when accumulated errors have passed the threshold.
    ///
    /// Stages call this between phases so one broken declaration section
    /// cannot drown the user in follow-on complaints.
    pub fn checkpoint(&self) -> Result<(), WorldError> {
        if self.error_count >= self.max_errors {
            Err(WorldError::TooManyErrors {
                count: self.error_count,
            })
        } else {
            Ok(())
        }
    }

    /// Emit a solver-trace line at the given indentation level.
    ///
    /// Levels at or above the `solver_messages` verbosity are dropped, so
    /// verbosity 0 silences the trace entirely.
    pub fn solver(&mut self, level: u32, message: impl AsRef<str>) {
        if level < self.verbosity {
            let indent = "    ".repeat(level as usize);
            self.trace.push(format!("{indent}{}", message.as_ref()));
        }
    }

    pub fn solver_verbose(&self) -> bool {
        self.verbosity > 0
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// All warnings and errors, for tests and table dumps.
    pub fn messages(&self, severity: Severity) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |d| d.severity == severity)
            .map(|d| d.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_trips_at_threshold() {
        let mut diag = Diagnostics::new();
        diag.configure(&Vars {
            max_errors: 2,
            ..Vars::default()
        });
        diag.error("first");
        assert!(diag.checkpoint().is_ok());
        diag.error("second");
        assert!(matches!(
            diag.checkpoint(),
            Err(WorldError::TooManyErrors { count: 2 })
        ));
    }

    #[test]
    fn solver_trace_respects_verbosity() {
        let mut diag = Diagnostics::new();
        diag.configure(&Vars {
            solver_messages: 2,
            ..Vars::default()
        });
        diag.solver(0, "top");
        diag.solver(1, "nested");
        diag.solver(2, "too deep");
        assert_eq!(diag.trace(), ["top", "    nested"]);
    }

    #[test]
    fn handler_sees_diagnostics() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut diag = Diagnostics::new().with_handler(Box::new(move |sev, msg| {
            sink.borrow_mut().push((sev, msg.to_string()));
        }));
        diag.warning("rooms overlap");
        assert_eq!(
            *seen.borrow(),
            vec![(Severity::Warning, "rooms overlap".to_string())]
        );
    }
}

//! The diagnostics sink (spec.md §4.1, component C1).
//!
//! Replaces the original Go implementation's package-level `Log`/`Debug`/
//! `Error`/... functions with an explicit, owned [`Diagnostics`] instance
//! that every pass is handed (or shares, in the HTTP front end) — see
//! DESIGN.md's "per-compilation context" decision.
//!
//! Two independent axes control behavior:
//! - `verbose`: debug-level messages are dropped unless set.
//! - `buffered`: when true, rendered lines are HTML-escaped and appended to
//!   an internal buffer for later retrieval (the HTTP driver's `/compile`
//!   endpoint); when false, lines go straight to the terminal with
//!   category-specific ANSI styling and are never escaped.
//!
//! Concurrent appenders (the HTTP driver may run compilations on separate
//! tokio tasks) serialize through a single [`Mutex`].

use std::sync::Mutex;

/// Severity/category of a single diagnostic line.
///
/// `Pass`/`Fail` are not ordinary severities — they report the outcome of
/// an entire pass (e.g. "Lexer successfully evaluated program 1") and are
/// always shown, independent of `verbose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Pass,
    Fail,
}

impl Level {
    fn ansi_code(self) -> &'static str {
        match self {
            Level::Debug => "\x1b[34m", // blue
            Level::Info => "\x1b[0m",   // default
            Level::Warn => "\x1b[33m",  // yellow
            Level::Error => "\x1b[31m", // red
            Level::Pass => "\x1b[32m",  // green
            Level::Fail => "\x1b[31m",  // red
        }
    }

    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Pass => "PASS",
            Level::Fail => "FAIL",
        }
    }
}

struct Inner {
    verbose: bool,
    buffered: bool,
    lines: Vec<String>,
}

/// The process-wide (or per-request, in the HTTP driver) diagnostics sink.
pub struct Diagnostics {
    inner: Mutex<Inner>,
}

impl Diagnostics {
    /// A sink that writes directly to the terminal.
    pub fn terminal(verbose: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                verbose,
                buffered: false,
                lines: Vec::new(),
            }),
        }
    }

    /// A sink that buffers HTML-escaped lines for later retrieval instead
    /// of writing to the terminal (the HTTP driver's mode).
    pub fn buffered(verbose: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                verbose,
                buffered: true,
                lines: Vec::new(),
            }),
        }
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.inner.lock().unwrap().verbose = verbose;
    }

    /// Emit one diagnostic line tagged with the issuing component
    /// (`"LEXER"`, `"PARSER"`, `"GOPILER"`, ...).
    pub fn emit(&self, level: Level, component: &str, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        if level == Level::Debug && !inner.verbose {
            return;
        }

        if inner.buffered {
            let line = format!(
                "[{}] [{}] {}",
                level.label(),
                html_escape(component),
                html_escape(message)
            );
            inner.lines.push(line);
        } else {
            println!(
                "{}[{}] [{}] {}\x1b[0m",
                level.ansi_code(),
                level.label(),
                component,
                message
            );
        }
    }

    pub fn debug(&self, component: &str, message: &str) {
        self.emit(Level::Debug, component, message);
    }

    pub fn info(&self, component: &str, message: &str) {
        self.emit(Level::Info, component, message);
    }

    pub fn warn(&self, component: &str, message: &str) {
        self.emit(Level::Warn, component, message);
    }

    pub fn error(&self, component: &str, message: &str) {
        self.emit(Level::Error, component, message);
    }

    pub fn pass(&self, component: &str, message: &str) {
        self.emit(Level::Pass, component, message);
    }

    pub fn fail(&self, component: &str, message: &str) {
        self.emit(Level::Fail, component, message);
    }

    /// Reports an uncaught internal failure in one pass (spec.md §7,
    /// "Critical errors"). The offending pass's name is folded into the
    /// message so the operator can tell which phase panicked.
    pub fn critical_error(&self, pass_name: &str, message: &str) {
        self.error(
            "GOPILER",
            &format!("Critical error in {pass_name}: {message}"),
        );
    }

    /// Drains the buffered log (HTTP driver only — panics if this sink is
    /// in terminal mode, since there is nothing to drain).
    pub fn drain(&self) -> String {
        let mut inner = self.inner.lock().unwrap();
        assert!(inner.buffered, "drain() called on a terminal-mode sink");
        inner.lines.join("\n")
    }
}

/// Per-program error/warning counters.
///
/// Each pass owns one of these for the program it is currently compiling
/// (never a global counter) and decides pass/fail from it at the end of
/// the pass, per spec.md §7's propagation rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub errors: u32,
    pub warnings: u32,
}

impl Counters {
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_warning(&mut self) {
        self.warnings += 1;
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_gates_debug_messages() {
        let diag = Diagnostics::buffered(false);
        diag.debug("LEXER", "should not appear");
        assert_eq!(diag.drain(), "");

        diag.set_verbose(true);
        diag.debug("LEXER", "now it appears");
        assert!(diag.drain().contains("now it appears"));
    }

    #[test]
    fn buffered_mode_html_escapes() {
        let diag = Diagnostics::buffered(true);
        diag.error("PARSER", "found <script>");
        let out = diag.drain();
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("<script>"));
    }

    #[test]
    fn counters_track_errors_and_warnings() {
        let mut counters = Counters::default();
        assert!(!counters.has_errors());
        counters.record_warning();
        assert!(!counters.has_errors());
        counters.record_error();
        assert!(counters.has_errors());
        assert_eq!(counters.errors, 1);
        assert_eq!(counters.warnings, 1);
    }
}

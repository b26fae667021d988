//! Logging pack: custom lints keeping pipeline-bus output structured.
//!
//! Pipeline stages see every request and command payload, including
//! credentials wrapped in `Secret`. Output must go through `tracing` so it
//! carries the run id and honors redaction.
//!
//! ## Implemented Lints
//!
//! - `NO_STDIO_PRINT`: Forbids `print!`, `println!`, `eprint!`, `eprintln!`
//!   and `dbg!` in library code.

#![feature(rustc_private)]
#![warn(unused_extern_crates)]

extern crate rustc_ast;
extern crate rustc_lint;
extern crate rustc_session;
extern crate rustc_span;

use rustc_ast::{Expr, ExprKind, MacCall};
use rustc_lint::{EarlyContext, EarlyLintPass};
use rustc_session::{declare_lint_pass, declare_tool_lint};

declare_tool_lint! {
    /// **What it does:** Forbids stdio print macros and `dbg!` in library code.
    ///
    /// **Why is this bad?** These macros write straight to stdout/stderr:
    /// - The output has no `run_id`, so it cannot be tied to a pipeline run
    /// - `dbg!` prints the `Debug` form of whole payloads
    /// - Server integrations capture `tracing` output, not stdio
    ///
    /// **Known problems:** None.
    ///
    /// **Example:**
    /// ```rust,ignore
    /// // Bad
    /// println!("dispatching {}", command.name());
    /// dbg!(&request);
    ///
    /// // Good
    /// tracing::debug!(command = command.name(), "dispatching command");
    /// ```
    pub logging_pack::NO_STDIO_PRINT,
    Deny,
    "use of print!/println!/eprint!/eprintln!/dbg!; use tracing instead"
}

declare_lint_pass!(NoStdioPrint => [NO_STDIO_PRINT]);

impl EarlyLintPass for NoStdioPrint {
    fn check_expr(&mut self, cx: &EarlyContext<'_>, expr: &Expr) {
        if let ExprKind::MacCall(mac) = &expr.kind {
            check_macro(cx, mac, expr.span);
        }
    }
}

/// Maps a forbidden macro to the `tracing` macro that replaces it.
fn replacement(macro_name: &str) -> Option<&'static str> {
    match macro_name {
        "print" | "println" => Some("tracing::info!"),
        "eprint" | "eprintln" => Some("tracing::warn!"),
        "dbg" => Some("tracing::debug!"),
        _ => None,
    }
}

fn check_macro(cx: &EarlyContext<'_>, mac: &MacCall, span: rustc_span::Span) {
    let path = &mac.path;

    // Only bare std macros; `tracing::info!` has two segments
    if path.segments.len() != 1 {
        return;
    }

    let macro_name = path.segments[0].ident.name.as_str();
    let Some(suggested) = replacement(macro_name) else {
        return;
    };

    rustc_lint::LintContext::span_lint(cx, NO_STDIO_PRINT, span, |diag| {
        diag.help(format!("use `{}` for structured logging", suggested));
        diag.note(format!(
            "`{}!` bypasses run-scoped logging and may print unredacted payloads",
            macro_name
        ));
    });
}

#[unsafe(no_mangle)]
#[allow(unsafe_code)]
pub extern "C" fn register_lints(_sess: &rustc_session::Session, lint_store: &mut rustc_lint::LintStore) {
    lint_store.register_lints(&[&NO_STDIO_PRINT]);
    lint_store.register_early_pass(|| Box::new(NoStdioPrint));
}

#[unsafe(no_mangle)]
pub fn dylint_version() -> *mut std::os::raw::c_char {
    std::ffi::CString::new(dylint_linting::DYLINT_VERSION)
        .expect("version string contains null byte")
        .into_raw()
}

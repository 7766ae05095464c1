//! nanoc-drv - Pipeline orchestration.
//!
//! The [`compile`] entry point runs the whole core pipeline over an
//! in-memory source string:
//!
//! ```text
//! source ──lex──▶ tokens ──parse──▶ AST ──check──▶ AST
//!        ──lower──▶ TAC ──optimize──▶ TAC ──gen──▶ asm text
//! ```
//!
//! Each phase consumes its input immutably and produces a fresh value; the
//! first error of any phase aborts compilation. File handling, process exit
//! codes, and the REPL live in the binary ([`repl`], `main.rs`); the
//! library only ever sees strings.

pub mod repl;

use std::fmt::Write as _;

use nanoc_gen::Target;
use nanoc_lex::Token;
use nanoc_par::ast::Program as Ast;
use nanoc_tac::Program as Ir;
use nanoc_util::{CompileError, Diagnostic};
use tracing::debug;

/// Knobs the driver exposes to consumers.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompileOptions {
    pub target: Target,
    /// Keep per-phase artifacts for echoing (REPL, `--emit-phases`).
    pub emit_phases: bool,
}

/// Everything one compilation produces.
#[derive(Debug)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub ast: Ast,
    pub ir: Ir,
    pub optimized_ir: Ir,
    pub asm: String,
    /// Non-fatal diagnostics. Errors arrive through `Err`, so this is
    /// empty today; warnings would land here.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile NanoC source text to assembly, retaining every intermediate
/// artifact.
///
/// # Example
///
/// ```
/// use nanoc_drv::{compile, CompileOptions};
///
/// let result = compile("void main() { print(42); }", &CompileOptions::default()).unwrap();
/// assert!(result.asm.contains("global main"));
/// ```
pub fn compile(source: &str, options: &CompileOptions) -> Result<Compilation, CompileError> {
    debug!(bytes = source.len(), "lexing");
    let tokens = nanoc_lex::tokenize(source)?;

    debug!(tokens = tokens.len(), "parsing");
    let ast = nanoc_par::parse(tokens.clone())?;

    debug!("semantic analysis");
    nanoc_sem::check(&ast)?;

    debug!("lowering to TAC");
    let ir = nanoc_tac::lower(&ast)?;

    debug!("optimizing");
    let optimized_ir = nanoc_tac::optimize(&ir);

    debug!("emitting {:?} assembly", options.target);
    let asm = nanoc_gen::generate(&optimized_ir, options.target)?;

    Ok(Compilation {
        tokens,
        ast,
        ir,
        optimized_ir,
        asm,
        diagnostics: Vec::new(),
    })
}

/// Render every phase of a compilation for echoing.
pub fn render_phases(result: &Compilation) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== tokens ==");
    for token in &result.tokens {
        let _ = writeln!(out, "{:>4}:{:<4} {:?}", token.line, token.col, token.kind);
    }

    let _ = writeln!(out, "== ast ==");
    let _ = writeln!(out, "{:#?}", result.ast);

    let _ = writeln!(out, "== ir ==");
    let _ = write!(out, "{}", result.ir);

    let _ = writeln!(out, "== optimized ir ==");
    let _ = write!(out, "{}", result.optimized_ir);

    let _ = writeln!(out, "== asm ==");
    let _ = write!(out, "{}", result.asm);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_produces_all_artifacts() {
        let result = compile(
            "void main() { print(1 + 2); }",
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(!result.tokens.is_empty());
        assert_eq!(result.ast.decls.len(), 1);
        assert_eq!(result.ir.functions.len(), 1);
        assert!(result.asm.contains("call printf"));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn first_error_wins() {
        // Both a lex-clean parse error and a later type error exist; the
        // parse error surfaces because phases run in order.
        let err = compile(
            "void main() { int x = ; print(true + 1); }",
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn phase_echo_contains_all_sections() {
        let result = compile("void main() { }", &CompileOptions::default()).unwrap();
        let rendered = render_phases(&result);
        for section in ["== tokens ==", "== ast ==", "== ir ==", "== optimized ir ==", "== asm =="] {
            assert!(rendered.contains(section), "missing section {section}");
        }
    }

    #[test]
    fn riscv_target_propagates_unsupported() {
        let err = compile(
            "void main() { }",
            &CompileOptions {
                target: Target::RiscV,
                emit_phases: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Internal { .. }));
    }
}

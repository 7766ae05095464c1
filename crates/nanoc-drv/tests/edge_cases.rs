//! Edge-case behavior across the pipeline.

use nanoc_drv::{compile, CompileOptions};
use nanoc_tac::{Opcode, Operand};
use nanoc_util::CompileError;

fn build(source: &str) -> nanoc_drv::Compilation {
    compile(source, &CompileOptions::default()).unwrap()
}

fn fail(source: &str) -> CompileError {
    compile(source, &CompileOptions::default()).unwrap_err()
}

#[test]
fn empty_source_is_missing_main() {
    let err = fail("");
    assert!(err.to_string().contains("main"));
}

#[test]
fn unknown_character_reports_position() {
    let err = fail("void main() {\n  int x = 1 # 2;\n}");
    assert_eq!(
        err.to_string(),
        "LexError: unexpected character '#' at line 2, col 13"
    );
}

#[test]
fn deeply_nested_shadowing_counts_up() {
    let result = build(
        "void main() { int v = 1; { int v = 2; { int v = 3; print(v); } print(v); } print(v); }",
    );
    let body: Vec<String> = result
        .ir
        .function("main")
        .unwrap()
        .body
        .iter()
        .map(|i| i.to_string())
        .collect();
    assert!(body.contains(&"MOV v, 1".to_string()));
    assert!(body.contains(&"MOV v_2, 2".to_string()));
    assert!(body.contains(&"MOV v_3, 3".to_string()));
}

#[test]
fn division_by_literal_zero_is_left_to_runtime() {
    // The folder refuses 1/0; the DIV reaches codegen untouched.
    let result = build("void main() { print(1 / 0); }");
    let func = result.optimized_ir.function("main").unwrap();
    assert!(func.body.iter().any(|i| i.op == Opcode::Div));
    assert!(result.asm.contains("idiv"));
}

#[test]
fn while_true_guard_survives_the_optimizer() {
    let result = build("void main() { int i = 0; while (true) { ++i; if (i > 9) break; } }");
    let func = result.optimized_ir.function("main").unwrap();
    assert!(func
        .body
        .iter()
        .any(|i| i.op == Opcode::JmpIfFalse && i.src1 == Some(Operand::Const(1))));
}

#[test]
fn empty_function_bodies_compile() {
    let result = build("void helper() { } void main() { helper(); }");
    assert!(result.asm.contains("helper:"));
    assert!(result.asm.contains("call helper"));
}

#[test]
fn main_implicit_return_zeroes_exit_code() {
    let result = build("int main() { print(1); }");
    let body: Vec<String> = result
        .optimized_ir
        .function("main")
        .unwrap()
        .body
        .iter()
        .map(|i| i.to_string())
        .collect();
    assert_eq!(body.last().map(String::as_str), Some("RETURN"));
    assert!(result.asm.contains("xor rax, rax"));
}

#[test]
fn logical_operators_short_circuit_through_branches() {
    let result = build(
        "int f() { print(7); return 1; } \
         void main() { if (false && f() == 1) print(1); }",
    );
    let func = result.optimized_ir.function("main").unwrap();
    // The right-hand call is guarded by a branch, not evaluated eagerly:
    // a JMP_IF_FALSE precedes the CALL in program order.
    let branch_at = func
        .body
        .iter()
        .position(|i| i.op == Opcode::JmpIfFalse)
        .expect("short-circuit branch");
    let call_at = func
        .body
        .iter()
        .position(|i| i.op == Opcode::Call)
        .expect("guarded call");
    assert!(branch_at < call_at);
}

#[test]
fn global_array_roundtrip() {
    let result = build("int buf[3]; void main() { buf[1] = 5; print(buf[1]); }");
    assert!(result.asm.contains("g_buf: resq 3"));
    assert!(result.asm.contains("lea rdx, [rel g_buf]"));
}

#[test]
fn chained_comparisons_are_rejected_by_typing() {
    // a < b < c types the left comparison as bool, which the outer int
    // comparison rejects. No implicit conversions.
    let err = fail("void main() { int a = 1; if (a < 2 < 3) print(1); }");
    assert!(matches!(err, CompileError::Type { .. }));
}

#[test]
fn for_scope_ends_with_the_loop() {
    let err = fail("void main() { for (int i = 0; i < 3; ++i) print(i); print(i); }");
    assert!(matches!(err, CompileError::Name { .. }));
}

#[test]
fn assignment_in_for_header_compiles() {
    let result = build("void main() { int i; for (i = 0; i < 2; i = i + 1) print(i); }");
    let func = result.optimized_ir.function("main").unwrap();
    assert!(func.body.iter().any(|i| i.op == Opcode::JmpIfFalse));
}

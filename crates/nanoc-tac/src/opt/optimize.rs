//! TAC optimization passes.
//!
//! Three passes iterated to a bounded fixpoint per function: intra-block
//! constant folding and propagation, strength reduction, and whole-function
//! dead code elimination. No CFG is built; basic blocks are the spans
//! between `LABEL`/jump boundaries.
//!
//! Conservative by construction:
//! - boundary instructions are immutable and never removed;
//! - nothing propagates across a boundary;
//! - instruction spans inside a loop (between a label and a backward jump
//!   to it) are left untouched by folding, so induction variables keep
//!   their defining instructions;
//! - only writes to unused temporaries are ever deleted.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::tac::{Function, Instr, Opcode, Operand, Program};

/// Fixpoint bound, so termination holds even if a rule were non-monotonic.
const MAX_ROUNDS: usize = 8;

/// Optimize every function of a program. The input is not mutated.
pub fn optimize(program: &Program) -> Program {
    Program {
        globals: program.globals.clone(),
        functions: program.functions.iter().map(optimize_function).collect(),
    }
}

/// Optimize a single function to a (bounded) fixpoint.
pub fn optimize_function(func: &Function) -> Function {
    let mut body = func.body.clone();
    for _ in 0..MAX_ROUNDS {
        let before = body.clone();
        fold_and_propagate(&mut body);
        reduce(&mut body);
        dead_code(&mut body);
        if body == before {
            break;
        }
    }
    Function {
        name: func.name,
        params: func.params.clone(),
        ret_ty: func.ret_ty,
        body,
    }
}

/// Mark instructions that sit inside a loop: any span between a label and a
/// later jump back to it.
fn loop_flags(body: &[Instr]) -> Vec<bool> {
    let mut label_at = FxHashMap::default();
    for (i, instr) in body.iter().enumerate() {
        if instr.op == Opcode::Label {
            if let Some(Operand::Label(n)) = instr.src1 {
                label_at.insert(n, i);
            }
        }
    }

    let mut flags = vec![false; body.len()];
    for (i, instr) in body.iter().enumerate() {
        let target = match instr.op {
            Opcode::Jmp => instr.src1,
            Opcode::JmpIfFalse => instr.src2,
            _ => None,
        };
        if let Some(Operand::Label(n)) = target {
            if let Some(&j) = label_at.get(&n) {
                if j <= i {
                    for flag in &mut flags[j..=i] {
                        *flag = true;
                    }
                }
            }
        }
    }
    flags
}

/// Intra-block constant folding and propagation.
fn fold_and_propagate(body: &mut [Instr]) {
    let in_loop = loop_flags(body);
    let mut known: FxHashMap<Operand, i64> = FxHashMap::default();

    for (i, instr) in body.iter_mut().enumerate() {
        if instr.is_boundary() {
            known.clear();
            continue;
        }
        if in_loop[i] {
            // Loops are opaque: no substitution, no folding, no recording.
            continue;
        }

        substitute(instr, &known);
        try_fold(instr);

        // A call may write any global through the callee.
        if instr.op == Opcode::Call {
            known.retain(|operand, _| !matches!(operand, Operand::Global(_)));
        }

        if let Some(dst) = instr.def() {
            if instr.op == Opcode::Mov {
                if let Some(Operand::Const(value)) = instr.src1 {
                    known.insert(dst, value);
                    continue;
                }
            }
            known.remove(&dst);
        }
    }
}

/// Replace known-constant value operands with their literals.
fn substitute(instr: &mut Instr, known: &FxHashMap<Operand, i64>) {
    let (sub1, sub2) = match instr.op {
        Opcode::Mov | Opcode::Not | Opcode::Param | Opcode::Print | Opcode::Return => (true, false),
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::Lt
        | Opcode::Gt
        | Opcode::Le
        | Opcode::Ge
        | Opcode::Eq
        | Opcode::Neq
        | Opcode::And
        | Opcode::Or
        | Opcode::Lshift
        | Opcode::Rshift => (true, true),
        // The array operand is an address, never a value.
        Opcode::Aload => (false, true),
        Opcode::Astore => (true, true),
        _ => (false, false),
    };

    if sub1 {
        if let Some(operand) = instr.src1 {
            if let Some(&value) = known.get(&operand) {
                instr.src1 = Some(Operand::Const(value));
            }
        }
    }
    if sub2 {
        if let Some(operand) = instr.src2 {
            if let Some(&value) = known.get(&operand) {
                instr.src2 = Some(Operand::Const(value));
            }
        }
    }
}

/// Rewrite a pure all-literal computation as `MOV dst, literal`.
fn try_fold(instr: &mut Instr) {
    let folded = match instr.op {
        Opcode::Not => instr
            .src1
            .and_then(Operand::as_const)
            .map(|value| (value == 0) as i64),
        op if op.is_pure() && op != Opcode::Mov && op != Opcode::Aload => {
            match (
                instr.src1.and_then(Operand::as_const),
                instr.src2.and_then(Operand::as_const),
            ) {
                (Some(left), Some(right)) => eval(op, left, right),
                _ => None,
            }
        }
        _ => None,
    };

    if let Some(value) = folded {
        if let Some(dst) = instr.dst {
            *instr = Instr::mov(dst, Operand::Const(value));
        }
    }
}

/// Evaluate a pure binary opcode over literals. Division by zero and
/// out-of-range shifts are left for the backend (and the running program).
fn eval(op: Opcode, a: i64, b: i64) -> Option<i64> {
    let value = match op {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Mul => a.wrapping_mul(b),
        Opcode::Div => {
            if b == 0 {
                return None;
            }
            a.wrapping_div(b)
        }
        Opcode::Mod => {
            if b == 0 {
                return None;
            }
            a.wrapping_rem(b)
        }
        Opcode::Lt => (a < b) as i64,
        Opcode::Gt => (a > b) as i64,
        Opcode::Le => (a <= b) as i64,
        Opcode::Ge => (a >= b) as i64,
        Opcode::Eq => (a == b) as i64,
        Opcode::Neq => (a != b) as i64,
        Opcode::And => (a != 0 && b != 0) as i64,
        Opcode::Or => (a != 0 || b != 0) as i64,
        Opcode::Lshift => {
            if !(0..=62).contains(&b) {
                return None;
            }
            a.wrapping_shl(b as u32)
        }
        Opcode::Rshift => {
            if !(0..=62).contains(&b) {
                return None;
            }
            a >> b
        }
        _ => return None,
    };
    Some(value)
}

/// Strength reduction. Literal-operand rewrites only, so it is safe inside
/// loops as well.
fn reduce(body: &mut [Instr]) {
    for instr in body.iter_mut() {
        if instr.is_boundary() {
            continue;
        }
        let dst = match instr.dst {
            Some(dst) => dst,
            None => continue,
        };
        match instr.op {
            Opcode::Mul => {
                // Multiplication commutes; normalize the literal to the right.
                let (x, c) = match (
                    instr.src1.and_then(Operand::as_const),
                    instr.src2.and_then(Operand::as_const),
                ) {
                    (_, Some(c)) => (instr.src1.expect("left operand"), c),
                    (Some(c), None) => (instr.src2.expect("right operand"), c),
                    (None, None) => continue,
                };
                if c == 0 {
                    *instr = Instr::mov(dst, Operand::Const(0));
                } else if c == 1 {
                    *instr = Instr::mov(dst, x);
                } else if let Some(k) = shift_amount(c) {
                    *instr = Instr::binary(Opcode::Lshift, dst, x, Operand::Const(k));
                }
            }
            Opcode::Div => {
                // Arithmetic right shift; exact for non-negative dividends.
                if let Some(c) = instr.src2.and_then(Operand::as_const) {
                    if let Some(k) = shift_amount(c) {
                        let x = instr.src1.expect("dividend");
                        *instr = Instr::binary(Opcode::Rshift, dst, x, Operand::Const(k));
                    }
                }
            }
            Opcode::Add => {
                if instr.src2 == Some(Operand::Const(0)) {
                    *instr = Instr::mov(dst, instr.src1.expect("left operand"));
                } else if instr.src1 == Some(Operand::Const(0)) {
                    *instr = Instr::mov(dst, instr.src2.expect("right operand"));
                }
            }
            _ => {}
        }
    }
}

/// `Some(k)` if `c == 2^k` with `k` in `[1, 30]`.
fn shift_amount(c: i64) -> Option<i64> {
    if c >= 2 && c <= (1 << 30) && c.count_ones() == 1 {
        Some(c.trailing_zeros() as i64)
    } else {
        None
    }
}

/// Whole-function dead code elimination, repeated until stable.
///
/// Only instructions whose destination is an unused temporary are removed;
/// boundaries, side-effecting instructions, and writes to named storage
/// always survive.
fn dead_code(body: &mut Vec<Instr>) {
    loop {
        let mut used: FxHashSet<Operand> = FxHashSet::default();
        for instr in body.iter() {
            for source in instr.sources() {
                used.insert(source);
            }
        }

        let before = body.len();
        body.retain(|instr| {
            if instr.is_boundary() || instr.is_side_effecting() {
                return true;
            }
            match instr.def() {
                Some(dst @ Operand::Temp(_)) => used.contains(&dst),
                _ => true,
            }
        });
        if body.len() == before {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_lex::tokenize;
    use nanoc_par::parse;

    fn optimize_source(source: &str) -> Program {
        let ast = parse(tokenize(source).unwrap()).unwrap();
        nanoc_sem::check(&ast).unwrap();
        optimize(&crate::lower::lower(&ast).unwrap())
    }

    fn body_text(program: &Program, name: &str) -> Vec<String> {
        program
            .function(name)
            .unwrap()
            .body
            .iter()
            .map(|i| i.to_string())
            .collect()
    }

    #[test]
    fn folds_straight_line_arithmetic() {
        let program =
            optimize_source("int main() { int x = (10 * 10 + 44) / 12; print(x); return 0; }");
        let body = body_text(&program, "main");
        // The named write survives with its folded literal; the temporary
        // chain is gone.
        assert!(body.contains(&"MOV x, 12".to_string()));
        assert!(body.iter().all(|line| !line.starts_with("MUL")));
        assert!(body.iter().all(|line| !line.starts_with("DIV")));
        assert!(body.contains(&"PRINT 12".to_string()));
    }

    #[test]
    fn induction_variable_survives_in_loop() {
        let program =
            optimize_source("void main() { int i = 0; while (i < 3) { print(i * 10); ++i; } }");
        let body = body_text(&program, "main");
        // `i * 10` stays a multiply inside the loop; `i` is never folded to
        // its initial 0.
        assert!(body.iter().any(|line| line.starts_with("MUL")));
        assert!(body.iter().any(|line| line.starts_with("ADD")));
        assert!(body.contains(&"MOV i, 0".to_string()));
    }

    #[test]
    fn strength_reduces_power_of_two_multiply_in_loop() {
        let program = optimize_source(
            "const int M = 5; \
             void main() { int a[5]; for (int i = 0; i < M; ++i) a[i] = i * 4; print(a[3]); }",
        );
        let func = program.function("main").unwrap();
        assert!(
            func.body.iter().any(|instr| instr.op == Opcode::Lshift
                && instr.src2 == Some(Operand::Const(2))),
            "expected LSHIFT by 2 for i * 4, got:\n{func}"
        );
        assert!(func.body.iter().all(|instr| instr.op != Opcode::Mul));
    }

    #[test]
    fn strength_reduction_identities() {
        let program = optimize_source(
            "void main() { \
               int n = readInt(); \
               print(n * 1); \
               print(n * 0); \
               print(n + 0); \
               print(n / 8); \
             }",
        );
        let func = program.function("main").unwrap();
        let body = body_text(&program, "main");
        // n*1 and n+0 collapse to uses of n; n*0 becomes the literal 0.
        assert!(func.body.iter().all(|instr| instr.op != Opcode::Mul));
        assert!(func.body.iter().all(|instr| instr.op != Opcode::Add));
        assert!(body.contains(&"PRINT 0".to_string()));
        // n/8 is an arithmetic shift.
        assert!(func
            .body
            .iter()
            .any(|instr| instr.op == Opcode::Rshift
                && instr.src2 == Some(Operand::Const(3))));
    }

    #[test]
    fn dce_removes_only_unused_temporaries() {
        let program = optimize_source(
            "void main() { int unused = 1 + 2; int kept = 4; print(kept); }",
        );
        let body = body_text(&program, "main");
        // Both named writes survive even though `unused` is never read.
        assert!(body.contains(&"MOV unused, 3".to_string()));
        assert!(body.contains(&"MOV kept, 4".to_string()));
        // No ADD remains: it folded and its temporary died.
        assert!(body.iter().all(|line| !line.starts_with("ADD")));
    }

    #[test]
    fn side_effecting_instructions_are_never_removed() {
        let program = optimize_source(
            "int noisy() { print(7); return 1; } \
             void main() { noisy(); }",
        );
        let body = body_text(&program, "main");
        // The call's result temp is unused, but the call survives.
        assert!(body.iter().any(|line| line.starts_with("CALL")));
    }

    #[test]
    fn literal_true_branch_guard_is_preserved() {
        let program = optimize_source(
            "void main() { int i = 0; while (true) { ++i; if (i > 2) break; } print(i); }",
        );
        let func = program.function("main").unwrap();
        // `while (true)` keeps its JMP_IF_FALSE 1, L guard: branches are
        // boundaries and are never folded away.
        assert!(func.body.iter().any(|instr| {
            instr.op == Opcode::JmpIfFalse && instr.src1 == Some(Operand::Const(1))
        }));
    }

    #[test]
    fn propagation_stops_at_block_boundaries() {
        let program = optimize_source(
            "void main() { int x = 1; if (readInt() > 0) { x = 2; } print(x); }",
        );
        let body = body_text(&program, "main");
        // `print(x)` sits after a label; x's value cannot be propagated
        // into it from either arm.
        assert_eq!(body.last().map(String::as_str), Some("RETURN"));
        assert!(body.contains(&"PRINT x".to_string()));
    }

    #[test]
    fn folding_is_idempotent() {
        let sources = [
            "int main() { int x = (10 * 10 + 44) / 12; print(x); return 0; }",
            "void main() { int i = 0; while (i < 3) { print(i * 10); ++i; } }",
            "const int M = 5; \
             void main() { int a[5]; for (int i = 0; i < M; ++i) a[i] = i * 4; print(a[3]); }",
            "void main() { int x = 999; { int x = 111; print(x * 2); } print(x); }",
        ];
        for source in sources {
            let once = optimize_source(source);
            let twice = optimize(&once);
            assert_eq!(once, twice, "optimizer not idempotent for: {source}");
        }
    }

    #[test]
    fn jump_targets_still_resolve_after_optimization() {
        let program = optimize_source(
            "void main() { \
               for (int i = 0; i < 4; ++i) { \
                 if (i == 2) continue; \
                 print(i); \
               } \
             }",
        );
        for func in &program.functions {
            let labels: Vec<u32> = func
                .body
                .iter()
                .filter(|instr| instr.op == Opcode::Label)
                .filter_map(|instr| match instr.src1 {
                    Some(Operand::Label(n)) => Some(n),
                    _ => None,
                })
                .collect();
            for instr in &func.body {
                let target = match instr.op {
                    Opcode::Jmp => instr.src1,
                    Opcode::JmpIfFalse => instr.src2,
                    _ => None,
                };
                if let Some(Operand::Label(n)) = target {
                    assert!(labels.contains(&n), "dangling jump to L{n} in {}", func.name);
                }
            }
        }
    }

    #[test]
    fn shift_amount_bounds() {
        assert_eq!(shift_amount(2), Some(1));
        assert_eq!(shift_amount(4), Some(2));
        assert_eq!(shift_amount(1 << 30), Some(30));
        assert_eq!(shift_amount(1), None);
        assert_eq!(shift_amount(0), None);
        assert_eq!(shift_amount(-4), None);
        assert_eq!(shift_amount(6), None);
        assert_eq!(shift_amount(1 << 31), None);
    }

    #[test]
    fn eval_matches_machine_semantics() {
        assert_eq!(eval(Opcode::Div, 7, 2), Some(3));
        assert_eq!(eval(Opcode::Div, -7, 2), Some(-3));
        assert_eq!(eval(Opcode::Mod, -7, 2), Some(-1));
        assert_eq!(eval(Opcode::Div, 1, 0), None);
        assert_eq!(eval(Opcode::Mod, 1, 0), None);
        assert_eq!(eval(Opcode::Lt, 1, 2), Some(1));
        assert_eq!(eval(Opcode::And, 1, 0), Some(0));
        assert_eq!(eval(Opcode::Rshift, -8, 1), Some(-4));
    }
}

//! Lowers parsed programs into closure trees.
//!
//! Every name is resolved while compiling: locals become frame slots, `$name` becomes the
//! library entry it refers to, and `ctx`/`ops` paths become key lists. Running a compiled
//! function therefore never looks anything up by name except inside the
//! [`Context`](super::runtime::Context).

use std::sync::Arc;

use ahash::AHashMap;
use smallvec::{SmallVec, smallvec};
use tracing::{debug, warn};

use super::error::{CompileError, ExecError, SynthesisError};
use super::fragment::{CONTEXT, OPERANDS, is_identifier, is_keyword};
use super::program::{BinaryOp, Expr, MemberKey, Program, Stmt, UnaryOp, parse};
use super::runtime::{CompiledFn, Frame, Key, LibEntry};
use super::value::Value;

type ExprThunk = Box<dyn Fn(&mut Frame<'_, '_>) -> Result<Value, ExecError> + Send + Sync>;
type StmtThunk = Box<dyn Fn(&mut Frame<'_, '_>) -> Result<(), ExecError> + Send + Sync>;

fn expr_thunk<F>(body: F) -> ExprThunk
where
    F: Fn(&mut Frame<'_, '_>) -> Result<Value, ExecError> + Send + Sync + 'static,
{
    Box::new(body)
}

fn stmt_thunk<F>(body: F) -> StmtThunk
where
    F: Fn(&mut Frame<'_, '_>) -> Result<(), ExecError> + Send + Sync + 'static,
{
    Box::new(body)
}

/// Compiles `program` into a callable over `(ctx, ops)`.
pub fn compile(program: &Program) -> Result<CompiledFn, CompileError> {
    match synthesize(program) {
        Ok(compiled) => {
            debug!(
                program = %program.name,
                instructions = program.instructions.len(),
                "compiled semantics"
            );
            Ok(compiled)
        }
        Err(source) => {
            warn!(program = %program.name, error = %source, "semantics failed to compile");
            Err(CompileError::new(program.name.clone(), source))
        }
    }
}

fn synthesize(program: &Program) -> Result<CompiledFn, SynthesisError> {
    let scope = Scope::new(program)?;
    let statements = parse(&program.source())?;
    let body = scope.block(&statements)?;
    let slots = scope.locals.len();
    Ok(CompiledFn::new(&program.name, move |ctx, ops| {
        let mut frame = Frame {
            ctx,
            ops,
            locals: smallvec![Value::Undefined; slots],
        };
        run_block(&body, &mut frame)
    }))
}

fn run_block(block: &[StmtThunk], frame: &mut Frame<'_, '_>) -> Result<(), ExecError> {
    for stmt in block {
        stmt(frame)?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Access {
    Read,
    Write,
}

enum KeyThunk {
    Fixed(Key),
    Dynamic(ExprThunk),
}

enum Place {
    Local(usize),
    Operand(ExprThunk),
    Context(Vec<KeyThunk>),
}

struct Scope {
    locals: AHashMap<String, usize>,
    lib: AHashMap<String, LibEntry>,
}

impl Scope {
    fn new(program: &Program) -> Result<Self, SynthesisError> {
        let mut lib = AHashMap::with_capacity(program.lib.len());
        for (name, entry) in program.lib.iter() {
            if !is_identifier(name) {
                return Err(SynthesisError::InvalidLibraryName(name.to_string()));
            }
            lib.insert(format!("${name}"), entry.clone());
        }

        let mut locals = AHashMap::with_capacity(program.locals.len());
        for name in &program.locals {
            let reserved = is_keyword(name) || name == CONTEXT || name == OPERANDS;
            if !is_identifier(name) || reserved {
                return Err(SynthesisError::InvalidLocal(name.clone()));
            }
            let slot = locals.len();
            if locals.insert(name.clone(), slot).is_some() {
                return Err(SynthesisError::DuplicateLocal(name.clone()));
            }
        }
        Ok(Self { locals, lib })
    }

    fn block(&self, statements: &[Stmt]) -> Result<Arc<[StmtThunk]>, SynthesisError> {
        statements
            .iter()
            .map(|stmt| self.stmt(stmt))
            .collect::<Result<Vec<_>, _>>()
            .map(Arc::from)
    }

    fn stmt(&self, stmt: &Stmt) -> Result<StmtThunk, SynthesisError> {
        match stmt {
            Stmt::Expr(expr) => {
                let eval = self.expr(expr)?;
                Ok(stmt_thunk(move |frame| eval(frame).map(drop)))
            }
            Stmt::Assign { target, value } => {
                let place = self.place(target, Access::Write)?;
                let value = self.expr(value)?;
                Ok(assignment(place, value))
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond)?;
                let then = self.block(then)?;
                let otherwise = self.block(otherwise)?;
                Ok(stmt_thunk(move |frame| {
                    if cond(frame)?.truthy() {
                        run_block(&then, frame)
                    } else {
                        run_block(&otherwise, frame)
                    }
                }))
            }
        }
    }

    fn expr(&self, expr: &Expr) -> Result<ExprThunk, SynthesisError> {
        match expr {
            Expr::Int(value) => {
                let value = *value;
                Ok(expr_thunk(move |_| Ok(Value::Int(value))))
            }
            Expr::Bool(value) => {
                let value = *value;
                Ok(expr_thunk(move |_| Ok(Value::Bool(value))))
            }
            Expr::Str(text) => {
                let text: Arc<str> = Arc::from(text.as_str());
                Ok(expr_thunk(move |_| Ok(Value::Str(Arc::clone(&text)))))
            }
            Expr::Ident(_) | Expr::Member { .. } => {
                let place = self.place(expr, Access::Read)?;
                Ok(read(place))
            }
            Expr::Call { callee, args } => match self.library_entry(callee)? {
                LibEntry::Function(function) => {
                    let args = self.args(args)?;
                    Ok(expr_thunk(move |frame| {
                        let values = eval_args(&args, frame)?;
                        function(&mut *frame.ctx, &values)
                    }))
                }
                LibEntry::Constructor(_) => Err(SynthesisError::NotCallable(format!(
                    "constructor {} (use 'new')",
                    callee.describe()
                ))),
            },
            Expr::Construct { callee, args } => match self.library_entry(callee)? {
                LibEntry::Constructor(constructor) => {
                    let args = self.args(args)?;
                    Ok(expr_thunk(move |frame| {
                        let values = eval_args(&args, frame)?;
                        constructor(&mut *frame.ctx, &values)
                    }))
                }
                LibEntry::Function(_) => Err(SynthesisError::NotConstructible(callee.describe())),
            },
            Expr::Unary { op, expr } => {
                let operand = self.expr(expr)?;
                Ok(unary(*op, operand))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                Ok(binary(*op, lhs, rhs))
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond)?;
                let then = self.expr(then)?;
                let otherwise = self.expr(otherwise)?;
                Ok(expr_thunk(move |frame| {
                    if cond(frame)?.truthy() {
                        then(frame)
                    } else {
                        otherwise(frame)
                    }
                }))
            }
        }
    }

    fn args(&self, args: &[Expr]) -> Result<Vec<ExprThunk>, SynthesisError> {
        args.iter().map(|arg| self.expr(arg)).collect()
    }

    fn library_entry(&self, callee: &Expr) -> Result<LibEntry, SynthesisError> {
        match callee {
            Expr::Ident(name) if name.starts_with('$') => self
                .lib
                .get(name)
                .cloned()
                .ok_or_else(|| SynthesisError::UnknownLibrary(name[1..].to_string())),
            Expr::Ident(name)
                if self.locals.contains_key(name) || name == CONTEXT || name == OPERANDS =>
            {
                Err(SynthesisError::NotCallable(name.clone()))
            }
            Expr::Ident(name) => Err(SynthesisError::UnknownIdentifier(name.clone())),
            other => Err(SynthesisError::NotCallable(other.describe())),
        }
    }

    fn place(&self, expr: &Expr, access: Access) -> Result<Place, SynthesisError> {
        let mut keys = Vec::new();
        let mut cursor = expr;
        while let Expr::Member { object, key } = cursor {
            keys.push(key);
            cursor = &**object;
        }
        keys.reverse();

        let Expr::Ident(root) = cursor else {
            return Err(misuse(expr, access));
        };

        if root == CONTEXT {
            if keys.is_empty() {
                return Err(misuse(expr, access));
            }
            let keys = keys
                .into_iter()
                .map(|key| match key {
                    MemberKey::Name(name) => Ok(KeyThunk::Fixed(Key::Name(Arc::from(name.as_str())))),
                    MemberKey::Index(index) => self.expr(index).map(KeyThunk::Dynamic),
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Place::Context(keys));
        }

        if root == OPERANDS {
            return match keys.as_slice() {
                [MemberKey::Index(index)] => Ok(Place::Operand(self.expr(index)?)),
                _ => Err(misuse(expr, access)),
            };
        }

        if let Some(&slot) = self.locals.get(root) {
            if keys.is_empty() {
                return Ok(Place::Local(slot));
            }
            return Err(misuse(expr, access));
        }

        if root.starts_with('$') {
            if !self.lib.contains_key(root) {
                return Err(SynthesisError::UnknownLibrary(root[1..].to_string()));
            }
            return Err(misuse(expr, access));
        }

        Err(SynthesisError::UnknownIdentifier(root.clone()))
    }
}

fn misuse(expr: &Expr, access: Access) -> SynthesisError {
    match access {
        Access::Write => SynthesisError::NotAssignable(expr.describe()),
        Access::Read => SynthesisError::NotAValue(expr.describe()),
    }
}

fn eval_args(
    args: &[ExprThunk],
    frame: &mut Frame<'_, '_>,
) -> Result<SmallVec<[Value; 4]>, ExecError> {
    args.iter().map(|arg| arg(frame)).collect()
}

fn context_path(keys: &[KeyThunk], frame: &mut Frame<'_, '_>) -> Result<SmallVec<[Key; 4]>, ExecError> {
    keys.iter()
        .map(|key| match key {
            KeyThunk::Fixed(key) => Ok(key.clone()),
            KeyThunk::Dynamic(index) => Key::from_value(index(frame)?),
        })
        .collect()
}

fn operand_slot(index: &ExprThunk, frame: &mut Frame<'_, '_>) -> Result<usize, ExecError> {
    let index = index(frame)?.as_int()?;
    let len = frame.ops.len();
    usize::try_from(index)
        .ok()
        .filter(|slot| *slot < len)
        .ok_or(ExecError::OperandIndex { index, len })
}

fn read(place: Place) -> ExprThunk {
    match place {
        Place::Local(slot) => expr_thunk(move |frame| Ok(frame.locals[slot].clone())),
        Place::Operand(index) => expr_thunk(move |frame| {
            let slot = operand_slot(&index, frame)?;
            Ok(frame.ops[slot].clone())
        }),
        Place::Context(keys) => expr_thunk(move |frame| {
            let path = context_path(&keys, frame)?;
            frame.ctx.load(&path)
        }),
    }
}

/// Target keys are evaluated before the assigned value.
fn assignment(place: Place, value: ExprThunk) -> StmtThunk {
    match place {
        Place::Local(slot) => stmt_thunk(move |frame| {
            frame.locals[slot] = value(frame)?;
            Ok(())
        }),
        Place::Operand(index) => stmt_thunk(move |frame| {
            let slot = operand_slot(&index, frame)?;
            frame.ops[slot] = value(frame)?;
            Ok(())
        }),
        Place::Context(keys) => stmt_thunk(move |frame| {
            let path = context_path(&keys, frame)?;
            let value = value(frame)?;
            frame.ctx.store(&path, value)
        }),
    }
}

fn unary(op: UnaryOp, operand: ExprThunk) -> ExprThunk {
    match op {
        UnaryOp::Not => expr_thunk(move |frame| Ok(Value::Bool(!operand(frame)?.truthy()))),
        UnaryOp::Neg => {
            expr_thunk(move |frame| Ok(Value::Int(operand(frame)?.as_int()?.wrapping_neg())))
        }
        UnaryOp::BitNot => expr_thunk(move |frame| Ok(Value::Int(!operand(frame)?.as_int()?))),
    }
}

fn binary(op: BinaryOp, lhs: ExprThunk, rhs: ExprThunk) -> ExprThunk {
    match op {
        BinaryOp::LogicalOr => expr_thunk(move |frame| {
            Ok(Value::Bool(lhs(frame)?.truthy() || rhs(frame)?.truthy()))
        }),
        BinaryOp::LogicalAnd => expr_thunk(move |frame| {
            Ok(Value::Bool(lhs(frame)?.truthy() && rhs(frame)?.truthy()))
        }),
        BinaryOp::Eq => expr_thunk(move |frame| {
            let left = lhs(frame)?;
            Ok(Value::Bool(left.loose_eq(&rhs(frame)?)))
        }),
        BinaryOp::Ne => expr_thunk(move |frame| {
            let left = lhs(frame)?;
            Ok(Value::Bool(!left.loose_eq(&rhs(frame)?)))
        }),
        BinaryOp::Add => expr_thunk(move |frame| {
            let left = lhs(frame)?;
            let right = rhs(frame)?;
            match (&left, &right) {
                (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::from(format!("{left}{right}"))),
                _ => Ok(Value::Int(left.as_int()?.wrapping_add(right.as_int()?))),
            }
        }),
        BinaryOp::Lt => compare(lhs, rhs, |a, b| a < b),
        BinaryOp::Le => compare(lhs, rhs, |a, b| a <= b),
        BinaryOp::Gt => compare(lhs, rhs, |a, b| a > b),
        BinaryOp::Ge => compare(lhs, rhs, |a, b| a >= b),
        BinaryOp::BitOr => arithmetic(lhs, rhs, |a, b| Ok(a | b)),
        BinaryOp::BitXor => arithmetic(lhs, rhs, |a, b| Ok(a ^ b)),
        BinaryOp::BitAnd => arithmetic(lhs, rhs, |a, b| Ok(a & b)),
        BinaryOp::Shl => arithmetic(lhs, rhs, |a, b| Ok(a.wrapping_shl(b as u32))),
        BinaryOp::Shr => arithmetic(lhs, rhs, |a, b| Ok(a.wrapping_shr(b as u32))),
        BinaryOp::Sub => arithmetic(lhs, rhs, |a, b| Ok(a.wrapping_sub(b))),
        BinaryOp::Mul => arithmetic(lhs, rhs, |a, b| Ok(a.wrapping_mul(b))),
        BinaryOp::Div => arithmetic(lhs, rhs, |a, b| {
            if b == 0 {
                Err(ExecError::DivisionByZero)
            } else {
                Ok(a.wrapping_div(b))
            }
        }),
        BinaryOp::Rem => arithmetic(lhs, rhs, |a, b| {
            if b == 0 {
                Err(ExecError::DivisionByZero)
            } else {
                Ok(a.wrapping_rem(b))
            }
        }),
    }
}

fn arithmetic(
    lhs: ExprThunk,
    rhs: ExprThunk,
    apply: fn(i64, i64) -> Result<i64, ExecError>,
) -> ExprThunk {
    expr_thunk(move |frame| {
        let left = lhs(frame)?.as_int()?;
        let right = rhs(frame)?.as_int()?;
        apply(left, right).map(Value::Int)
    })
}

fn compare(lhs: ExprThunk, rhs: ExprThunk, apply: fn(i64, i64) -> bool) -> ExprThunk {
    expr_thunk(move |frame| {
        let left = lhs(frame)?.as_int()?;
        let right = rhs(frame)?.as_int()?;
        Ok(Value::Bool(apply(left, right)))
    })
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::soc::isa::semantics::fragment::{
        assign, call, con, construct, lib, reference, subscript,
    };
    use crate::soc::isa::semantics::runtime::{Library, MapContext};

    fn run(program: &Program, ctx: &mut MapContext, ops: &mut [Value]) -> Result<(), ExecError> {
        compile(program).expect("program compiles").call(ctx, ops)
    }

    fn synthesis_error(program: &Program) -> SynthesisError {
        compile(program).expect_err("compile must fail").cause().clone()
    }

    #[test]
    fn writes_operand_into_indexed_register() {
        let target = subscript(&reference(CONTEXT, ["V"]), &reference(OPERANDS, ["0"]));
        let program = Program::new("LD").instruction(assign(&target, &reference(OPERANDS, ["1"])));
        let mut ctx = MapContext::new().with_array("V", 16);
        let mut ops = [Value::Int(0xA), Value::Int(0x2F)];
        run(&program, &mut ctx, &mut ops).expect("runs");
        assert_eq!(ctx.element("V", 0xA), Some(&Value::Int(0x2F)));
    }

    #[test]
    fn locals_start_undefined_and_persist_within_a_call() {
        let program = Program::new("locals")
            .local("tmp")
            .instruction(assign(&reference(CONTEXT, ["before"]), "tmp"))
            .instruction(assign("tmp", &con(40)))
            .instruction(assign(&reference(CONTEXT, ["after"]), "tmp + 2"));
        let compiled = compile(&program).expect("compiles");
        let mut ctx = MapContext::new();
        compiled.call(&mut ctx, &mut []).expect("first call");
        compiled.call(&mut ctx, &mut []).expect("second call");
        assert_eq!(ctx.scalar("before"), Some(&Value::Undefined), "locals reset per call");
        assert_eq!(ctx.int("after"), Some(42));
    }

    #[test]
    fn library_functions_receive_context_and_arguments() {
        let library = Library::new().function("bump", |ctx, args| {
            let path = [Key::Name(Arc::from("count"))];
            let current = ctx.load(&path)?.as_int()?;
            let next = current + args.first().map_or(Ok(1), Value::as_int)?;
            ctx.store(&path, Value::Int(next))?;
            Ok(Value::Int(next))
        });
        let program = Program::new("bump")
            .with_lib(library)
            .instruction(call(&lib("bump"), [con(5)]))
            .instruction(assign(&reference(OPERANDS, ["0"]), &call(&lib("bump"), [] as [&str; 0])));
        let mut ctx = MapContext::new().with_scalar("count", 0i64);
        let mut ops = [Value::Undefined];
        run(&program, &mut ctx, &mut ops).expect("runs");
        assert_eq!(ctx.int("count"), Some(6));
        assert_eq!(ops[0], Value::Int(6), "operand writes reach the caller");
    }

    #[test]
    fn constructors_require_new() {
        struct Pair(i64, i64);
        let library = Library::new()
            .constructor("Pair", |_, args| {
                let a = args.first().map_or(Ok(0), Value::as_int)?;
                let b = args.get(1).map_or(Ok(0), Value::as_int)?;
                Ok(Value::object(Pair(a, b)))
            })
            .function("sum", |_, args| {
                let pair = args
                    .first()
                    .and_then(|value| value.downcast_ref::<Pair>())
                    .ok_or_else(|| ExecError::Host("sum expects a Pair".into()))?;
                Ok(Value::Int(pair.0 + pair.1))
            });

        let program = Program::new("pair")
            .with_lib(library.clone())
            .local("p")
            .instruction(assign("p", &construct(&lib("Pair"), [con(3), con(4)])))
            .instruction(assign(&reference(CONTEXT, ["total"]), &call(&lib("sum"), ["p"])));
        let mut ctx = MapContext::new();
        run(&program, &mut ctx, &mut []).expect("runs");
        assert_eq!(ctx.int("total"), Some(7));

        let called = Program::new("bad").with_lib(library.clone()).instruction("$Pair(1, 2)");
        assert!(matches!(synthesis_error(&called), SynthesisError::NotCallable(_)));
        let constructed = Program::new("bad").with_lib(library).instruction("new $sum(1)");
        assert!(matches!(synthesis_error(&constructed), SynthesisError::NotConstructible(_)));
    }

    #[test]
    fn names_resolve_at_compile_time() {
        assert_eq!(
            synthesis_error(&Program::new("p").instruction("x = 1")),
            SynthesisError::UnknownIdentifier("x".into())
        );
        assert_eq!(
            synthesis_error(&Program::new("p").instruction("$missing(1)")),
            SynthesisError::UnknownLibrary("missing".into())
        );
        assert!(matches!(
            synthesis_error(&Program::new("p").instruction("ctx = 1")),
            SynthesisError::NotAssignable(_)
        ));
        assert!(matches!(
            synthesis_error(&Program::new("p").instruction("ctx.a = ops")),
            SynthesisError::NotAValue(_)
        ));
        assert!(matches!(
            synthesis_error(&Program::new("p").instruction("1 = 2")),
            SynthesisError::NotAssignable(_)
        ));
    }

    #[test]
    fn rejects_bad_locals_and_library_names() {
        let dup = Program::new("p").local("a").local("a");
        assert_eq!(synthesis_error(&dup), SynthesisError::DuplicateLocal("a".into()));
        let reserved = Program::new("p").local("ctx");
        assert_eq!(synthesis_error(&reserved), SynthesisError::InvalidLocal("ctx".into()));
        let odd = Program::new("p").with_lib(Library::new().function("not ok", |_, _| Ok(Value::Undefined)));
        assert_eq!(synthesis_error(&odd), SynthesisError::InvalidLibraryName("not ok".into()));
    }

    #[test]
    fn compile_error_chains_parse_failure() {
        let err = compile(&Program::new("broken").instruction("ctx.a = (1")).expect_err("fails");
        assert_eq!(err.program(), "broken");
        assert_eq!(err.to_string(), "failed to compile 'broken'");
        let source = err.source().expect("chained cause");
        assert!(source.to_string().starts_with("parser error"), "got {source}");
    }

    #[test]
    fn arithmetic_and_logic_follow_integer_rules() {
        let cases = [
            ("7 / 2", Value::Int(3)),
            ("-7 % 3", Value::Int(-1)),
            ("1 << 4 | 1", Value::Int(17)),
            ("~0 & 0xFF", Value::Int(0xFF)),
            ("3 > 2 && 2 >= 2", Value::Bool(true)),
            ("1 == true", Value::Bool(true)),
            ("0 ? 10 : 20", Value::Int(20)),
            ("'V' + 3", Value::from("V3")),
            ("!(1 != 1)", Value::Bool(true)),
        ];
        for (source, expected) in cases {
            let program = Program::new("expr").instruction(assign(&reference(CONTEXT, ["out"]), source));
            let mut ctx = MapContext::new();
            run(&program, &mut ctx, &mut []).expect(source);
            assert_eq!(ctx.scalar("out"), Some(&expected), "evaluating {source}");
        }
    }

    #[test]
    fn runtime_faults_surface_as_exec_errors() {
        let mut ctx = MapContext::new();
        let div = Program::new("div").instruction("ctx.a = 1 / 0");
        assert_eq!(run(&div, &mut ctx, &mut []), Err(ExecError::DivisionByZero));

        let oob = Program::new("oob").instruction("ctx.a = ops[2]");
        assert_eq!(
            run(&oob, &mut ctx, &mut [Value::Int(1)]),
            Err(ExecError::OperandIndex { index: 2, len: 1 })
        );

        let missing = Program::new("missing").instruction("ctx.a = ctx.nothing");
        assert_eq!(
            run(&missing, &mut ctx, &mut []),
            Err(ExecError::UnknownPath("ctx.nothing".into()))
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let library = Library::new().function("tick", |_, _| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Bool(true))
        });
        let program = Program::new("sc")
            .with_lib(library)
            .instruction("false && $tick()")
            .instruction("true || $tick()")
            .instruction("if (false) { $tick() } else { ctx.done = 1 }");
        let mut ctx = MapContext::new();
        run(&program, &mut ctx, &mut []).expect("runs");
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.int("done"), Some(1));
    }

    #[test]
    fn quoted_keys_reach_the_context() {
        let program = Program::new("quoted")
            .instruction(assign(&reference(CONTEXT, ["carry flag"]), &con(true)));
        let mut ctx = MapContext::new();
        run(&program, &mut ctx, &mut []).expect("runs");
        assert_eq!(ctx.scalar("carry flag"), Some(&Value::Bool(true)));

        let text = "bell\u{7} tab\t quote\" slash\\ del\u{7f} nul\0";
        let program = Program::new("escapes")
            .instruction(assign(&reference(CONTEXT, ["key\u{1b}"]), &con(text)));
        let mut ctx = MapContext::new();
        run(&program, &mut ctx, &mut []).expect("runs");
        assert_eq!(
            ctx.scalar("key\u{1b}"),
            Some(&Value::from(text)),
            "control characters survive rendering and lexing"
        );
    }

    #[test]
    fn runaway_nesting_fails_to_compile() {
        let source = format!("ctx.a = {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = compile(&Program::new("deep").instruction(source)).expect_err("too deep");
        assert_eq!(err.program(), "deep");
        assert!(
            matches!(err.cause(), SynthesisError::Parse { message, .. } if message == "expression nested too deeply"),
            "got {:?}",
            err.cause()
        );
    }
}

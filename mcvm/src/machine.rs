use indexmap::IndexMap;

use mcc::sema::program::{CExpr, CExprKind, CStmt, CastKind, Func, Program};
use mcc::syntax::ast::BinOp;
use mcc::{Builtin, Type};

use crate::fault::Fault;
use crate::store::Store;
use crate::syscall::Syscall;
use crate::value::{default_image, Addr, Value};

/// One storage binding: where a name lives and what it holds. Array
/// parameters are bound by reference: the cell holds the caller's block
/// address instead of a fresh copy.
#[derive(Debug, Clone)]
struct Binding {
    addr: Addr,
    ty: Type,
    by_ref: bool,
}

/// One active call: parameter and local bindings in a stack of scopes,
/// plus the method receiver when the call dispatched through an object.
#[derive(Debug)]
struct Frame {
    scopes: Vec<IndexMap<String, Binding>>,
    receiver: Option<usize>,
}

/// Result of executing a statement.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// The execution engine. All mutable run state (globals, store, frames) is
/// carried here explicitly, keeping the engine re-entrant and testable.
pub struct Machine<'p, S: Syscall> {
    program: &'p Program,
    store: Store,
    globals: IndexMap<String, Binding>,
    frames: Vec<Frame>,
    sys: S,
}

impl<'p, S: Syscall> Machine<'p, S> {
    pub fn new(program: &'p Program, sys: S) -> Self {
        let mut store = Store::new();
        let mut globals = IndexMap::new();
        for (name, ty) in &program.globals {
            let addr = store.alloc(default_image(ty, &program.table));
            globals.insert(
                name.clone(),
                Binding {
                    addr,
                    ty: ty.clone(),
                    by_ref: false,
                },
            );
        }
        Machine {
            program,
            store,
            globals,
            frames: Vec::new(),
            sys,
        }
    }

    /// Execute the entry function to completion. The returned value is the
    /// entry function's result; the process exit code is decided by the
    /// caller (0 on normal completion).
    pub fn run(&mut self) -> Result<i64, Fault> {
        let program = self.program;
        let main = program
            .funcs
            .get("main")
            .ok_or_else(|| Fault::NoEntry(String::from("main")))?;
        let result = self.call(main, Vec::new(), None)?;
        Ok(result.as_int())
    }

    pub fn into_syscall(self) -> S {
        self.sys
    }

    // ------------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------------

    fn call(
        &mut self,
        func: &'p Func,
        args: Vec<Value>,
        receiver: Option<usize>,
    ) -> Result<Value, Fault> {
        let mut params = IndexMap::new();
        for ((name, ty), arg) in func.params.iter().zip(args) {
            params.insert(name.clone(), self.bind_param(ty, arg));
        }
        self.frames.push(Frame {
            // Locals get their own scope so they may shadow parameters
            scopes: vec![params, IndexMap::new()],
            receiver,
        });
        let flow = self.exec_all(&func.body)?;
        self.frames.pop();
        match flow {
            Flow::Return(value) => Ok(value),
            // Falling off the end of a body yields the zero value
            _ => Ok(zero_of(&func.ret)),
        }
    }

    fn bind_param(&mut self, ty: &Type, arg: Value) -> Binding {
        match ty {
            // Arrays are passed as a reference to the caller's block; element
            // mutations in the callee are visible to the caller
            Type::Array(_, _) => Binding {
                addr: self.store.alloc(vec![arg]),
                ty: ty.clone(),
                by_ref: true,
            },
            // Everything else binds a copy: struct images are duplicated,
            // object and pointer arguments copy only the handle
            _ => {
                let cells = match arg {
                    Value::Struct(image) => image,
                    value => vec![value],
                };
                Binding {
                    addr: self.store.alloc(cells),
                    ty: ty.clone(),
                    by_ref: false,
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn exec_all(&mut self, stmts: &'p [CStmt]) -> Result<Flow, Fault> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &'p CStmt) -> Result<Flow, Fault> {
        match stmt {
            CStmt::Block(stmts) => {
                self.top_frame().scopes.push(IndexMap::new());
                let flow = self.exec_all(stmts)?;
                self.top_frame().scopes.pop();
                Ok(flow)
            }

            CStmt::Var(name, ty) => {
                let image = default_image(ty, &self.program.table);
                let addr = self.store.alloc(image);
                let binding = Binding {
                    addr,
                    ty: ty.clone(),
                    by_ref: false,
                };
                let frame = self.top_frame();
                let top = frame.scopes.len() - 1;
                frame.scopes[top].insert(name.clone(), binding);
                Ok(Flow::Normal)
            }

            CStmt::Assign(lhs, rhs) => {
                let (addr, _) = self.place(lhs)?;
                let value = self.eval(rhs)?;
                self.store_value(addr, value)?;
                Ok(Flow::Normal)
            }

            CStmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }

            CStmt::If(cond, then, otherwise) => {
                if self.eval(cond)?.truthy() {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }

            CStmt::While(cond, body) => {
                // The condition is re-evaluated before each iteration
                while self.eval(cond)?.truthy() {
                    match self.exec(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            CStmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Int(0),
                };
                Ok(Flow::Return(value))
            }

            CStmt::Break => Ok(Flow::Break),
            CStmt::Continue => Ok(Flow::Continue),
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn eval(&mut self, expr: &'p CExpr) -> Result<Value, Fault> {
        match &expr.kind {
            CExprKind::Int(n) => Ok(Value::Int(*n)),
            CExprKind::Char(ch) => Ok(Value::Char(*ch)),

            // Each evaluation materialises the literal as a fresh block with
            // a terminating '\0'
            CExprKind::Str(s) => {
                let cells: Vec<Value> = s
                    .chars()
                    .map(Value::Char)
                    .chain(std::iter::once(Value::Char('\0')))
                    .collect();
                let addr = self.store.alloc(cells);
                Ok(Value::Ptr(Some(addr)))
            }

            CExprKind::Local(_)
            | CExprKind::Global(_)
            | CExprKind::SelfField { .. }
            | CExprKind::Deref(_)
            | CExprKind::Index { .. }
            | CExprKind::ObjField { .. } => {
                let (addr, _) = self.place(expr)?;
                self.load(addr, &expr.ty)
            }

            CExprKind::StructField { base, offset } => {
                if place_able(base) {
                    let (addr, _) = self.place(expr)?;
                    self.load(addr, &expr.ty)
                } else {
                    // Field of a struct rvalue, e.g. the result of a call
                    let image = match self.eval(base)? {
                        Value::Struct(image) => image,
                        other => vec![other],
                    };
                    let len = self.program.table.cells(&expr.ty);
                    if matches!(expr.ty, Type::Struct(_)) {
                        Ok(Value::Struct(image[*offset..offset + len].to_vec()))
                    } else {
                        Ok(image[*offset].clone())
                    }
                }
            }

            CExprKind::SelfRef => Ok(Value::Obj(self.top_frame().receiver)),

            CExprKind::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs),

            CExprKind::Neg(inner) => Ok(Value::Int(-self.eval(inner)?.as_int())),

            CExprKind::AddrOf(inner) => {
                let (addr, _) = self.place(inner)?;
                Ok(Value::Ptr(Some(addr)))
            }

            CExprKind::Call { name, args } => {
                let values = self.eval_args(args)?;
                let program = self.program;
                let func = &program.funcs[name.as_str()];
                self.call(func, values, None)
            }

            CExprKind::Syscall { which, args } => {
                let values = self.eval_args(args)?;
                self.syscall(*which, values)
            }

            CExprKind::MethodCall { recv, name, args } => {
                let receiver = match self.eval(recv)? {
                    Value::Obj(Some(handle)) => handle,
                    _ => return Err(Fault::NullObject),
                };
                let values = self.eval_args(args)?;
                // Dispatch on the class tag stored on the heap object, not
                // on the receiver's static type
                let runtime_class = self
                    .store
                    .tag(receiver)
                    .expect("object blocks always carry a class tag")
                    .to_string();
                let program = self.program;
                let (owner, _) = program
                    .table
                    .lookup_method(&runtime_class, name)
                    .expect("dispatch target was resolved during checking");
                let func = &program.methods[&(owner.to_string(), name.clone())];
                self.call(func, values, Some(receiver))
            }

            CExprKind::Cast(kind, inner) => {
                let value = self.eval(inner)?;
                match kind {
                    CastKind::Noop => Ok(value),
                    CastKind::IntToChar => Ok(Value::Char(value.as_char())),
                    CastKind::CharToInt => Ok(Value::Int(value.as_int())),
                    CastKind::Downcast(target) => match value {
                        Value::Obj(Some(handle)) => {
                            let tag = self
                                .store
                                .tag(handle)
                                .expect("object blocks always carry a class tag");
                            if self.program.table.is_subtype(tag, target) {
                                Ok(Value::Obj(Some(handle)))
                            } else {
                                Err(Fault::BadDowncast {
                                    from: tag.to_string(),
                                    to: target.clone(),
                                })
                            }
                        }
                        // A null handle passes through any cast
                        other => Ok(other),
                    },
                }
            }

            CExprKind::Sizeof(bytes) => Ok(Value::Int(*bytes as i64)),

            CExprKind::New(class) => {
                let mut image = Vec::new();
                for (_, fty) in self.program.table.class_layout(class) {
                    image.extend(default_image(&fty, &self.program.table));
                }
                let handle = self.store.alloc_object(class, image);
                Ok(Value::Obj(Some(handle)))
            }
        }
    }

    fn eval_args(&mut self, args: &'p [CExpr]) -> Result<Vec<Value>, Fault> {
        // Strictly left to right
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        Ok(values)
    }

    fn eval_binary(&mut self, op: BinOp, lhs: &'p CExpr, rhs: &'p CExpr) -> Result<Value, Fault> {
        // Short-circuit: the right operand is not evaluated when the left
        // already decides the result
        match op {
            BinOp::And => {
                if !self.eval(lhs)?.truthy() {
                    return Ok(Value::Int(0));
                }
                return Ok(Value::Int(self.eval(rhs)?.truthy() as i64));
            }
            BinOp::Or => {
                if self.eval(lhs)?.truthy() {
                    return Ok(Value::Int(1));
                }
                return Ok(Value::Int(self.eval(rhs)?.truthy() as i64));
            }
            _ => {}
        }

        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;
        let value = match op {
            BinOp::Add => Value::Int(left.as_int() + right.as_int()),
            BinOp::Sub => Value::Int(left.as_int() - right.as_int()),
            BinOp::Mul => Value::Int(left.as_int() * right.as_int()),
            BinOp::Div => {
                if right.as_int() == 0 {
                    return Err(Fault::DivisionByZero);
                }
                Value::Int(left.as_int() / right.as_int())
            }
            BinOp::Mod => {
                if right.as_int() == 0 {
                    return Err(Fault::DivisionByZero);
                }
                Value::Int(left.as_int() % right.as_int())
            }
            BinOp::Lt => Value::Int((left.as_int() < right.as_int()) as i64),
            BinOp::Le => Value::Int((left.as_int() <= right.as_int()) as i64),
            BinOp::Gt => Value::Int((left.as_int() > right.as_int()) as i64),
            BinOp::Ge => Value::Int((left.as_int() >= right.as_int()) as i64),
            BinOp::Eq => Value::Int(values_equal(&left, &right) as i64),
            BinOp::Ne => Value::Int(!values_equal(&left, &right) as i64),
            BinOp::And | BinOp::Or => Value::Int(0),
        };
        Ok(value)
    }

    // ------------------------------------------------------------------------
    // Places and storage
    // ------------------------------------------------------------------------

    /// Resolve an addressable expression to a cell range in the store.
    fn place(&mut self, expr: &'p CExpr) -> Result<(Addr, usize), Fault> {
        let len = self.program.table.cells(&expr.ty);
        match &expr.kind {
            CExprKind::Local(name) => {
                let binding = self.local(name);
                if binding.by_ref {
                    // Array parameter: the cell holds the caller's block
                    match self.store.cell(binding.addr)? {
                        Value::Ptr(Some(addr)) => Ok((*addr, len)),
                        _ => Err(Fault::NullPointer),
                    }
                } else {
                    Ok((binding.addr, len))
                }
            }

            CExprKind::Global(name) => Ok((self.globals[name.as_str()].addr, len)),

            CExprKind::SelfField { offset } => {
                let receiver = self
                    .top_frame()
                    .receiver
                    .ok_or(Fault::NullObject)?;
                Ok((
                    Addr {
                        block: receiver,
                        offset: *offset,
                    },
                    len,
                ))
            }

            CExprKind::Deref(inner) => match self.eval(inner)? {
                Value::Ptr(Some(addr)) => Ok((addr, len)),
                _ => Err(Fault::NullPointer),
            },

            CExprKind::Index {
                base,
                index,
                bound,
                elem_cells,
            } => {
                let base_addr = match self.eval(base)? {
                    Value::Ptr(Some(addr)) => addr,
                    _ => return Err(Fault::NullPointer),
                };
                let idx = self.eval(index)?.as_int();
                // Out-of-range indices are a runtime fault, not a static one
                if idx < 0 {
                    return Err(Fault::OutOfBounds {
                        index: idx,
                        len: bound.unwrap_or(0),
                    });
                }
                if let Some(bound) = bound {
                    if idx as usize >= *bound {
                        return Err(Fault::OutOfBounds {
                            index: idx,
                            len: *bound,
                        });
                    }
                }
                Ok((
                    Addr {
                        block: base_addr.block,
                        offset: base_addr.offset + idx as usize * elem_cells,
                    },
                    len,
                ))
            }

            CExprKind::StructField { base, offset } => {
                let (addr, _) = self.place(base)?;
                Ok((
                    Addr {
                        block: addr.block,
                        offset: addr.offset + offset,
                    },
                    len,
                ))
            }

            CExprKind::ObjField { base, offset } => match self.eval(base)? {
                Value::Obj(Some(handle)) => Ok((
                    Addr {
                        block: handle,
                        offset: *offset,
                    },
                    len,
                )),
                _ => Err(Fault::NullObject),
            },

            _ => unreachable!("not an addressable expression"),
        }
    }

    /// Read a value of the given type from the store. Array-typed reads
    /// decay to a pointer to the block; struct reads gather the cell image.
    fn load(&self, addr: Addr, ty: &Type) -> Result<Value, Fault> {
        match ty {
            Type::Array(_, _) => Ok(Value::Ptr(Some(addr))),
            Type::Struct(_) => {
                let len = self.program.table.cells(ty);
                Ok(Value::Struct(self.store.read_range(addr, len)?))
            }
            _ => Ok(self.store.cell(addr)?.clone()),
        }
    }

    fn store_value(&mut self, addr: Addr, value: Value) -> Result<(), Fault> {
        match value {
            Value::Struct(image) => self.store.write_range(addr, &image),
            value => self.store.write_range(addr, &[value]),
        }
    }

    fn local(&self, name: &str) -> Binding {
        let frame = &self.frames[self.frames.len() - 1];
        frame
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .expect("name was resolved during checking")
            .clone()
    }

    fn top_frame(&mut self) -> &mut Frame {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    // ------------------------------------------------------------------------
    // Runtime library
    // ------------------------------------------------------------------------

    fn syscall(&mut self, which: Builtin, mut args: Vec<Value>) -> Result<Value, Fault> {
        match which {
            Builtin::PrintI => {
                self.sys.print_i(args.remove(0).as_int());
                Ok(Value::Int(0))
            }
            Builtin::PrintC => {
                self.sys.print_c(args.remove(0).as_char());
                Ok(Value::Int(0))
            }
            Builtin::PrintS => {
                let text = match args.remove(0) {
                    Value::Ptr(Some(addr)) => self.read_cstr(addr),
                    _ => return Err(Fault::NullPointer),
                };
                self.sys.print_s(&text);
                Ok(Value::Int(0))
            }
            Builtin::ReadI => Ok(Value::Int(self.sys.read_i())),
            Builtin::ReadC => Ok(Value::Char(self.sys.read_c())),
            Builtin::Malloc => {
                // The raw allocation primitive is served by the engine's own
                // arena; the block starts uninitialised (zeroed cells)
                let size = args.remove(0).as_int().max(0) as usize;
                let addr = self.store.alloc(vec![Value::Int(0); size]);
                Ok(Value::Ptr(Some(addr)))
            }
        }
    }

    /// Walk a character block up to its terminating '\0' (or block end).
    fn read_cstr(&self, start: Addr) -> String {
        let mut text = String::new();
        let mut offset = start.offset;
        loop {
            let addr = Addr {
                block: start.block,
                offset,
            };
            match self.store.cell(addr) {
                Ok(Value::Char('\0')) => break,
                Ok(Value::Char(ch)) => text.push(*ch),
                Ok(Value::Int(0)) => break,
                Ok(Value::Int(n)) => text.push((*n as u8) as char),
                _ => break,
            }
            offset += 1;
        }
        text
    }
}

fn place_able(expr: &CExpr) -> bool {
    match &expr.kind {
        CExprKind::Local(_)
        | CExprKind::Global(_)
        | CExprKind::SelfField { .. }
        | CExprKind::Deref(_)
        | CExprKind::Index { .. }
        | CExprKind::ObjField { .. } => true,
        CExprKind::StructField { base, .. } => place_able(base),
        _ => false,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_) | Value::Char(_), Value::Int(_) | Value::Char(_)) => {
            left.as_int() == right.as_int()
        }
        _ => left == right,
    }
}

fn zero_of(ty: &Type) -> Value {
    match ty {
        Type::Char => Value::Char('\0'),
        Type::Ptr(_) => Value::Ptr(None),
        Type::Class(_) => Value::Obj(None),
        _ => Value::Int(0),
    }
}

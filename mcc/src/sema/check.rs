use indexmap::IndexMap;

use super::builtins::BUILTINS;
use super::program::{CExpr, CExprKind, CStmt, CastKind, Func, Program};
use super::scope::{ScopeStack, Storage};
use super::table::{ClassDef, MethodSig, StructDef, TypeTable};
use super::types::Type;
use crate::error::{Error, SemError};
use crate::syntax::ast::{Ast, BinOp, Decl, DeclKind, Expr, ExprKind, Stmt, StmtKind, TyExpr};
use crate::syntax::token::Pos;

/// Run the whole semantic pass over a parsed translation unit. Halts on the
/// first error, before anything could execute.
pub fn check(ast: &Ast) -> Result<Program, Error> {
    Checker::new().run(ast)
}

#[derive(Debug, Clone)]
struct FuncEntry {
    params: Vec<(String, Type)>,
    ret: Type,
    defined: bool,
}

struct Checker {
    table: TypeTable,
    globals: IndexMap<String, Type>,
    sigs: IndexMap<String, FuncEntry>,
    scopes: ScopeStack,
    decl_pos: IndexMap<String, Pos>,
    ret: Type,
    current_class: Option<String>,
    loop_depth: usize,
}

impl Checker {
    fn new() -> Self {
        Checker {
            table: TypeTable::new(),
            globals: IndexMap::new(),
            sigs: IndexMap::new(),
            scopes: ScopeStack::new(),
            decl_pos: IndexMap::new(),
            ret: Type::Void,
            current_class: None,
            loop_depth: 0,
        }
    }

    fn run(mut self, ast: &Ast) -> Result<Program, Error> {
        let Ast(decls) = ast;

        // 1. Register struct layouts and class names
        self.collect_types(decls)?;

        // 2. Resolve class members, validate the hierarchy
        self.collect_members(decls)?;

        // 3. Collect function signatures (prototypes and definitions)
        self.collect_sigs(decls)?;

        // 4. Collect file-scope variables
        self.collect_globals(decls)?;

        // 5. Check every function and method body
        let mut funcs = IndexMap::new();
        let mut methods = IndexMap::new();
        for decl in decls {
            match &decl.kind {
                DeclKind::Fun(fd) => {
                    if BUILTINS.contains_key(fd.sig.name.as_str()) {
                        continue;
                    }
                    let entry = self.sigs[fd.sig.name.as_str()].clone();
                    let func =
                        self.check_func(&fd.sig.name, entry.params, entry.ret, &fd.body, None)?;
                    funcs.insert(fd.sig.name.clone(), func);
                }
                DeclKind::Class(cd) => {
                    for fd in &cd.methods {
                        let sig = self.table.classes[cd.name.as_str()].methods
                            [fd.sig.name.as_str()]
                        .clone();
                        let func = self.check_func(
                            &fd.sig.name,
                            sig.params,
                            sig.ret,
                            &fd.body,
                            Some(cd.name.clone()),
                        )?;
                        methods.insert((cd.name.clone(), fd.sig.name.clone()), func);
                    }
                }
                _ => {}
            }
        }

        Ok(Program {
            table: self.table,
            globals: self.globals,
            funcs,
            methods,
        })
    }

    // ------------------------------------------------------------------------
    // Declaration collection
    // ------------------------------------------------------------------------

    fn collect_types(&mut self, decls: &[Decl]) -> Result<(), Error> {
        for decl in decls {
            match &decl.kind {
                DeclKind::Struct(name, fields) => {
                    self.decl_pos.insert(name.clone(), decl.pos);
                    self.table
                        .register_struct(StructDef {
                            name: name.clone(),
                            fields: IndexMap::new(),
                        })
                        .map_err(|e| Error::sem(e, decl.pos))?;
                    let resolved = self.resolve_fields(fields, decl.pos)?;
                    self.table.structs[name.as_str()].fields = resolved;
                }
                DeclKind::Class(cd) => {
                    self.decl_pos.insert(cd.name.clone(), decl.pos);
                    self.table
                        .register_class(ClassDef {
                            name: cd.name.clone(),
                            base: cd.base.clone(),
                            fields: IndexMap::new(),
                            methods: IndexMap::new(),
                        })
                        .map_err(|e| Error::sem(e, decl.pos))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn collect_members(&mut self, decls: &[Decl]) -> Result<(), Error> {
        for decl in decls {
            let DeclKind::Class(cd) = &decl.kind else {
                continue;
            };
            let fields = self.resolve_fields(&cd.fields, decl.pos)?;
            let mut sigs: IndexMap<String, MethodSig> = IndexMap::new();
            for fd in &cd.methods {
                if sigs.contains_key(&fd.sig.name) {
                    return Err(Error::sem(
                        SemError::DuplicateDefinition(fd.sig.name.clone()),
                        decl.pos,
                    ));
                }
                let (params, ret) = self.resolve_sig(&fd.sig.params, &fd.sig.ret, decl.pos)?;
                sigs.insert(
                    fd.sig.name.clone(),
                    MethodSig {
                        name: fd.sig.name.clone(),
                        params,
                        ret,
                    },
                );
            }
            let def = &mut self.table.classes[cd.name.as_str()];
            def.fields = fields;
            def.methods = sigs;
        }

        self.table.validate().map_err(|e| {
            let name = match &e {
                SemError::UnknownBase { class, .. } => class.clone(),
                SemError::InheritanceCycle(name) => name.clone(),
                SemError::RecursiveStruct(name) => name.clone(),
                _ => String::new(),
            };
            let pos = self.decl_pos.get(&name).copied().unwrap_or(Pos::null());
            Error::sem(e, pos)
        })?;

        // An override must keep the signature it replaces
        for decl in decls {
            let DeclKind::Class(cd) = &decl.kind else {
                continue;
            };
            let Some(base) = self.table.classes[cd.name.as_str()].base.clone() else {
                continue;
            };
            for fd in &cd.methods {
                let Some((_, base_sig)) = self.table.lookup_method(&base, &fd.sig.name) else {
                    continue;
                };
                let sig = &self.table.classes[cd.name.as_str()].methods[fd.sig.name.as_str()];
                if base_sig.params.len() != sig.params.len() {
                    return Err(Error::sem(
                        SemError::ArityMismatch {
                            name: fd.sig.name.clone(),
                            expected: base_sig.params.len(),
                            found: sig.params.len(),
                        },
                        decl.pos,
                    ));
                }
                let same_params = base_sig
                    .params
                    .iter()
                    .zip(&sig.params)
                    .all(|((_, a), (_, b))| a == b);
                if !same_params || base_sig.ret != sig.ret {
                    return Err(Error::sem(
                        SemError::TypeMismatch {
                            expected: format!("override of {}.{}", base, fd.sig.name),
                            found: format!("{}.{}", cd.name, fd.sig.name),
                        },
                        decl.pos,
                    ));
                }
            }
        }
        Ok(())
    }

    fn collect_sigs(&mut self, decls: &[Decl]) -> Result<(), Error> {
        for decl in decls {
            let (sig, defines) = match &decl.kind {
                DeclKind::Proto(sig) => (sig, false),
                DeclKind::Fun(fd) => (&fd.sig, true),
                _ => continue,
            };
            // Programs may re-declare the runtime library as prototypes; the
            // fixed signatures win
            if BUILTINS.contains_key(sig.name.as_str()) {
                continue;
            }
            let (params, ret) = self.resolve_sig(&sig.params, &sig.ret, decl.pos)?;
            match self.sigs.get_mut(sig.name.as_str()) {
                None => {
                    self.sigs.insert(
                        sig.name.clone(),
                        FuncEntry {
                            params,
                            ret,
                            defined: defines,
                        },
                    );
                }
                Some(entry) => {
                    if defines && entry.defined {
                        return Err(Error::sem(
                            SemError::DuplicateDefinition(sig.name.clone()),
                            decl.pos,
                        ));
                    }
                    if entry.params.len() != params.len() {
                        return Err(Error::sem(
                            SemError::ArityMismatch {
                                name: sig.name.clone(),
                                expected: entry.params.len(),
                                found: params.len(),
                            },
                            decl.pos,
                        ));
                    }
                    let same = entry.params.iter().zip(&params).all(|((_, a), (_, b))| a == b);
                    if !same || entry.ret != ret {
                        return Err(Error::sem(
                            SemError::TypeMismatch {
                                expected: format!("declared signature of {}", sig.name),
                                found: String::from("conflicting signature"),
                            },
                            decl.pos,
                        ));
                    }
                    entry.defined = entry.defined || defines;
                }
            }
        }
        Ok(())
    }

    fn collect_globals(&mut self, decls: &[Decl]) -> Result<(), Error> {
        for decl in decls {
            let DeclKind::Var(name, tyexpr) = &decl.kind else {
                continue;
            };
            let ty = self.resolve(tyexpr, decl.pos)?;
            self.check_storable(name, &ty, decl.pos)?;
            self.scopes
                .declare(name, ty.clone(), Storage::Global)
                .map_err(|e| Error::sem(e, decl.pos))?;
            self.globals.insert(name.clone(), ty);
        }
        Ok(())
    }

    fn resolve(&self, tyexpr: &TyExpr, pos: Pos) -> Result<Type, Error> {
        self.table.resolve(tyexpr).map_err(|e| Error::sem(e, pos))
    }

    fn resolve_fields(
        &self,
        fields: &[(String, TyExpr)],
        pos: Pos,
    ) -> Result<IndexMap<String, Type>, Error> {
        let mut resolved = IndexMap::new();
        for (name, tyexpr) in fields {
            if resolved.contains_key(name) {
                return Err(Error::sem(SemError::Redeclaration(name.clone()), pos));
            }
            let ty = self.resolve(tyexpr, pos)?;
            self.check_storable(name, &ty, pos)?;
            resolved.insert(name.clone(), ty);
        }
        Ok(resolved)
    }

    fn resolve_sig(
        &self,
        params: &[(String, TyExpr)],
        ret: &TyExpr,
        pos: Pos,
    ) -> Result<(Vec<(String, Type)>, Type), Error> {
        let mut resolved = Vec::new();
        for (name, tyexpr) in params {
            if resolved.iter().any(|(n, _)| n == name) {
                return Err(Error::sem(SemError::Redeclaration(name.clone()), pos));
            }
            let ty = self.resolve(tyexpr, pos)?;
            self.check_storable(name, &ty, pos)?;
            resolved.push((name.clone(), ty));
        }
        Ok((resolved, self.resolve(ret, pos)?))
    }

    /// Variables, fields and parameters cannot hold void
    fn check_storable(&self, name: &str, ty: &Type, pos: Pos) -> Result<(), Error> {
        let mut base = ty;
        while let Type::Array(_, elem) = base {
            base = elem;
        }
        if *base == Type::Void {
            return Err(Error::sem(SemError::VoidVariable(name.to_string()), pos));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------------

    fn check_func(
        &mut self,
        name: &str,
        params: Vec<(String, Type)>,
        ret: Type,
        body: &[Stmt],
        class: Option<String>,
    ) -> Result<Func, Error> {
        self.ret = ret.clone();
        self.current_class = class;
        self.loop_depth = 0;

        self.scopes.push();
        for (pname, pty) in &params {
            self.scopes
                .declare(pname, pty.clone(), Storage::Param)
                .map_err(|e| Error::sem(e, Pos::null()))?;
        }
        self.scopes.push();
        let mut checked = Vec::new();
        for stmt in body {
            checked.push(self.check_stmt(stmt)?);
        }
        self.scopes.pop();
        self.scopes.pop();

        self.current_class = None;
        Ok(Func {
            name: name.to_string(),
            params,
            ret,
            body: checked,
        })
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<CStmt, Error> {
        let pos = stmt.pos;
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                self.scopes.push();
                let mut checked = Vec::new();
                for stmt in stmts {
                    checked.push(self.check_stmt(stmt)?);
                }
                self.scopes.pop();
                Ok(CStmt::Block(checked))
            }

            StmtKind::Var(name, tyexpr) => {
                let ty = self.resolve(tyexpr, pos)?;
                self.check_storable(name, &ty, pos)?;
                self.scopes
                    .declare(name, ty.clone(), Storage::Local)
                    .map_err(|e| Error::sem(e, pos))?;
                Ok(CStmt::Var(name.clone(), ty))
            }

            StmtKind::Expr(expr) => Ok(CStmt::Expr(self.check_expr(expr)?)),

            StmtKind::Assign(lhs, rhs) => {
                if !is_place(lhs) {
                    return Err(Error::sem(
                        SemError::NotAssignable(describe(lhs)),
                        lhs.pos,
                    ));
                }
                let clhs = self.check_expr(lhs)?;
                if matches!(clhs.ty, Type::Array(_, _)) {
                    return Err(Error::sem(
                        SemError::NotAssignable(String::from("an array")),
                        lhs.pos,
                    ));
                }
                let crhs = self.check_expr(rhs)?;
                if !self.compat(&clhs.ty, &crhs.ty) {
                    return Err(Error::sem(
                        SemError::TypeMismatch {
                            expected: clhs.ty.to_string(),
                            found: crhs.ty.to_string(),
                        },
                        rhs.pos,
                    ));
                }
                Ok(CStmt::Assign(clhs, crhs))
            }

            StmtKind::If(cond, then, otherwise) => {
                let ccond = self.check_cond(cond)?;
                let cthen = Box::new(self.check_stmt(then)?);
                let celse = match otherwise {
                    Some(stmt) => Some(Box::new(self.check_stmt(stmt)?)),
                    None => None,
                };
                Ok(CStmt::If(ccond, cthen, celse))
            }

            StmtKind::While(cond, body) => {
                let ccond = self.check_cond(cond)?;
                self.loop_depth += 1;
                let cbody = Box::new(self.check_stmt(body)?);
                self.loop_depth -= 1;
                Ok(CStmt::While(ccond, cbody))
            }

            StmtKind::Return(expr) => match expr {
                None => {
                    if self.ret != Type::Void {
                        return Err(Error::sem(
                            SemError::TypeMismatch {
                                expected: self.ret.to_string(),
                                found: String::from("void"),
                            },
                            pos,
                        ));
                    }
                    Ok(CStmt::Return(None))
                }
                Some(expr) => {
                    let cexpr = self.check_expr(expr)?;
                    if !self.compat(&self.ret, &cexpr.ty) {
                        return Err(Error::sem(
                            SemError::TypeMismatch {
                                expected: self.ret.to_string(),
                                found: cexpr.ty.to_string(),
                            },
                            expr.pos,
                        ));
                    }
                    Ok(CStmt::Return(Some(cexpr)))
                }
            },

            StmtKind::Break => {
                if self.loop_depth == 0 {
                    return Err(Error::sem(SemError::OutsideLoop("break"), pos));
                }
                Ok(CStmt::Break)
            }

            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(Error::sem(SemError::OutsideLoop("continue"), pos));
                }
                Ok(CStmt::Continue)
            }
        }
    }

    fn check_cond(&mut self, cond: &Expr) -> Result<CExpr, Error> {
        let ccond = self.check_expr(cond)?;
        if !ccond.ty.is_scalar() {
            return Err(Error::sem(
                SemError::TypeMismatch {
                    expected: String::from("scalar condition"),
                    found: ccond.ty.to_string(),
                },
                cond.pos,
            ));
        }
        Ok(ccond)
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn check_expr(&mut self, expr: &Expr) -> Result<CExpr, Error> {
        let pos = expr.pos;
        match &expr.kind {
            ExprKind::IntLit(n) => Ok(CExpr {
                ty: Type::Int,
                kind: CExprKind::Int(*n),
            }),

            ExprKind::CharLit(ch) => Ok(CExpr {
                ty: Type::Char,
                kind: CExprKind::Char(*ch),
            }),

            ExprKind::StrLit(s) => Ok(CExpr {
                ty: Type::Array(s.chars().count() + 1, Box::new(Type::Char)),
                kind: CExprKind::Str(s.clone()),
            }),

            ExprKind::Ident(name) => self.check_ident(name, pos),

            ExprKind::Binary(op, lhs, rhs) => self.check_binary(*op, lhs, rhs, pos),

            ExprKind::Neg(inner) => {
                let cinner = self.check_expr(inner)?;
                if !cinner.ty.is_arith() {
                    return Err(Error::sem(
                        SemError::TypeMismatch {
                            expected: String::from("int"),
                            found: cinner.ty.to_string(),
                        },
                        pos,
                    ));
                }
                Ok(CExpr {
                    ty: Type::Int,
                    kind: CExprKind::Neg(Box::new(cinner)),
                })
            }

            ExprKind::Deref(inner) => {
                let cinner = self.check_expr(inner)?;
                match cinner.ty.decayed() {
                    Type::Ptr(pointee) if *pointee != Type::Void => Ok(CExpr {
                        ty: *pointee,
                        kind: CExprKind::Deref(Box::new(cinner)),
                    }),
                    other => Err(Error::sem(
                        SemError::TypeMismatch {
                            expected: String::from("pointer"),
                            found: other.to_string(),
                        },
                        pos,
                    )),
                }
            }

            ExprKind::AddrOf(inner) => {
                if !is_place(inner) {
                    return Err(Error::sem(
                        SemError::NotAssignable(describe(inner)),
                        pos,
                    ));
                }
                let cinner = self.check_expr(inner)?;
                Ok(CExpr {
                    ty: Type::Ptr(Box::new(cinner.ty.clone())),
                    kind: CExprKind::AddrOf(Box::new(cinner)),
                })
            }

            ExprKind::Index(base, index) => {
                let cbase = self.check_expr(base)?;
                let (bound, elem) = match &cbase.ty {
                    Type::Array(len, elem) => (Some(*len), (**elem).clone()),
                    Type::Ptr(elem) if **elem != Type::Void => (None, (**elem).clone()),
                    other => {
                        return Err(Error::sem(
                            SemError::TypeMismatch {
                                expected: String::from("array"),
                                found: other.to_string(),
                            },
                            pos,
                        ))
                    }
                };
                let cindex = self.check_expr(index)?;
                if !cindex.ty.is_arith() {
                    return Err(Error::sem(
                        SemError::TypeMismatch {
                            expected: String::from("int"),
                            found: cindex.ty.to_string(),
                        },
                        index.pos,
                    ));
                }
                let elem_cells = self.table.cells(&elem);
                Ok(CExpr {
                    ty: elem,
                    kind: CExprKind::Index {
                        base: Box::new(cbase),
                        index: Box::new(cindex),
                        bound,
                        elem_cells,
                    },
                })
            }

            ExprKind::Field(base, field) => {
                let cbase = self.check_expr(base)?;
                match cbase.ty.clone() {
                    Type::Struct(sname) => match self.table.struct_field(&sname, field) {
                        Some((offset, ty)) => Ok(CExpr {
                            ty,
                            kind: CExprKind::StructField {
                                base: Box::new(cbase),
                                offset,
                            },
                        }),
                        None => Err(Error::sem(
                            SemError::UnknownField {
                                ty: format!("struct {sname}"),
                                field: field.clone(),
                            },
                            pos,
                        )),
                    },
                    // Field lookup is intentionally non-polymorphic: only the
                    // static class and its bases are searched
                    Type::Class(cname) => match self.table.class_field(&cname, field) {
                        Some((offset, ty)) => Ok(CExpr {
                            ty,
                            kind: CExprKind::ObjField {
                                base: Box::new(cbase),
                                offset,
                            },
                        }),
                        None => Err(Error::sem(
                            SemError::UnknownField {
                                ty: format!("class {cname}"),
                                field: field.clone(),
                            },
                            pos,
                        )),
                    },
                    other => Err(Error::sem(
                        SemError::TypeMismatch {
                            expected: String::from("struct or class"),
                            found: other.to_string(),
                        },
                        pos,
                    )),
                }
            }

            ExprKind::Call(name, args) => self.check_call(name, args, pos),

            ExprKind::MethodCall(recv, name, args) => {
                let crecv = self.check_expr(recv)?;
                let Type::Class(cname) = crecv.ty.clone() else {
                    return Err(Error::sem(
                        SemError::TypeMismatch {
                            expected: String::from("class instance"),
                            found: crecv.ty.to_string(),
                        },
                        pos,
                    ));
                };
                // The static type only provides the signature; the body that
                // runs is picked from the receiver's runtime class
                let Some((_, sig)) = self.table.lookup_method(&cname, name) else {
                    return Err(Error::sem(
                        SemError::UnknownMethod {
                            class: cname,
                            method: name.clone(),
                        },
                        pos,
                    ));
                };
                let sig = sig.clone();
                let cargs = self.check_args(name, &sig.params, args, pos)?;
                Ok(CExpr {
                    ty: sig.ret,
                    kind: CExprKind::MethodCall {
                        recv: Box::new(crecv),
                        name: name.clone(),
                        args: cargs,
                    },
                })
            }

            ExprKind::Cast(tyexpr, inner) => {
                let target = self.resolve(tyexpr, pos)?;
                let cinner = self.check_expr(inner)?;
                let kind = self.cast_kind(&cinner.ty, &target).ok_or_else(|| {
                    Error::sem(
                        SemError::InvalidCast {
                            from: cinner.ty.to_string(),
                            to: target.to_string(),
                        },
                        pos,
                    )
                })?;
                Ok(CExpr {
                    ty: target,
                    kind: CExprKind::Cast(kind, Box::new(cinner)),
                })
            }

            ExprKind::Sizeof(tyexpr) => {
                let ty = self.resolve(tyexpr, pos)?;
                Ok(CExpr {
                    ty: Type::Int,
                    kind: CExprKind::Sizeof(self.table.sizeof(&ty)),
                })
            }

            ExprKind::New(name) => {
                if !self.table.classes.contains_key(name) {
                    return Err(Error::sem(
                        SemError::UnknownType(format!("class {name}")),
                        pos,
                    ));
                }
                Ok(CExpr {
                    ty: Type::Class(name.clone()),
                    kind: CExprKind::New(name.clone()),
                })
            }
        }
    }

    /// Name resolution order: locals and parameters, then the enclosing
    /// class's fields, then file-scope variables.
    fn check_ident(&mut self, name: &str, pos: Pos) -> Result<CExpr, Error> {
        let global = match self.scopes.lookup(name) {
            Some(sym) if sym.storage != Storage::Global => {
                return Ok(CExpr {
                    ty: sym.ty.clone(),
                    kind: CExprKind::Local(name.to_string()),
                });
            }
            other => other.cloned(),
        };
        if let Some(class) = self.current_class.clone() {
            if let Some((offset, ty)) = self.table.class_field(&class, name) {
                return Ok(CExpr {
                    ty,
                    kind: CExprKind::SelfField { offset },
                });
            }
        }
        match global {
            Some(sym) => Ok(CExpr {
                ty: sym.ty,
                kind: CExprKind::Global(name.to_string()),
            }),
            None => Err(Error::sem(
                SemError::UndeclaredIdentifier(name.to_string()),
                pos,
            )),
        }
    }

    fn check_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        pos: Pos,
    ) -> Result<CExpr, Error> {
        let clhs = self.check_expr(lhs)?;
        let crhs = self.check_expr(rhs)?;
        let ok = match op {
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Mod
            | BinOp::Lt
            | BinOp::Le
            | BinOp::Gt
            | BinOp::Ge => clhs.ty.is_arith() && crhs.ty.is_arith(),
            BinOp::Eq | BinOp::Ne => {
                (clhs.ty.is_arith() && crhs.ty.is_arith())
                    || self.eq_comparable(&clhs.ty, &crhs.ty)
            }
            // Logical operators take any non-void scalar and short-circuit
            BinOp::And | BinOp::Or => clhs.ty.is_scalar() && crhs.ty.is_scalar(),
        };
        if !ok {
            return Err(Error::sem(
                SemError::TypeMismatch {
                    expected: format!("operands for {op}"),
                    found: format!("{} and {}", clhs.ty, crhs.ty),
                },
                pos,
            ));
        }
        Ok(CExpr {
            ty: Type::Int,
            kind: CExprKind::Binary(op, Box::new(clhs), Box::new(crhs)),
        })
    }

    fn eq_comparable(&self, lhs: &Type, rhs: &Type) -> bool {
        match (lhs.decayed(), rhs.decayed()) {
            (Type::Ptr(a), Type::Ptr(b)) => a == b || *a == Type::Void || *b == Type::Void,
            (Type::Class(a), Type::Class(b)) => {
                self.table.is_subtype(&a, &b) || self.table.is_subtype(&b, &a)
            }
            _ => false,
        }
    }

    fn check_call(&mut self, name: &str, args: &[Expr], pos: Pos) -> Result<CExpr, Error> {
        // Runtime library calls are opaque to the program
        if let Some((which, params, ret)) = BUILTINS.get(name).cloned() {
            let params: Vec<(String, Type)> = params
                .into_iter()
                .map(|ty| (String::new(), ty))
                .collect();
            let cargs = self.check_args(name, &params, args, pos)?;
            return Ok(CExpr {
                ty: ret,
                kind: CExprKind::Syscall { which, args: cargs },
            });
        }

        if let Some(entry) = self.sigs.get(name).cloned() {
            let cargs = self.check_args(name, &entry.params, args, pos)?;
            return Ok(CExpr {
                ty: entry.ret,
                kind: CExprKind::Call {
                    name: name.to_string(),
                    args: cargs,
                },
            });
        }

        // Unqualified call to a method of the enclosing class
        if let Some(class) = self.current_class.clone() {
            if let Some((_, sig)) = self.table.lookup_method(&class, name) {
                let sig = sig.clone();
                let cargs = self.check_args(name, &sig.params, args, pos)?;
                return Ok(CExpr {
                    ty: sig.ret,
                    kind: CExprKind::MethodCall {
                        recv: Box::new(CExpr {
                            ty: Type::Class(class),
                            kind: CExprKind::SelfRef,
                        }),
                        name: name.to_string(),
                        args: cargs,
                    },
                });
            }
        }

        Err(Error::sem(
            SemError::UndeclaredIdentifier(name.to_string()),
            pos,
        ))
    }

    fn check_args(
        &mut self,
        name: &str,
        params: &[(String, Type)],
        args: &[Expr],
        pos: Pos,
    ) -> Result<Vec<CExpr>, Error> {
        if params.len() != args.len() {
            return Err(Error::sem(
                SemError::ArityMismatch {
                    name: name.to_string(),
                    expected: params.len(),
                    found: args.len(),
                },
                pos,
            ));
        }
        let mut cargs = Vec::new();
        for ((_, pty), arg) in params.iter().zip(args) {
            let carg = self.check_expr(arg)?;
            if !self.compat(pty, &carg.ty) {
                return Err(Error::sem(
                    SemError::TypeMismatch {
                        expected: pty.to_string(),
                        found: carg.ty.to_string(),
                    },
                    arg.pos,
                ));
            }
            cargs.push(carg);
        }
        Ok(cargs)
    }

    /// Implicit conversions accepted at assignment, argument and return
    /// sites: char widens to int, arrays decay to element pointers, void
    /// pointers convert freely, class handles upcast.
    fn compat(&self, expected: &Type, found: &Type) -> bool {
        if expected == found {
            return true;
        }
        match (expected, found) {
            (Type::Int, Type::Char) => true,
            (Type::Ptr(t), Type::Array(_, u)) => t == u || **t == Type::Void,
            (Type::Ptr(t), Type::Ptr(u)) => **t == Type::Void || **u == Type::Void,
            // Both sides decay; the declared lengths are not part of the match
            (Type::Array(_, t), Type::Array(_, u)) => t == u,
            (Type::Class(base), Type::Class(sub)) => self.table.is_subtype(sub, base),
            _ => false,
        }
    }

    /// Explicit casts: primitive narrowing/widening, pointer shapes, and
    /// class casts along the extends chain in either direction.
    fn cast_kind(&self, from: &Type, to: &Type) -> Option<CastKind> {
        if from == to {
            return Some(CastKind::Noop);
        }
        match (from, to) {
            (Type::Int, Type::Char) => Some(CastKind::IntToChar),
            (Type::Char, Type::Int) => Some(CastKind::CharToInt),
            (Type::Ptr(_) | Type::Array(_, _), Type::Ptr(_)) => Some(CastKind::Noop),
            (Type::Class(sub), Type::Class(base)) if self.table.is_subtype(sub, base) => {
                Some(CastKind::Noop)
            }
            (Type::Class(base), Type::Class(sub)) if self.table.is_subtype(sub, base) => {
                Some(CastKind::Downcast(sub.clone()))
            }
            _ => None,
        }
    }
}

/// Addressable locations: variable, dereference, field, or index expression
fn is_place(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Ident(_) | ExprKind::Deref(_) | ExprKind::Field(_, _) | ExprKind::Index(_, _)
    )
}

fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::IntLit(_) | ExprKind::CharLit(_) | ExprKind::StrLit(_) => {
            String::from("a literal")
        }
        ExprKind::Call(_, _) | ExprKind::MethodCall(_, _, _) => String::from("a call result"),
        ExprKind::Binary(_, _, _) | ExprKind::Neg(_) => String::from("an operator result"),
        _ => String::from("this expression"),
    }
}

use super::ast::{
    Ast, BinOp, ClassDecl, Decl, DeclKind, Expr, ExprKind, FunDef, FunSig, Stmt, StmtKind, TyExpr,
};
use super::parsercore::Parser;
use super::token::{Pos, Token, TokenKind::*};
use crate::error::Error;
use crate::{check, expect, repeat};

impl Parser {
    pub fn parse(mut self) -> Result<Ast, Error> {
        let mut decls = Vec::new();
        while self.peek().is_some() {
            decls.push(self.parse_decl()?);
        }
        Ok(Ast(decls))
    }

    fn pos(&self) -> Pos {
        match self.peek() {
            Some(token) => token.pos,
            None => Pos::null(),
        }
    }

    /// True if the next token can begin a type
    fn at_type(&self) -> bool {
        check!(self, KwInt | KwChar | KwVoid | KwStruct | KwClass)
    }

    /// decl = struct-decl | class-decl | var-decl | fun-proto | fun-def
    fn parse_decl(&mut self) -> Result<Decl, Error> {
        let pos = self.pos();

        // struct-decl = "struct" ident "{" { var-decl } "}" ";"
        if check!(self, KwStruct) && matches!(self.peek_nth(2), Some(Token { kind: LCurly, .. })) {
            expect!(self, KwStruct)?;
            let name = self.parse_ident()?;
            expect!(self, LCurly)?;
            let fields = repeat!(self, self.parse_var(), RCurly);
            expect!(self, RCurly)?;
            expect!(self, Semicolon)?;
            return Ok(Decl {
                pos,
                kind: DeclKind::Struct(name, fields),
            });
        }

        // class-decl = "class" ident [ "extends" ident ] "{" { var-decl } { fun-def } "}"
        if check!(self, KwClass)
            && matches!(
                self.peek_nth(2),
                Some(Token { kind: LCurly, .. }) | Some(Token { kind: KwExtends, .. })
            )
        {
            return self.parse_class(pos);
        }

        // Remaining forms all start with: type ident
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;

        // fun-proto = type ident "(" params ")" ";"
        // fun-def   = type ident "(" params ")" block
        if check!(self, LParen) {
            let params = self.parse_params()?;
            let sig = FunSig {
                name,
                params,
                ret: ty,
            };
            if check!(self, Semicolon) {
                expect!(self, Semicolon)?;
                return Ok(Decl {
                    pos,
                    kind: DeclKind::Proto(sig),
                });
            }
            let body = self.parse_block_stmts()?;
            return Ok(Decl {
                pos,
                kind: DeclKind::Fun(FunDef { sig, body }),
            });
        }

        // var-decl = type ident { "[" num "]" } ";"
        let ty = self.parse_dims(ty)?;
        expect!(self, Semicolon)?;
        Ok(Decl {
            pos,
            kind: DeclKind::Var(name, ty),
        })
    }

    fn parse_class(&mut self, pos: Pos) -> Result<Decl, Error> {
        expect!(self, KwClass)?;
        let name = self.parse_ident()?;
        let base = if check!(self, KwExtends) {
            expect!(self, KwExtends)?;
            Some(self.parse_ident()?)
        } else {
            None
        };
        expect!(self, LCurly)?;

        // Members all start with: type ident; a "(" then decides method vs field
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !check!(self, RCurly) {
            let ty = self.parse_type()?;
            let member = self.parse_ident()?;
            if check!(self, LParen) {
                let params = self.parse_params()?;
                let body = self.parse_block_stmts()?;
                methods.push(FunDef {
                    sig: FunSig {
                        name: member,
                        params,
                        ret: ty,
                    },
                    body,
                });
            } else {
                let ty = self.parse_dims(ty)?;
                expect!(self, Semicolon)?;
                fields.push((member, ty));
            }
        }
        expect!(self, RCurly)?;
        Ok(Decl {
            pos,
            kind: DeclKind::Class(ClassDecl {
                name,
                base,
                fields,
                methods,
            }),
        })
    }

    /// type = ( "int" | "char" | "void" | "struct" ident | "class" ident ) { "*" }
    fn parse_type(&mut self) -> Result<TyExpr, Error> {
        let mut ty = match self.peek() {
            Some(Token { kind: KwInt, .. }) => {
                expect!(self, KwInt)?;
                TyExpr::Int
            }
            Some(Token { kind: KwChar, .. }) => {
                expect!(self, KwChar)?;
                TyExpr::Char
            }
            Some(Token { kind: KwVoid, .. }) => {
                expect!(self, KwVoid)?;
                TyExpr::Void
            }
            Some(Token { kind: KwStruct, .. }) => {
                expect!(self, KwStruct)?;
                TyExpr::Struct(self.parse_ident()?)
            }
            Some(Token { kind: KwClass, .. }) => {
                expect!(self, KwClass)?;
                TyExpr::Class(self.parse_ident()?)
            }
            Some(token) => {
                return Err(Error::UnexpectedToken {
                    kind: token.kind.clone(),
                    pos: token.pos,
                })
            }
            None => return Err(Error::UnexpectedEof),
        };
        while check!(self, Star) {
            expect!(self, Star)?;
            ty = TyExpr::Ptr(Box::new(ty));
        }
        Ok(ty)
    }

    /// { "[" num "]" } appended to a declared type, first dimension outermost
    fn parse_dims(&mut self, base: TyExpr) -> Result<TyExpr, Error> {
        let mut dims = Vec::new();
        while check!(self, LBracket) {
            expect!(self, LBracket)?;
            let len = match expect!(self, Number(_))?.kind {
                Number(n) => n as usize,
                _ => 0,
            };
            expect!(self, RBracket)?;
            dims.push(len);
        }
        let mut ty = base;
        for len in dims.into_iter().rev() {
            ty = TyExpr::Array(len, Box::new(ty));
        }
        Ok(ty)
    }

    /// var-decl = type ident { "[" num "]" } ";"
    fn parse_var(&mut self) -> Result<(String, TyExpr), Error> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        let ty = self.parse_dims(ty)?;
        expect!(self, Semicolon)?;
        Ok((name, ty))
    }

    /// params = "(" [ param { "," param } ] ")" with param = type ident { "[" num "]" }
    fn parse_params(&mut self) -> Result<Vec<(String, TyExpr)>, Error> {
        expect!(self, LParen)?;
        let params = repeat!(self, self.parse_param(), Comma, RParen);
        expect!(self, RParen)?;
        Ok(params)
    }

    fn parse_param(&mut self) -> Result<(String, TyExpr), Error> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        let ty = self.parse_dims(ty)?;
        Ok((name, ty))
    }

    /// block = "{" { stmt } "}"
    fn parse_block_stmts(&mut self) -> Result<Vec<Stmt>, Error> {
        expect!(self, LCurly)?;
        let stmts = repeat!(self, self.parse_stmt(), RCurly);
        expect!(self, RCurly)?;
        Ok(stmts)
    }

    /// stmt = block | var-decl | if-stmt | while-stmt | return-stmt
    ///      | "break" ";" | "continue" ";" | assign-stmt | expr-stmt
    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        let pos = self.pos();

        // Block statement: "{" { stmt } "}"
        if check!(self, LCurly) {
            let stmts = self.parse_block_stmts()?;
            return Ok(Stmt {
                pos,
                kind: StmtKind::Block(stmts),
            });
        }

        // Variable declaration: type ident { "[" num "]" } ";"
        if self.at_type() {
            let (name, ty) = self.parse_var()?;
            return Ok(Stmt {
                pos,
                kind: StmtKind::Var(name, ty),
            });
        }

        // Conditional: "if" "(" expr ")" stmt [ "else" stmt ]
        if check!(self, KwIf) {
            expect!(self, KwIf)?;
            expect!(self, LParen)?;
            let cond = self.parse_expr()?;
            expect!(self, RParen)?;
            let then = Box::new(self.parse_stmt()?);
            let otherwise = if check!(self, KwElse) {
                expect!(self, KwElse)?;
                Some(Box::new(self.parse_stmt()?))
            } else {
                None
            };
            return Ok(Stmt {
                pos,
                kind: StmtKind::If(cond, then, otherwise),
            });
        }

        // Loop: "while" "(" expr ")" stmt
        if check!(self, KwWhile) {
            expect!(self, KwWhile)?;
            expect!(self, LParen)?;
            let cond = self.parse_expr()?;
            expect!(self, RParen)?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt {
                pos,
                kind: StmtKind::While(cond, body),
            });
        }

        // Return: "return" [ expr ] ";"
        if check!(self, KwReturn) {
            expect!(self, KwReturn)?;
            let expr = if check!(self, Semicolon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            expect!(self, Semicolon)?;
            return Ok(Stmt {
                pos,
                kind: StmtKind::Return(expr),
            });
        }

        if check!(self, KwBreak) {
            expect!(self, KwBreak)?;
            expect!(self, Semicolon)?;
            return Ok(Stmt {
                pos,
                kind: StmtKind::Break,
            });
        }

        if check!(self, KwContinue) {
            expect!(self, KwContinue)?;
            expect!(self, Semicolon)?;
            return Ok(Stmt {
                pos,
                kind: StmtKind::Continue,
            });
        }

        // Expression-based statements
        let expr = self.parse_expr()?;
        if check!(self, Equal) {
            // Assignment statement: expr "=" expr ";"
            expect!(self, Equal)?;
            let rhs = self.parse_expr()?;
            expect!(self, Semicolon)?;
            return Ok(Stmt {
                pos,
                kind: StmtKind::Assign(expr, rhs),
            });
        }
        expect!(self, Semicolon)?;
        Ok(Stmt {
            pos,
            kind: StmtKind::Expr(expr),
        })
    }

    /// expr = or-expr
    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or_expr()
    }

    /// or-expr = and-expr { "||" and-expr }
    fn parse_or_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        let mut lhs = self.parse_and_expr()?;
        while check!(self, PipePipe) {
            expect!(self, PipePipe)?;
            let rhs = self.parse_and_expr()?;
            lhs = binary(pos, BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    /// and-expr = eq-expr { "&&" eq-expr }
    fn parse_and_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        let mut lhs = self.parse_eq_expr()?;
        while check!(self, AmpAmp) {
            expect!(self, AmpAmp)?;
            let rhs = self.parse_eq_expr()?;
            lhs = binary(pos, BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    /// eq-expr = relat-expr { ( "==" | "!=" ) relat-expr }
    fn parse_eq_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        let mut lhs = self.parse_relat_expr()?;
        loop {
            if check!(self, EqualEqual) {
                expect!(self, EqualEqual)?;
                let rhs = self.parse_relat_expr()?;
                lhs = binary(pos, BinOp::Eq, lhs, rhs);
            } else if check!(self, ExclEqual) {
                expect!(self, ExclEqual)?;
                let rhs = self.parse_relat_expr()?;
                lhs = binary(pos, BinOp::Ne, lhs, rhs);
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    /// relat-expr = add-expr { ( "<" | "<=" | ">" | ">=" ) add-expr }
    fn parse_relat_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        let mut lhs = self.parse_add_expr()?;
        loop {
            let op = if check!(self, LAngleEqual) {
                expect!(self, LAngleEqual)?;
                BinOp::Le
            } else if check!(self, RAngleEqual) {
                expect!(self, RAngleEqual)?;
                BinOp::Ge
            } else if check!(self, LAngle) {
                expect!(self, LAngle)?;
                BinOp::Lt
            } else if check!(self, RAngle) {
                expect!(self, RAngle)?;
                BinOp::Gt
            } else {
                break;
            };
            let rhs = self.parse_add_expr()?;
            lhs = binary(pos, op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// add-expr = mul-expr { ( "+" | "-" ) mul-expr }
    fn parse_add_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        let mut lhs = self.parse_mul_expr()?;
        loop {
            let op = if check!(self, Plus) {
                expect!(self, Plus)?;
                BinOp::Add
            } else if check!(self, Minus) {
                expect!(self, Minus)?;
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_mul_expr()?;
            lhs = binary(pos, op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// mul-expr = unary-expr { ( "*" | "/" | "%" ) unary-expr }
    fn parse_mul_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = if check!(self, Star) {
                expect!(self, Star)?;
                BinOp::Mul
            } else if check!(self, Slash) {
                expect!(self, Slash)?;
                BinOp::Div
            } else if check!(self, Percent) {
                expect!(self, Percent)?;
                BinOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_unary_expr()?;
            lhs = binary(pos, op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// unary-expr = "-" unary-expr | "*" unary-expr | "&" unary-expr
    ///            | "(" type ")" unary-expr | postfix-expr
    fn parse_unary_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();

        if check!(self, Minus) {
            expect!(self, Minus)?;
            let expr = self.parse_unary_expr()?;
            return Ok(Expr {
                pos,
                kind: ExprKind::Neg(Box::new(expr)),
            });
        }

        // Dereference: "*" expr
        if check!(self, Star) {
            expect!(self, Star)?;
            let expr = self.parse_unary_expr()?;
            return Ok(Expr {
                pos,
                kind: ExprKind::Deref(Box::new(expr)),
            });
        }

        // Address-of: "&" expr
        if check!(self, Amp) {
            expect!(self, Amp)?;
            let expr = self.parse_unary_expr()?;
            return Ok(Expr {
                pos,
                kind: ExprKind::AddrOf(Box::new(expr)),
            });
        }

        // Type cast: "(" type ")" unary-expr
        if check!(self, LParen)
            && matches!(
                self.peek_nth(1),
                Some(Token {
                    kind: KwInt | KwChar | KwVoid | KwStruct | KwClass,
                    ..
                })
            )
        {
            expect!(self, LParen)?;
            let ty = self.parse_type()?;
            expect!(self, RParen)?;
            let expr = self.parse_unary_expr()?;
            return Ok(Expr {
                pos,
                kind: ExprKind::Cast(ty, Box::new(expr)),
            });
        }

        self.parse_postfix_expr()
    }

    /// postfix-expr = prim-expr { "[" expr "]" | "." ident [ "(" args ")" ] }
    fn parse_postfix_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        let mut expr = self.parse_prim_expr()?;
        loop {
            // Array indexing: expr "[" expr "]"
            if check!(self, LBracket) {
                expect!(self, LBracket)?;
                let index = self.parse_expr()?;
                expect!(self, RBracket)?;
                expr = Expr {
                    pos,
                    kind: ExprKind::Index(Box::new(expr), Box::new(index)),
                };
                continue;
            }

            // Field access or method call: expr "." ident [ "(" args ")" ]
            if check!(self, Dot) {
                expect!(self, Dot)?;
                let name = self.parse_ident()?;
                if check!(self, LParen) {
                    let args = self.parse_args()?;
                    expr = Expr {
                        pos,
                        kind: ExprKind::MethodCall(Box::new(expr), name, args),
                    };
                } else {
                    expr = Expr {
                        pos,
                        kind: ExprKind::Field(Box::new(expr), name),
                    };
                }
                continue;
            }

            break;
        }
        Ok(expr)
    }

    /// prim-expr = "(" expr ")" | ident [ "(" args ")" ] | num-lit | char-lit
    ///           | string-lit | sizeof-expr | new-expr
    fn parse_prim_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.pos();
        match self.peek() {
            // Parenthesized expression: "(" expr ")"
            Some(Token { kind: LParen, .. }) => {
                expect!(self, LParen)?;
                let inner = self.parse_expr()?;
                expect!(self, RParen)?;
                Ok(inner)
            }

            // Identifier or function call
            Some(Token { kind: Ident(_), .. }) => {
                let name = self.parse_ident()?;
                if check!(self, LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr {
                        pos,
                        kind: ExprKind::Call(name, args),
                    })
                } else {
                    Ok(Expr {
                        pos,
                        kind: ExprKind::Ident(name),
                    })
                }
            }

            // Number literal
            Some(Token {
                kind: Number(n), ..
            }) => {
                let n = *n;
                expect!(self, Number(_))?;
                Ok(Expr {
                    pos,
                    kind: ExprKind::IntLit(n),
                })
            }

            // Character literal
            Some(Token { kind: Char(ch), .. }) => {
                let ch = *ch;
                expect!(self, Char(_))?;
                Ok(Expr {
                    pos,
                    kind: ExprKind::CharLit(ch),
                })
            }

            // String literal
            Some(Token { kind: Text(s), .. }) => {
                let s = s.clone();
                expect!(self, Text(_))?;
                Ok(Expr {
                    pos,
                    kind: ExprKind::StrLit(s),
                })
            }

            // Sizeof: "sizeof" "(" type ")"
            Some(Token { kind: KwSizeof, .. }) => {
                expect!(self, KwSizeof)?;
                expect!(self, LParen)?;
                let ty = self.parse_type()?;
                expect!(self, RParen)?;
                Ok(Expr {
                    pos,
                    kind: ExprKind::Sizeof(ty),
                })
            }

            // Instantiation: "new" "class" ident "(" ")"
            Some(Token { kind: KwNew, .. }) => {
                expect!(self, KwNew)?;
                expect!(self, KwClass)?;
                let name = self.parse_ident()?;
                expect!(self, LParen)?;
                expect!(self, RParen)?;
                Ok(Expr {
                    pos,
                    kind: ExprKind::New(name),
                })
            }

            Some(token) => Err(Error::UnexpectedToken {
                kind: token.kind.clone(),
                pos: token.pos,
            }),
            None => Err(Error::UnexpectedEof),
        }
    }

    /// args = "(" [ expr { "," expr } ] ")"
    fn parse_args(&mut self) -> Result<Vec<Expr>, Error> {
        expect!(self, LParen)?;
        let args = repeat!(self, self.parse_expr(), Comma, RParen);
        expect!(self, RParen)?;
        Ok(args)
    }

    /// ident = ( "A".."Z" | "a".."z" | "_" ) { "0".."9" | "A".."Z" | "a".."z" | "_" }
    fn parse_ident(&mut self) -> Result<String, Error> {
        match expect!(self, Ident(_))?.kind {
            Ident(s) => Ok(s),
            _ => Err(Error::UnexpectedEof),
        }
    }
}

fn binary(pos: Pos, op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr {
        pos,
        kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
    }
}

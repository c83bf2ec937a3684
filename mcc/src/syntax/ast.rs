use super::token::Pos;

/// program = { struct-decl | class-decl | var-decl | fun-proto | fun-def }
#[derive(Debug, Clone)]
pub struct Ast(pub Vec<Decl>);

#[derive(Debug, Clone)]
pub struct Decl {
    pub pos: Pos,
    pub kind: DeclKind,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Struct(String, Vec<(String, TyExpr)>), // "struct" ident "{" { var-decl } "}" ";"
    Class(ClassDecl),                      // "class" ident [ "extends" ident ] "{" ... "}"
    Var(String, TyExpr),                   // type ident { "[" num "]" } ";"
    Proto(FunSig),                         // type ident "(" params ")" ";"
    Fun(FunDef),                           // type ident "(" params ")" block
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub base: Option<String>,
    pub fields: Vec<(String, TyExpr)>,
    pub methods: Vec<FunDef>,
}

#[derive(Debug, Clone)]
pub struct FunSig {
    pub name: String,
    pub params: Vec<(String, TyExpr)>,
    pub ret: TyExpr,
}

#[derive(Debug, Clone)]
pub struct FunDef {
    pub sig: FunSig,
    pub body: Vec<Stmt>,
}

/// Type expression as written in the source; resolved against the type
/// table during checking.
#[derive(Debug, Clone)]
pub enum TyExpr {
    Int,                         // "int"
    Char,                        // "char"
    Void,                        // "void"
    Ptr(Box<TyExpr>),            // type "*"
    Array(usize, Box<TyExpr>),   // type ident "[" num "]"
    Struct(String),              // "struct" ident
    Class(String),               // "class" ident
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub pos: Pos,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<Stmt>),                         // "{" { stmt } "}"
    Var(String, TyExpr),                      // type ident { "[" num "]" } ";"
    Expr(Expr),                               // expr ";"
    Assign(Expr, Expr),                       // expr "=" expr ";"
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),   // "if" "(" expr ")" stmt [ "else" stmt ]
    While(Expr, Box<Stmt>),                   // "while" "(" expr ")" stmt
    Return(Option<Expr>),                     // "return" [ expr ] ";"
    Break,                                    // "break" ";"
    Continue,                                 // "continue" ";"
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub pos: Pos,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLit(i64),                              // num-lit
    CharLit(char),                            // char-lit
    StrLit(String),                           // string-lit
    Ident(String),                            // ident
    Binary(BinOp, Box<Expr>, Box<Expr>),      // expr (binop) expr
    Neg(Box<Expr>),                           // "-" expr
    Deref(Box<Expr>),                         // "*" expr
    AddrOf(Box<Expr>),                        // "&" expr
    Call(String, Vec<Expr>),                  // ident "(" [ expr { "," expr } ] ")"
    MethodCall(Box<Expr>, String, Vec<Expr>), // expr "." ident "(" args ")"
    Field(Box<Expr>, String),                 // expr "." ident
    Index(Box<Expr>, Box<Expr>),              // expr "[" expr "]"
    Cast(TyExpr, Box<Expr>),                  // "(" type ")" expr
    Sizeof(TyExpr),                           // "sizeof" "(" type ")"
    New(String),                              // "new" "class" ident "(" ")"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BinOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

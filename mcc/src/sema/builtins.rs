use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::types::Type;

/// Runtime library call, dispatched by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    PrintI,
    PrintC,
    PrintS,
    ReadI,
    ReadC,
    Malloc,
}

/// Fixed signatures of the host-provided runtime library. Programs may
/// re-declare these as prototypes; the declarations are accepted and the
/// fixed signatures win.
pub static BUILTINS: Lazy<IndexMap<&'static str, (Builtin, Vec<Type>, Type)>> = Lazy::new(|| {
    IndexMap::from([
        ("print_i", (Builtin::PrintI, vec![Type::Int], Type::Void)),
        ("print_c", (Builtin::PrintC, vec![Type::Char], Type::Void)),
        (
            "print_s",
            (
                Builtin::PrintS,
                vec![Type::Ptr(Box::new(Type::Char))],
                Type::Void,
            ),
        ),
        ("read_i", (Builtin::ReadI, vec![], Type::Int)),
        ("read_c", (Builtin::ReadC, vec![], Type::Char)),
        (
            "mcmalloc",
            (
                Builtin::Malloc,
                vec![Type::Int],
                Type::Ptr(Box::new(Type::Void)),
            ),
        ),
    ])
});

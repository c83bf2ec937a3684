use mcc::sema::table::TypeTable;
use mcc::Type;

/// Address of one storage cell: a block in the store plus a cell offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub block: usize,
    pub offset: usize,
}

/// Runtime value. Primitives and struct values copy; `Obj` is a handle to a
/// heap-resident object and copies the handle only, which is what makes
/// class instances alias. A `None` pointer or handle is the
/// null/uninitialised state.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Char(char),
    Ptr(Option<Addr>),
    /// Flattened cell image of a struct's fields
    Struct(Vec<Value>),
    Obj(Option<usize>),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Char(ch) => *ch != '\0',
            Value::Ptr(addr) => addr.is_some(),
            Value::Obj(handle) => handle.is_some(),
            Value::Struct(_) => true,
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Char(ch) => *ch as i64,
            _ => 0,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Value::Char(ch) => *ch,
            Value::Int(n) => (*n as u8) as char,
            _ => '\0',
        }
    }
}

/// Zero-initialised cell image for a declared type: scalars take one cell,
/// arrays and structs are laid out contiguously.
pub fn default_image(ty: &Type, table: &TypeTable) -> Vec<Value> {
    match ty {
        Type::Int => vec![Value::Int(0)],
        Type::Char => vec![Value::Char('\0')],
        Type::Void => vec![],
        Type::Ptr(_) => vec![Value::Ptr(None)],
        Type::Class(_) => vec![Value::Obj(None)],
        Type::Array(len, elem) => {
            let one = default_image(elem, table);
            let mut image = Vec::with_capacity(len * one.len());
            for _ in 0..*len {
                image.extend(one.iter().cloned());
            }
            image
        }
        Type::Struct(name) => match table.structs.get(name) {
            Some(def) => def
                .fields
                .values()
                .flat_map(|fty| default_image(fty, table))
                .collect(),
            None => vec![],
        },
    }
}

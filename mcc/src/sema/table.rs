use indexmap::IndexMap;

use super::types::Type;
use crate::error::SemError;
use crate::syntax::ast::TyExpr;

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: IndexMap<String, Type>,
}

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub ret: Type,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub base: Option<String>,
    pub fields: IndexMap<String, Type>,
    pub methods: IndexMap<String, MethodSig>,
}

/// Registry of struct layouts and class definitions. Built once from the
/// top-level declarations, immutable during checking and execution.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    pub structs: IndexMap<String, StructDef>,
    pub classes: IndexMap<String, ClassDef>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_struct(&mut self, def: StructDef) -> Result<(), SemError> {
        if self.structs.contains_key(&def.name) {
            return Err(SemError::DuplicateDefinition(def.name));
        }
        self.structs.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn register_class(&mut self, def: ClassDef) -> Result<(), SemError> {
        if self.classes.contains_key(&def.name) {
            return Err(SemError::DuplicateDefinition(def.name));
        }
        self.classes.insert(def.name.clone(), def);
        Ok(())
    }

    /// Check base links: every `extends` target exists and following the
    /// links from any class never revisits it.
    pub fn validate(&self) -> Result<(), SemError> {
        for def in self.classes.values() {
            if let Some(base) = &def.base {
                if !self.classes.contains_key(base) {
                    return Err(SemError::UnknownBase {
                        class: def.name.clone(),
                        base: base.clone(),
                    });
                }
            }
        }
        for def in self.classes.values() {
            let mut cursor = def.base.as_deref();
            let mut steps = 0;
            while let Some(name) = cursor {
                if name == def.name || steps > self.classes.len() {
                    return Err(SemError::InheritanceCycle(def.name.clone()));
                }
                cursor = self.classes[name].base.as_deref();
                steps += 1;
            }
        }
        // A struct holding itself by value (directly or through another
        // struct) would have no finite layout
        for def in self.structs.values() {
            if self.struct_contains(&def.name, &def.name) {
                return Err(SemError::RecursiveStruct(def.name.clone()));
            }
        }
        Ok(())
    }

    fn struct_contains(&self, name: &str, target: &str) -> bool {
        let Some(def) = self.structs.get(name) else {
            return false;
        };
        def.fields.values().any(|ty| match strip_arrays(ty) {
            Type::Struct(inner) => inner == target || self.struct_contains(inner, target),
            _ => false,
        })
    }

    /// Resolve a declared type expression against the table.
    pub fn resolve(&self, ty: &TyExpr) -> Result<Type, SemError> {
        match ty {
            TyExpr::Int => Ok(Type::Int),
            TyExpr::Char => Ok(Type::Char),
            TyExpr::Void => Ok(Type::Void),
            TyExpr::Ptr(inner) => Ok(Type::Ptr(Box::new(self.resolve(inner)?))),
            TyExpr::Array(len, elem) => Ok(Type::Array(*len, Box::new(self.resolve(elem)?))),
            TyExpr::Struct(name) => {
                if self.structs.contains_key(name) {
                    Ok(Type::Struct(name.clone()))
                } else {
                    Err(SemError::UnknownType(format!("struct {name}")))
                }
            }
            TyExpr::Class(name) => {
                if self.classes.contains_key(name) {
                    Ok(Type::Class(name.clone()))
                } else {
                    Err(SemError::UnknownType(format!("class {name}")))
                }
            }
        }
    }

    /// True iff `base` is `sub` itself or appears on `sub`'s extends chain.
    pub fn is_subtype(&self, sub: &str, base: &str) -> bool {
        let mut cursor = Some(sub);
        while let Some(name) = cursor {
            if name == base {
                return true;
            }
            cursor = self
                .classes
                .get(name)
                .and_then(|def| def.base.as_deref());
        }
        false
    }

    /// Walk from the most-derived class upward and return the first class
    /// declaring `name`. The walk order is what implements override.
    pub fn lookup_method(&self, class: &str, name: &str) -> Option<(&str, &MethodSig)> {
        let mut cursor = Some(class);
        while let Some(cname) = cursor {
            let (stored_name, def) = self.classes.get_key_value(cname)?;
            if let Some(sig) = def.methods.get(name) {
                return Some((stored_name.as_str(), sig));
            }
            cursor = def.base.as_deref();
        }
        None
    }

    /// Full field layout of a class: inherited fields first, in declaration
    /// order, then the class's own fields.
    pub fn class_layout(&self, class: &str) -> Vec<(String, Type)> {
        let mut chain = Vec::new();
        let mut cursor = Some(class);
        while let Some(name) = cursor {
            chain.push(name);
            cursor = self
                .classes
                .get(name)
                .and_then(|def| def.base.as_deref());
        }
        let mut layout = Vec::new();
        for name in chain.into_iter().rev() {
            if let Some(def) = self.classes.get(name) {
                for (fname, fty) in &def.fields {
                    layout.push((fname.clone(), fty.clone()));
                }
            }
        }
        layout
    }

    /// Field of a class visible through its static type, as cell offset into
    /// the full layout. Fields declared on a derived class shadow base ones.
    pub fn class_field(&self, class: &str, field: &str) -> Option<(usize, Type)> {
        let layout = self.class_layout(class);
        let mut hit = None;
        let mut offset = 0;
        for (fname, fty) in &layout {
            if fname == field {
                hit = Some((offset, fty.clone()));
            }
            offset += self.cells(fty);
        }
        hit
    }

    /// Field of a struct, as cell offset into its layout.
    pub fn struct_field(&self, name: &str, field: &str) -> Option<(usize, Type)> {
        let def = self.structs.get(name)?;
        let mut offset = 0;
        for (fname, fty) in &def.fields {
            if fname == field {
                return Some((offset, fty.clone()));
            }
            offset += self.cells(fty);
        }
        None
    }

    /// Number of storage cells a value of this type occupies. Scalars take
    /// one cell; aggregates are contiguous, row-major / field-ordered.
    pub fn cells(&self, ty: &Type) -> usize {
        match ty {
            Type::Int | Type::Char | Type::Ptr(_) | Type::Class(_) => 1,
            Type::Void => 0,
            Type::Array(len, elem) => len * self.cells(elem),
            Type::Struct(name) => match self.structs.get(name) {
                Some(def) => def.fields.values().map(|f| self.cells(f)).sum(),
                None => 0,
            },
        }
    }

    /// Byte size reported by `sizeof`; never evaluates an operand.
    pub fn sizeof(&self, ty: &Type) -> usize {
        match ty {
            Type::Int => 4,
            Type::Char => 1,
            Type::Void => 0,
            Type::Ptr(_) | Type::Class(_) => 4,
            Type::Array(len, elem) => len * self.sizeof(elem),
            Type::Struct(name) => match self.structs.get(name) {
                Some(def) => def.fields.values().map(|f| self.sizeof(f)).sum(),
                None => 0,
            },
        }
    }

    /// Heap size of an instance: the full field layout, inherited included.
    pub fn instance_cells(&self, class: &str) -> usize {
        self.class_layout(class)
            .iter()
            .map(|(_, ty)| self.cells(ty))
            .sum()
    }
}

fn strip_arrays(ty: &Type) -> &Type {
    match ty {
        Type::Array(_, elem) => strip_arrays(elem),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_abc() -> TypeTable {
        let mut table = TypeTable::new();
        table
            .register_class(ClassDef {
                name: "A".into(),
                base: None,
                fields: IndexMap::from([("a".to_string(), Type::Int)]),
                methods: IndexMap::from([(
                    "hello".to_string(),
                    MethodSig {
                        name: "hello".into(),
                        params: vec![],
                        ret: Type::Void,
                    },
                )]),
            })
            .unwrap();
        table
            .register_class(ClassDef {
                name: "B".into(),
                base: Some("A".into()),
                fields: IndexMap::from([("b".to_string(), Type::Int)]),
                methods: IndexMap::new(),
            })
            .unwrap();
        table
            .register_class(ClassDef {
                name: "C".into(),
                base: Some("B".into()),
                fields: IndexMap::new(),
                methods: IndexMap::from([(
                    "hello".to_string(),
                    MethodSig {
                        name: "hello".into(),
                        params: vec![],
                        ret: Type::Void,
                    },
                )]),
            })
            .unwrap();
        table.validate().unwrap();
        table
    }

    #[test]
    fn subtype_walks_extends_chain() {
        let table = table_abc();
        assert!(table.is_subtype("C", "A"));
        assert!(table.is_subtype("B", "B"));
        assert!(!table.is_subtype("A", "C"));
    }

    #[test]
    fn method_lookup_prefers_most_derived() {
        let table = table_abc();
        let (owner, _) = table.lookup_method("C", "hello").unwrap();
        assert_eq!(owner, "C");
        let (owner, _) = table.lookup_method("B", "hello").unwrap();
        assert_eq!(owner, "A");
    }

    #[test]
    fn layout_puts_inherited_fields_first() {
        let table = table_abc();
        let layout = table.class_layout("B");
        assert_eq!(layout[0].0, "a");
        assert_eq!(layout[1].0, "b");
        assert_eq!(table.class_field("B", "b").unwrap().0, 1);
        assert!(table.class_field("A", "b").is_none());
    }

    #[test]
    fn cycle_is_a_definition_error() {
        let mut table = TypeTable::new();
        table
            .register_class(ClassDef {
                name: "X".into(),
                base: Some("Y".into()),
                fields: IndexMap::new(),
                methods: IndexMap::new(),
            })
            .unwrap();
        table
            .register_class(ClassDef {
                name: "Y".into(),
                base: Some("X".into()),
                fields: IndexMap::new(),
                methods: IndexMap::new(),
            })
            .unwrap();
        assert!(matches!(
            table.validate(),
            Err(SemError::InheritanceCycle(_))
        ));
    }

    #[test]
    fn recursive_struct_is_rejected() {
        let mut table = TypeTable::new();
        table
            .register_struct(StructDef {
                name: "S".into(),
                fields: IndexMap::from([
                    ("next".to_string(), Type::Ptr(Box::new(Type::Struct("S".into())))),
                    ("inner".to_string(), Type::Struct("S".into())),
                ]),
            })
            .unwrap();
        assert!(matches!(
            table.validate(),
            Err(SemError::RecursiveStruct(_))
        ));
    }

    #[test]
    fn sizeof_resolves_from_layout() {
        let mut table = TypeTable::new();
        table
            .register_struct(StructDef {
                name: "P".into(),
                fields: IndexMap::from([
                    ("x".to_string(), Type::Int),
                    ("c".to_string(), Type::Char),
                ]),
            })
            .unwrap();
        assert_eq!(table.sizeof(&Type::Struct("P".into())), 5);
        assert_eq!(table.sizeof(&Type::Array(3, Box::new(Type::Int))), 12);
        assert_eq!(table.cells(&Type::Struct("P".into())), 2);
    }
}

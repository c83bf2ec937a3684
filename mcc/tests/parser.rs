use mcc::syntax;

fn assert_parses(code: &str) {
    if let Err(e) = syntax::parse(code) {
        panic!("parse failed: {e}\nin:\n{code}");
    }
}

macro_rules! case {
    ($name:ident, $code:expr) => {
        #[test]
        fn $name() {
            assert_parses($code);
        }
    };
}

case!(struct_decl, "struct Point { int x; int y; };");
case!(struct_with_pointer_field, "struct Node { int data; struct Node* next; };");
case!(class_decl, "class A { int a; void foo() { return; } }");
case!(class_extends, "class B extends A { int b; }");
case!(global_var, "int counter;");
case!(global_array, "int table[10];");
case!(fun_proto, "void log_i(int value);");
case!(fun_def, "int add(int a, int b) { return a + b; }");
case!(array_param, "void fill(int arr[10][10]) { arr[0][0] = 1; }");
case!(pointer_decls, "void main() { int x; int* p; p = &x; *p = 3; }");
case!(double_pointer, "void main() { int** pp; }");
case!(multi_dim_array, "void main() { int m[2][3]; m[1][2] = 5; }");
case!(cast_string, "void main() { print_s((char*)\"hi\\n\"); }");
case!(cast_class, "int main() { class A a; a = (class A) new class B(); return 0; }");
case!(new_instance, "int main() { class A a; a = new class A(); return 0; }");
case!(sizeof_type, "void main() { int s; s = sizeof(struct Point); }");
case!(method_call, "void main() { class A a; a.foo(); }");
case!(field_chain, "void main() { x.y.z = 1; }");
case!(deref_field, "void main() { (*n).data = 42; }");
case!(if_else, "void main() { if (x < 3) { x = 1; } else { x = 2; } }");
case!(while_break_continue, "void main() { while (1) { if (x) { break; } continue; } }");
case!(logical_ops, "void main() { x = a && b || c; }");
case!(comparison_chain, "void main() { x = 1 < 2 == 0; }");
case!(negative_literal, "void main() { print_i(-1); }");
case!(char_literal_arg, "void main() { print_c('\\n'); }");
case!(nested_calls, "void main() { x = f(g(1), h(2, 3)); }");
case!(grouped_expr, "void main() { x = (1 + 2) * (3 - 4); }");
case!(modulo, "void main() { x = 17 % 3; }");
case!(recursion, "void hanoi(int n) { if (n == 1) { return; } hanoi(n - 1); }");
case!(comments_anywhere, "// header\nvoid main() { /* inline */ x = 1; }");
case!(decls_after_stmts, "void main() { int a; a = 1; int b; b = a; }");

#[test]
fn missing_semicolon_is_an_error() {
    assert!(syntax::parse("void main() { x = 1 }").is_err());
}

#[test]
fn unbalanced_braces_are_an_error() {
    assert!(syntax::parse("void main() { ").is_err());
}

#[test]
fn stray_token_is_an_error() {
    assert!(syntax::parse("void main() { x = ; }").is_err());
}

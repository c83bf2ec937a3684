use std::collections::VecDeque;

use mcvm::{Fault, Machine, Syscall};

/// Buffer-backed runtime library: scripts input, captures output.
#[derive(Debug, Default)]
struct Recorder {
    out: String,
    ints: VecDeque<i64>,
    chars: VecDeque<char>,
}

impl Syscall for Recorder {
    fn print_i(&mut self, value: i64) {
        self.out.push_str(&value.to_string());
    }
    fn print_c(&mut self, value: char) {
        self.out.push(value);
    }
    fn print_s(&mut self, text: &str) {
        self.out.push_str(text);
    }
    fn read_i(&mut self) -> i64 {
        self.ints.pop_front().unwrap_or(0)
    }
    fn read_c(&mut self) -> char {
        self.chars.pop_front().unwrap_or('\0')
    }
}

fn run(code: &str) -> String {
    run_with(code, Recorder::default())
}

fn run_with(code: &str, recorder: Recorder) -> String {
    let program = mcc::analyze(code).expect("program should check");
    let mut machine = Machine::new(&program, recorder);
    machine.run().expect("program should complete");
    machine.into_syscall().out
}

fn run_fault(code: &str) -> Fault {
    let program = mcc::analyze(code).expect("program should check");
    let mut machine = Machine::new(&program, Recorder::default());
    machine.run().expect_err("program should fault")
}

// ----------------------------------------------------------------------------
// Arithmetic and control flow
// ----------------------------------------------------------------------------

#[test]
fn arithmetic_operators() {
    let out = run(
        "void main() {
             print_i(5 + 3); print_c(' ');
             print_i(10 - 2); print_c(' ');
             print_i(4 * 2); print_c(' ');
             print_i(16 / 2); print_c(' ');
             print_i(17 % 3);
         }",
    );
    assert_eq!(out, "8 8 8 8 2");
}

#[test]
fn comparisons_yield_zero_or_one() {
    let out = run(
        "void main() {
             print_i(5 > 3);
             print_i(5 < 3);
             print_i(5 == 5);
             print_i(5 != 5);
             print_i('a' < 'b');
         }",
    );
    assert_eq!(out, "10101");
}

#[test]
fn while_with_break_and_continue() {
    let out = run(
        "void main() {
             int i;
             i = 0;
             while (1) {
                 i = i + 1;
                 if (i == 3) { continue; }
                 if (i > 5) { break; }
                 print_i(i);
             }
         }",
    );
    assert_eq!(out, "1245");
}

#[test]
fn recursion_towers_style() {
    let out = run(
        "int fact(int n) {
             if (n <= 1) { return 1; }
             return n * fact(n - 1);
         }
         void main() { print_i(fact(5)); }",
    );
    assert_eq!(out, "120");
}

#[test]
fn short_circuit_skips_the_right_operand() {
    let out = run(
        "int noisy() { print_s(\"side\"); return 1; }
         void main() {
             int a;
             a = 0 && noisy();
             print_i(a);
             a = 1 || noisy();
             print_i(a);
             a = 1 && noisy();
             print_i(a);
         }",
    );
    // noisy() runs exactly once, for the last expression
    assert_eq!(out, "01side1");
}

// ----------------------------------------------------------------------------
// Scoping
// ----------------------------------------------------------------------------

#[test]
fn inner_shadow_leaves_outer_binding_untouched() {
    let out = run(
        "int x;
         void main() {
             x = 1;
             {
                 int x;
                 x = 99;
                 print_i(x);
             }
             print_i(x);
         }",
    );
    assert_eq!(out, "991");
}

#[test]
fn local_shadows_parameter() {
    let out = run(
        "void f(int x) {
             print_i(x);
             int x;
             x = 7;
             print_i(x);
         }
         void main() { f(3); }",
    );
    assert_eq!(out, "37");
}

#[test]
fn globals_are_shared_across_calls() {
    let out = run(
        "int counter;
         void bump() { counter = counter + 1; }
         void main() {
             bump(); bump(); bump();
             print_i(counter);
         }",
    );
    assert_eq!(out, "3");
}

// ----------------------------------------------------------------------------
// Arrays
// ----------------------------------------------------------------------------

#[test]
fn arrays_are_passed_by_reference() {
    let out = run(
        "void bump(int a[3]) { a[0] = a[0] + 1; }
         void main() {
             int a[3];
             a[0] = 1;
             bump(a);
             print_i(a[0]);
         }",
    );
    assert_eq!(out, "2");
}

#[test]
fn multi_dimensional_arrays_are_row_major() {
    let out = run(
        "void show(int m[2][3]) {
             int i;
             int j;
             i = 0;
             while (i < 2) {
                 j = 0;
                 while (j < 3) {
                     print_i(m[i][j]);
                     j = j + 1;
                 }
                 i = i + 1;
             }
         }
         void main() {
             int m[2][3];
             int i;
             int j;
             i = 0;
             while (i < 2) {
                 j = 0;
                 while (j < 3) {
                     m[i][j] = 10 * i + j;
                     j = j + 1;
                 }
                 i = i + 1;
             }
             show(m);
         }",
    );
    assert_eq!(out, "012101112");
}

#[test]
fn global_arrays_persist() {
    let out = run(
        "int table[4];
         void fill() {
             int i;
             i = 0;
             while (i < 4) { table[i] = i * i; i = i + 1; }
         }
         void main() { fill(); print_i(table[3]); }",
    );
    assert_eq!(out, "9");
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

#[test]
fn structs_are_passed_by_value() {
    let out = run(
        "struct Point { int x; int y; };
         void mutate(struct Point p) { p.x = 99; }
         void main() {
             struct Point p;
             p.x = 5;
             mutate(p);
             print_i(p.x);
         }",
    );
    assert_eq!(out, "5");
}

#[test]
fn struct_return_produces_an_independent_copy() {
    let out = run(
        "struct Point { int x; int y; };
         struct Point make() {
             struct Point p;
             p.x = 1;
             p.y = 2;
             return p;
         }
         void main() {
             struct Point a;
             struct Point b;
             a = make();
             b = a;
             a.x = 9;
             print_i(b.x);
             print_i(a.x);
         }",
    );
    assert_eq!(out, "19");
}

#[test]
fn struct_with_array_field() {
    let out = run(
        "struct Buf { int len; int data[3]; };
         void main() {
             struct Buf b;
             b.len = 2;
             b.data[0] = 5;
             b.data[1] = 6;
             print_i(b.data[0] + b.data[1] + b.len);
         }",
    );
    assert_eq!(out, "13");
}

// ----------------------------------------------------------------------------
// Pointers and the heap
// ----------------------------------------------------------------------------

#[test]
fn pointer_aliases_local_storage() {
    let out = run(
        "void main() {
             int x;
             int* p;
             x = 3;
             p = &x;
             *p = 7;
             print_i(x);
             print_i(*p);
         }",
    );
    assert_eq!(out, "77");
}

#[test]
fn pointer_into_array_element() {
    let out = run(
        "void main() {
             int a[3];
             int* p;
             a[1] = 10;
             p = &a[1];
             *p = *p + 5;
             print_i(a[1]);
         }",
    );
    assert_eq!(out, "15");
}

#[test]
fn heap_allocated_struct_through_pointer() {
    let out = run(
        "struct Node { int data; struct Node* next; };
         void main() {
             struct Node* a;
             struct Node* b;
             a = (struct Node*) mcmalloc(sizeof(struct Node));
             b = (struct Node*) mcmalloc(sizeof(struct Node));
             (*a).data = 1;
             (*a).next = b;
             (*b).data = 2;
             print_i((*a).data + (*(*a).next).data);
         }",
    );
    assert_eq!(out, "3");
}

// ----------------------------------------------------------------------------
// Runtime library
// ----------------------------------------------------------------------------

#[test]
fn print_s_walks_to_the_terminator() {
    let out = run("void main() { print_s(\"Hello, World!\\n\"); }");
    assert_eq!(out, "Hello, World!\n");
}

#[test]
fn read_i_is_scripted() {
    let recorder = Recorder {
        ints: VecDeque::from([5, 37]),
        ..Recorder::default()
    };
    let out = run_with(
        "void main() {
             int a;
             int b;
             a = read_i();
             b = read_i();
             print_i(a + b);
         }",
        recorder,
    );
    assert_eq!(out, "42");
}

#[test]
fn read_c_is_scripted() {
    let recorder = Recorder {
        chars: VecDeque::from(['x']),
        ..Recorder::default()
    };
    let out = run_with("void main() { print_c(read_c()); }", recorder);
    assert_eq!(out, "x");
}

#[test]
fn sizeof_reports_layout_bytes() {
    let out = run(
        "struct P { int x; char c; };
         void main() {
             print_i(sizeof(int));
             print_c(' ');
             print_i(sizeof(char));
             print_c(' ');
             print_i(sizeof(int*));
             print_c(' ');
             print_i(sizeof(struct P));
             print_c(' ');
             print_i(sizeof(char) * 10);
         }",
    );
    assert_eq!(out, "4 1 4 5 10");
}

// ----------------------------------------------------------------------------
// Faults
// ----------------------------------------------------------------------------

#[test]
fn division_by_zero_faults() {
    let fault = run_fault("void main() { int z; z = 0; print_i(1 / z); }");
    assert_eq!(fault, Fault::DivisionByZero);
}

#[test]
fn modulo_by_zero_faults() {
    let fault = run_fault("void main() { int z; z = 0; print_i(1 % z); }");
    assert_eq!(fault, Fault::DivisionByZero);
}

#[test]
fn index_out_of_declared_bounds_faults() {
    let fault = run_fault("void main() { int a[3]; a[5] = 1; }");
    assert_eq!(fault, Fault::OutOfBounds { index: 5, len: 3 });
}

#[test]
fn negative_index_faults() {
    let fault = run_fault("void main() { int a[3]; a[-1] = 1; }");
    assert!(matches!(fault, Fault::OutOfBounds { index: -1, .. }));
}

#[test]
fn uninitialised_pointer_dereference_faults() {
    let fault = run_fault("void main() { int* p; *p = 1; }");
    assert_eq!(fault, Fault::NullPointer);
}

#[test]
fn fault_stops_execution_at_the_faulting_point() {
    let program = mcc::analyze(
        "void main() {
             print_i(1);
             int z;
             z = 0;
             print_i(2 / z);
             print_i(3);
         }",
    )
    .expect("program should check");
    let mut machine = Machine::new(&program, Recorder::default());
    assert_eq!(machine.run(), Err(Fault::DivisionByZero));
    assert_eq!(machine.into_syscall().out, "1");
}

#[test]
fn missing_entry_function_faults() {
    let fault = run_fault("void helper() { }");
    assert_eq!(fault, Fault::NoEntry(String::from("main")));
}

use std::collections::VecDeque;

use mcvm::{Fault, Machine, Syscall};

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
    let program = mcc::analyze(code).expect("program should check");
    let mut machine = Machine::new(&program, Recorder::default());
    machine.run().expect("program should complete");
    machine.into_syscall().out
}

fn run_fault(code: &str) -> Fault {
    let program = mcc::analyze(code).expect("program should check");
    let mut machine = Machine::new(&program, Recorder::default());
    machine.run().expect_err("program should fault")
}

// ----------------------------------------------------------------------------
// Virtual dispatch
// ----------------------------------------------------------------------------

#[test]
fn overridden_method_dispatches_on_runtime_class() {
    let out = run(
        "class Course {
             void whereToAttend() {
                 print_s((char*)\"In person or online\\n\");
             }
         }
         class VirtualCourse extends Course {
             void whereToAttend() {
                 print_s((char*)\"Online only\\n\");
             }
         }
         int main() {
             class Course c1;
             class Course c2;
             c1 = new class Course();
             c2 = (class Course) new class VirtualCourse();
             c1.whereToAttend();
             c2.whereToAttend();
             return 0;
         }",
    );
    assert_eq!(out, "In person or online\nOnline only\n");
}

#[test]
fn three_level_override_picks_the_most_derived_body() {
    let out = run(
        "class A {
             void hello() { print_s((char*)\"Hello from A\\n\"); }
         }
         class B extends A {
             void hello() { print_s((char*)\"Hello from B\\n\"); }
         }
         class C extends B {
             void hello() { print_s((char*)\"Hello from C\\n\"); }
         }
         int main() {
             class A x;
             x = (class A) new class C();
             x.hello();
             return 0;
         }",
    );
    assert_eq!(out, "Hello from C\n");
}

#[test]
fn middle_class_inherits_the_base_body() {
    let out = run(
        "class A {
             void hello() { print_s(\"from A\\n\"); }
         }
         class B extends A { }
         int main() {
             class A x;
             x = new class B();
             x.hello();
             return 0;
         }",
    );
    assert_eq!(out, "from A\n");
}

#[test]
fn derived_methods_stay_virtual_through_further_upcasts() {
    let out = run(
        "class A {
             int tag() { return 1; }
         }
         class B extends A {
             int tag() { return 2; }
         }
         int probe(class A x) { return x.tag(); }
         int main() {
             print_i(probe(new class A()));
             print_i(probe(new class B()));
             return 0;
         }",
    );
    assert_eq!(out, "12");
}

// ----------------------------------------------------------------------------
// Reference semantics
// ----------------------------------------------------------------------------

#[test]
fn instances_are_passed_by_reference() {
    let out = run(
        "class Box {
             int value;
             void set(int x) { value = x; }
             void show() { print_i(value); }
         }
         void modify(class Box b) { b.set(99); }
         int main() {
             class Box myBox;
             myBox = new class Box();
             myBox.set(5);
             modify(myBox);
             myBox.show();
             return 0;
         }",
    );
    assert_eq!(out, "99");
}

#[test]
fn assignment_copies_the_handle_not_the_object() {
    let out = run(
        "class Box {
             int v;
             void set(int x) { v = x; }
             int get() { return v; }
         }
         int main() {
             class Box a;
             class Box b;
             a = new class Box();
             b = a;
             a.set(7);
             print_i(b.get());
             return 0;
         }",
    );
    assert_eq!(out, "7");
}

#[test]
fn separate_instances_do_not_alias() {
    let out = run(
        "class Box {
             int v;
             void set(int x) { v = x; }
             int get() { return v; }
         }
         int main() {
             class Box a;
             class Box b;
             a = new class Box();
             b = new class Box();
             a.set(1);
             b.set(2);
             print_i(a.get());
             print_i(b.get());
             return 0;
         }",
    );
    assert_eq!(out, "12");
}

// ----------------------------------------------------------------------------
// Fields and inheritance
// ----------------------------------------------------------------------------

#[test]
fn inherited_fields_are_part_of_the_instance() {
    let out = run(
        "class A {
             int a;
             void setA(int x) { a = x; }
         }
         class B extends A {
             int b;
             void sum() { print_i(a + b); }
         }
         int main() {
             class B obj;
             obj = new class B();
             obj.setA(40);
             obj.b = 2;
             obj.sum();
             return 0;
         }",
    );
    assert_eq!(out, "42");
}

#[test]
fn field_access_through_the_instance() {
    let out = run(
        "class P {
             int x;
             int y;
         }
         int main() {
             class P p;
             p = new class P();
             p.x = 3;
             p.y = 4;
             print_i(p.x * p.x + p.y * p.y);
             return 0;
         }",
    );
    assert_eq!(out, "25");
}

#[test]
fn methods_can_call_sibling_methods_unqualified() {
    let out = run(
        "class Counter {
             int value;
             void set(int x) { value = x; }
             void bump() { set(value + 1); }
             void show() { print_i(value); }
         }
         int main() {
             class Counter c;
             c = new class Counter();
             c.set(5);
             c.bump();
             c.show();
             return 0;
         }",
    );
    assert_eq!(out, "6");
}

#[test]
fn locals_shadow_fields_inside_methods() {
    let out = run(
        "class A {
             int v;
             void demo() {
                 v = 1;
                 int v;
                 v = 99;
                 print_i(v);
             }
             void show() { print_i(v); }
         }
         int main() {
             class A a;
             a = new class A();
             a.demo();
             a.show();
             return 0;
         }",
    );
    assert_eq!(out, "991");
}

// ----------------------------------------------------------------------------
// Casts
// ----------------------------------------------------------------------------

#[test]
fn downcast_recovers_the_derived_interface() {
    let out = run(
        "class A { }
         class B extends A {
             void onlyB() { print_s(\"only B\\n\"); }
         }
         int main() {
             class A x;
             class B y;
             x = new class B();
             y = (class B) x;
             y.onlyB();
             return 0;
         }",
    );
    assert_eq!(out, "only B\n");
}

#[test]
fn downcast_of_a_base_instance_faults() {
    let fault = run_fault(
        "class A { }
         class B extends A {
             void onlyB() { }
         }
         int main() {
             class A x;
             class B y;
             x = new class A();
             y = (class B) x;
             return 0;
         }",
    );
    assert_eq!(
        fault,
        Fault::BadDowncast {
            from: String::from("A"),
            to: String::from("B"),
        }
    );
}

// ----------------------------------------------------------------------------
// Null handles
// ----------------------------------------------------------------------------

#[test]
fn dispatch_through_an_unassigned_instance_faults() {
    let fault = run_fault(
        "class A {
             void hello() { }
         }
         int main() {
             class A a;
             a.hello();
             return 0;
         }",
    );
    assert_eq!(fault, Fault::NullObject);
}

#[test]
fn field_access_through_an_unassigned_instance_faults() {
    let fault = run_fault(
        "class A {
             int x;
         }
         int main() {
             class A a;
             a.x = 1;
             return 0;
         }",
    );
    assert_eq!(fault, Fault::NullObject);
}

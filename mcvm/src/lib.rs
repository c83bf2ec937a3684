pub mod fault;
pub mod machine;
pub mod store;
pub mod syscall;
pub mod value;

pub use fault::Fault;
pub use machine::Machine;
pub use syscall::{Stdio, Syscall};
pub use value::{Addr, Value};

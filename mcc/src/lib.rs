pub mod error;
pub mod sema;
pub mod syntax;

pub use error::{Error, SemError};
pub use sema::builtins::Builtin;
pub use sema::program::Program;
pub use sema::types::Type;

/// Parse and check one translation unit, producing the annotated program
/// the execution engine runs.
pub fn analyze(code: &str) -> Result<Program, Error> {
    let ast = syntax::parse(code)?;
    sema::check::check(&ast)
}

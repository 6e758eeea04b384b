//! `std::io`
//!
//! Runtime functions only. Constant evaluation refuses to call them.

use ks_module::{ContextError, Module, NativeError};
use ks_value::Value;

/// Builds the `std::io` module
///
/// # Errors
///
/// Never fails for a fresh module; the signature matches registration.
pub fn module() -> Result<Module, ContextError> {
    let mut module = Module::with_crate_item("std", ["io"]);
    module.function("println", 1, println)?;
    module.function("print", 1, print)?;
    module.function("dbg", 1, dbg)?;
    Ok(module)
}

#[allow(clippy::print_stdout, reason = "`std::io::println` writes to the host's stdout")]
fn println(args: &[Value]) -> Result<Value, NativeError> {
    println!("{}", args[0]);
    Ok(Value::Unit)
}

#[allow(clippy::print_stdout, reason = "`std::io::print` writes to the host's stdout")]
fn print(args: &[Value]) -> Result<Value, NativeError> {
    print!("{}", args[0]);
    Ok(Value::Unit)
}

#[allow(clippy::print_stderr, reason = "`std::io::dbg` writes to the host's stderr")]
fn dbg(args: &[Value]) -> Result<Value, NativeError> {
    eprintln!("{}", args[0].repr());
    Ok(args[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dbg_returns_its_argument() {
        let module = module().unwrap();
        assert_eq!(module.len(), 3);

        let mut context = ks_module::Context::new();
        context.install(module).unwrap();
        let (arity, dbg) = context.function("std::io::dbg").unwrap();
        assert_eq!(arity, 1);
        assert_eq!(dbg(&[Value::from("hi")]).unwrap(), Value::from("hi"));
        assert!(matches!(
            dbg(&[]),
            Err(NativeError::ArityMismatch { expected: 1, got: 0 })
        ));
    }
}

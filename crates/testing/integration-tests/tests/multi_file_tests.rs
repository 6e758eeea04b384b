//! Multi-file integration tests
//!
//! Every project is written to a temporary directory and compiled from its
//! `main.ks` through the driver.

use expect_test::expect;
use integration_tests::multi_file::{self, ENTRY};
use ks_driver::{Driver, Options};

/// Greetings built by a `const fn` over a vec imported from another file
#[test]
fn greetings() {
    multi_file::greetings().run().assert_pass();
}

/// `fib(15)` through a `mod.ks` module hierarchy
#[test]
fn fibonacci() {
    multi_file::fibonacci().run().assert_pass();
}

/// `stringy_math!(add 10 sub 5)` evaluates to 5
#[test]
fn stringy_math() {
    multi_file::stringy_math().run().assert_pass();
}

/// Item macros in a module file define importable constants
#[test]
fn macro_generated_items() {
    multi_file::macro_generated_items().run().assert_pass();
}

/// Reading a private constant of another module fails
#[test]
fn private_item() {
    multi_file::private_item().run().assert_pass();
}

/// Native functions never run during constant evaluation
#[test]
fn native_call() {
    multi_file::native_call().run().assert_pass();
}

/// `Kestrel.toml` next to the entry file sets the step budget
#[test]
fn configured_budget() {
    multi_file::configured_budget().run().assert_pass();
}

/// Ten module files with five functions each
#[test]
fn large_codebase() {
    multi_file::large_codebase().run().assert_pass();
}

/// The expanded crate shows module files inline and macro output in place
#[test]
fn expanded_source_inlines_module_files() {
    let dir = tempfile::tempdir().unwrap();
    multi_file::macro_generated_items()
        .write_to(dir.path())
        .unwrap();

    let driver = Driver::new(Options::default()).unwrap();
    let index = driver.index_file(dir.path().join(ENTRY)).unwrap();
    expect![[r#"
        mod gen {
            use std::macros::make_const;
            pub const GENERATED = 6 * 7;
        }
        use gen::GENERATED;
        pub const ANSWER = GENERATED;
    "#]]
    .assert_eq(&driver.expanded_source(&index));
}

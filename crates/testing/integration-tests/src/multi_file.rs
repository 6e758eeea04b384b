//! Multi-file test infrastructure for integration testing.
//!
//! This module provides a framework for creating and testing multi-file projects,
//! including module systems, use declarations, macros and large codebases.

use ks_driver::{Driver, Options};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Entry file every project is compiled from
pub const ENTRY: &str = "main.ks";

/// Result of running a multi-file test
#[derive(Debug)]
pub enum TestResult {
    /// Test passed successfully
    Pass,
    /// Test failed with a reason
    Fail {
        /// What went wrong
        reason: String,
    },
}

impl TestResult {
    /// Panics with the failure reason
    ///
    /// # Panics
    ///
    /// Panics if the test failed
    #[allow(clippy::panic, reason = "test helper, a failed run fails the calling test")]
    pub fn assert_pass(self) {
        if let Self::Fail { reason } = self {
            panic!("{reason}");
        }
    }
}

/// Expected result from a multi-file test
#[derive(Debug, Clone)]
pub enum ExpectedResult {
    /// Compilation succeeds and these constants have these rendered values
    Constants {
        /// Fully qualified path and `Value::repr` of each checked constant
        values: Vec<(String, String)>,
    },
    /// Compilation fails with diagnostics containing every pattern
    CompileError {
        /// Substrings of the rendered diagnostics
        patterns: Vec<String>,
    },
}

/// A multi-file test project
///
/// This structure represents a complete test project with multiple source files,
/// expected results, and the ability to run the test and verify the outcome.
#[derive(Debug)]
pub struct MultiFileProject {
    /// Name of the test project
    pub name: String,
    /// Map of file paths to their contents
    pub files: BTreeMap<PathBuf, String>,
    /// Expected result from running the test
    pub expected: ExpectedResult,
}

impl MultiFileProject {
    /// Creates a new multi-file test project with the given name
    ///
    /// # Examples
    ///
    /// ```
    /// # use integration_tests::multi_file::MultiFileProject;
    /// let project = MultiFileProject::new("my-test-project");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
            expected: ExpectedResult::Constants { values: Vec::new() },
        }
    }

    /// Adds a file to the test project
    ///
    /// # Examples
    ///
    /// ```
    /// # use integration_tests::multi_file::MultiFileProject;
    /// let mut project = MultiFileProject::new("test");
    /// project.add_file("main.ks", "const A = 1;");
    /// ```
    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Expects a successful compilation where `path` evaluates to `repr`
    pub fn expect_constant(&mut self, path: impl Into<String>, repr: impl Into<String>) {
        let entry = (path.into(), repr.into());
        if let ExpectedResult::Constants { values } = &mut self.expected {
            values.push(entry);
        } else {
            self.expected = ExpectedResult::Constants {
                values: vec![entry],
            };
        }
    }

    /// Sets the expected compilation errors for the test
    ///
    /// # Examples
    ///
    /// ```
    /// # use integration_tests::multi_file::MultiFileProject;
    /// let mut project = MultiFileProject::new("test");
    /// project.expect_errors(vec!["cannot find".to_string()]);
    /// ```
    pub fn expect_errors(&mut self, patterns: Vec<String>) {
        self.expected = ExpectedResult::CompileError { patterns };
    }

    /// Writes every file below `root`
    ///
    /// # Errors
    ///
    /// Returns a description of the first file that could not be written
    pub fn write_to(&self, root: &Path) -> Result<(), String> {
        for (path, content) in &self.files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    format!("Failed to create directory {}: {e}", parent.display())
                })?;
            }
            fs::write(&full_path, content)
                .map_err(|e| format!("Failed to write file {}: {e}", full_path.display()))?;
        }
        Ok(())
    }

    /// Runs the multi-file test project
    ///
    /// This function:
    /// 1. Creates a temporary directory for the project
    /// 2. Writes all files to the directory
    /// 3. Compiles `main.ks` with options from a `Kestrel.toml` if present
    /// 4. Compares constants or diagnostics with the expectation
    #[must_use]
    pub fn run(&self) -> TestResult {
        match self.try_run() {
            Ok(()) => TestResult::Pass,
            Err(reason) => TestResult::Fail {
                reason: format!("{}: {reason}", self.name),
            },
        }
    }

    fn try_run(&self) -> Result<(), String> {
        let temp_dir =
            TempDir::new().map_err(|e| format!("Failed to create temporary directory: {e}"))?;
        let project_root = temp_dir.path().join(&self.name);
        self.write_to(&project_root)?;

        let entry = project_root.join(ENTRY);
        let options = Options::discover(&entry).map_err(|e| format!("{e:#}"))?;
        let driver = Driver::new(options).map_err(|e| format!("{e:#}"))?;

        match (&self.expected, driver.compile_file(&entry)) {
            (ExpectedResult::Constants { values }, Ok(unit)) => {
                for (path, expected) in values {
                    let actual = unit
                        .constants
                        .get(path)
                        .map(|value| value.repr())
                        .ok_or_else(|| format!("constant `{path}` was not evaluated"))?;
                    if &actual != expected {
                        return Err(format!("`{path}` is {actual}, expected {expected}"));
                    }
                }
                Ok(())
            }
            (ExpectedResult::Constants { .. }, Err(errors)) => Err(format!(
                "compilation failed:\n{}",
                driver.render_diagnostics(&errors)
            )),
            (ExpectedResult::CompileError { patterns }, Err(errors)) => {
                let rendered = driver.render_diagnostics(&errors);
                match patterns.iter().find(|pattern| !rendered.contains(pattern.as_str())) {
                    Some(missing) => Err(format!("`{missing}` not in diagnostics:\n{rendered}")),
                    None => Ok(()),
                }
            }
            (ExpectedResult::CompileError { .. }, Ok(unit)) => {
                let mut constants = String::new();
                for (path, value) in &unit.constants {
                    constants.push_str(&format!("{path} = {}\n", value.repr()));
                }
                Err(format!("compilation unexpectedly succeeded:\n{constants}"))
            }
        }
    }
}

/// Creates a new multi-file test project with the given name
///
/// This is a convenience function that wraps `MultiFileProject::new()`.
#[must_use]
pub fn create_project(name: &str) -> MultiFileProject {
    MultiFileProject::new(name)
}

/// Greetings built by a `const fn` and a template string
#[must_use]
pub fn greetings() -> MultiFileProject {
    let mut project = create_project("greetings");

    project.add_file(
        "main.ks",
        r#"mod names;
use names::ALL;

const fn greeting(name) {
    `Hello {name}`
}

pub const GREETINGS = {
    let out = [];
    let i = 0;
    while i < 4 {
        out = out + [greeting(ALL[i])];
        i += 1;
    }
    out
};
"#,
    );

    project.add_file(
        "names.ks",
        r#"pub const ALL = ["Stranger", "Jane", "John", "Mio"];
"#,
    );

    project.expect_constant(
        "GREETINGS",
        r#"["Hello Stranger", "Hello Jane", "Hello John", "Hello Mio"]"#,
    );
    project
}

/// Recursive `const fn` defined in a nested module file
#[must_use]
pub fn fibonacci() -> MultiFileProject {
    let mut project = create_project("fibonacci");

    project.add_file(
        "main.ks",
        r"mod math;

pub const FIB_15 = math::seq::fib(15);
",
    );

    project.add_file("math/mod.ks", "pub mod seq;\n");

    project.add_file(
        "math/seq.ks",
        r"pub const fn fib(n) {
    if n <= 1 {
        n
    } else {
        fib(n - 1) + fib(n - 2)
    }
}
",
    );

    project.expect_constant("FIB_15", "610");
    project
}

/// `stringy_math!` expanded inside a constant initializer
#[must_use]
pub fn stringy_math() -> MultiFileProject {
    let mut project = create_project("stringy-math");

    project.add_file(
        "main.ks",
        r"use std::experiments::stringy_math;

pub const VALUE = stringy_math!(add 10 sub 5);
pub const CHAINED = stringy_math!(add 10 sub 5 mul 4 div 2);
",
    );

    project.expect_constant("VALUE", "5");
    project.expect_constant("CHAINED", "10");
    project
}

/// Items generated by a macro in one file and imported by another
#[must_use]
pub fn macro_generated_items() -> MultiFileProject {
    let mut project = create_project("macro-generated-items");

    project.add_file(
        "main.ks",
        r"mod gen;
use gen::GENERATED;

pub const ANSWER = GENERATED;
",
    );

    project.add_file(
        "gen.ks",
        r"use std::macros::make_const;

make_const!(GENERATED, 6 * 7);
",
    );

    project.expect_constant("ANSWER", "42");
    project.expect_constant("gen::GENERATED", "42");
    project
}

/// A private constant read from outside its module
#[must_use]
pub fn private_item() -> MultiFileProject {
    let mut project = create_project("private-item");

    project.add_file("main.ks", "mod secret;\n\nconst LEAK = secret::HIDDEN;\n");
    project.add_file("secret.ks", "const HIDDEN = 1;\n");

    project.expect_errors(vec!["is private".to_string(), "main.ks".to_string()]);
    project
}

/// A constant that calls a native function
#[must_use]
pub fn native_call() -> MultiFileProject {
    let mut project = create_project("native-call");

    project.add_file(
        "main.ks",
        "use std::io::println;\n\nconst SIDE_EFFECT = println(\"hi\");\n",
    );

    project.expect_errors(vec![
        "cannot call native function `std::io::println`".to_string(),
    ]);
    project
}

/// `Kestrel.toml` lowering the evaluation budget
#[must_use]
pub fn configured_budget() -> MultiFileProject {
    let mut project = create_project("configured-budget");

    project.add_file("Kestrel.toml", "[const_eval]\nmax_steps = 100\n");
    project.add_file("main.ks", "const SPIN = loop {};\n");

    project.expect_errors(vec!["exceeded 100 steps".to_string()]);
    project
}

/// Generated project with ten module files of five `const fn`s each
#[must_use]
pub fn large_codebase() -> MultiFileProject {
    let mut project = create_project("large-codebase");

    let mut main_content = String::new();
    for i in 0..10 {
        main_content.push_str(&format!("mod module_{i};\n"));
    }
    main_content.push_str("\nconst fn run() {\n    let sum = 0;\n");
    for i in 0..10 {
        for j in 0..5 {
            main_content.push_str(&format!("    sum = module_{i}::func_{j}(sum);\n"));
        }
    }
    main_content.push_str("    sum\n}\n\npub const TOTAL = run();\n");
    project.add_file(ENTRY, main_content);

    for mod_idx in 0..10 {
        let mut mod_content = String::new();
        for fn_idx in 0..5 {
            mod_content.push_str(&format!(
                "pub const fn func_{fn_idx}(x) {{\n    x + {}\n}}\n\n",
                mod_idx * 5 + fn_idx
            ));
        }
        project.add_file(format!("module_{mod_idx}.ks"), mod_content);
    }

    // 0 + 1 + ... + 49
    project.expect_constant("TOTAL", "1225");
    project
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file() {
        let mut project = create_project("test");
        project.add_file("main.ks", "const A = 1;");
        assert_eq!(project.files.len(), 1);
        assert_eq!(
            project.files.get(Path::new("main.ks")).unwrap(),
            "const A = 1;"
        );
    }

    #[test]
    fn test_expectations_replace_each_other() {
        let mut project = create_project("test");
        project.expect_errors(vec!["error".to_string()]);
        project.expect_constant("A", "1");
        project.expect_constant("B", "2");
        match project.expected {
            ExpectedResult::Constants { values } => assert_eq!(values.len(), 2),
            ExpectedResult::CompileError { .. } => panic!("Expected Constants result"),
        }
    }

    #[test]
    fn test_mismatch_is_reported() {
        let mut project = create_project("test");
        project.add_file("main.ks", "const A = 1;");
        project.expect_constant("A", "2");

        match project.run() {
            TestResult::Fail { reason } => assert_eq!(reason, "test: `A` is 1, expected 2"),
            TestResult::Pass => panic!("Expected a failure"),
        }
    }
}

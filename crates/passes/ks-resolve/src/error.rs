//! Error types for module resolution

use ks_span::FileSpan;
use std::mem;

/// Errors that occur while building the module tree or resolving paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// Path segment names nothing reachable from the use site
    #[error("cannot find `{name}` in this scope")]
    Undefined {
        /// The name that was not found
        name: String,
        /// Where the name was used
        use_site: FileSpan,
        /// Similar names (for "did you mean?" messages)
        suggestions: Vec<String>,
    },

    /// Name is defined multiple times in the same module
    #[error("`{name}` is defined multiple times")]
    DuplicateDefinition {
        /// The name that was redefined
        name: String,
        /// First definition location
        first: FileSpan,
        /// Second definition location
        second: FileSpan,
    },

    /// Attempt to use a private item from outside its module
    #[error("`{name}` is private")]
    PrivateItem {
        /// Full path of the private item
        name: String,
        /// Where the item was defined
        def_site: FileSpan,
        /// Where the item was accessed
        use_site: FileSpan,
    },

    /// A path continues through something that is not a module
    #[error("`{name}` is not a module")]
    NotAModule {
        /// The segment that should have been a module
        name: String,
        /// Where the path was written
        use_site: FileSpan,
    },

    /// Imports refer to each other without reaching an item
    #[error("import of `{name}` refers back to itself")]
    ImportCycle {
        /// Binding of the import that closed the cycle
        name: String,
        /// Where the import was written
        use_site: FileSpan,
    },

    /// `super` used in the crate root
    #[error("there are too many leading `super` keywords")]
    SuperOfRoot {
        /// Where the path was written
        use_site: FileSpan,
    },
}

impl ResolutionError {
    /// Returns the span where the error occurred
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Undefined { use_site, .. }
            | Self::PrivateItem { use_site, .. }
            | Self::NotAModule { use_site, .. }
            | Self::ImportCycle { use_site, .. }
            | Self::SuperOfRoot { use_site } => *use_site,
            Self::DuplicateDefinition { second, .. } => *second,
        }
    }

    /// Convert to codespan diagnostic for rustc-style output
    ///
    /// Secondary labels (definition sites) are only attached when they live
    /// in the same file as the primary span.
    pub fn to_codespan_diagnostic<F: Copy>(
        &self,
        file_id: F,
    ) -> codespan_reporting::diagnostic::Diagnostic<F> {
        use codespan_reporting::diagnostic::{Diagnostic, Label};

        let mut labels = vec![Label::primary(file_id, self.span().range())];
        let mut notes = Vec::new();
        match self {
            Self::Undefined { suggestions, .. } => {
                labels[0] = labels[0].clone().with_message("not found");
                if !suggestions.is_empty() {
                    notes.push(format!(
                        "help: a similar name exists: {}",
                        suggestions
                            .iter()
                            .map(|name| format!("`{name}`"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
            }
            Self::DuplicateDefinition { first, second, .. } => {
                labels[0] = labels[0].clone().with_message("redefined here");
                if first.file == second.file {
                    labels.push(
                        Label::secondary(file_id, first.range())
                            .with_message("first definition here"),
                    );
                }
            }
            Self::PrivateItem {
                def_site, use_site, ..
            } => {
                labels[0] = labels[0].clone().with_message("private item");
                if def_site.file == use_site.file {
                    labels.push(
                        Label::secondary(file_id, def_site.range()).with_message("defined here"),
                    );
                }
                notes.push("help: mark the item `pub` to use it from other modules".to_string());
            }
            Self::NotAModule { .. } => {
                labels[0] = labels[0].clone().with_message("expected a module");
            }
            Self::ImportCycle { .. } | Self::SuperOfRoot { .. } => {}
        }

        Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(labels)
            .with_notes(notes)
    }

    /// Compute suggestions for undefined names using Levenshtein distance
    pub fn compute_suggestions<'n>(
        name: &str,
        available_names: impl IntoIterator<Item = &'n str>,
    ) -> Vec<String> {
        let mut suggestions: Vec<(&str, usize)> = available_names
            .into_iter()
            .filter(|candidate| *candidate != name)
            .map(|candidate| (candidate, levenshtein_distance(name, candidate)))
            .filter(|(_, distance)| *distance <= 3)
            .collect();

        suggestions.sort_by_key(|(candidate, distance)| (*distance, *candidate));
        suggestions.dedup();
        suggestions
            .into_iter()
            .take(3)
            .map(|(candidate, _)| candidate.to_string())
            .collect()
    }
}

/// Compute Levenshtein distance between two strings
fn levenshtein_distance(source: &str, target: &str) -> usize {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();

    if source.is_empty() {
        return target.len();
    }
    if target.is_empty() {
        return source.len();
    }

    let mut previous: Vec<usize> = (0..=target.len()).collect();
    let mut current = vec![0; target.len() + 1];

    for (idx, source_char) in source.iter().enumerate() {
        current[0] = idx + 1;
        for (jdx, target_char) in target.iter().enumerate() {
            let cost = usize::from(source_char != target_char);
            current[jdx + 1] = (previous[jdx + 1] + 1)
                .min(current[jdx] + 1)
                .min(previous[jdx] + cost);
        }
        mem::swap(&mut previous, &mut current);
    }

    previous[target.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "def"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("saturday", "sunday"), 3);
    }

    #[test]
    fn suggestions_are_closest_first() {
        let suggestions =
            ResolutionError::compute_suggestions("fob", ["foo", "fib", "bar", "football", "fob"]);
        assert_eq!(suggestions, vec!["fib", "foo", "bar"]);
    }
}

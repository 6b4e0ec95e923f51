//! Predicate builders for [`crate::poll::poll`] and [`crate::poll::check`]
//!
//! A predicate returns `Ok(())` when the value matches, or the reason it did
//! not.

use std::fmt::Debug;

/// Outcome of evaluating a predicate
pub type Verdict = Result<(), String>;

/// Value equals `expected`
pub fn equals<T>(expected: T) -> impl Fn(&T) -> Verdict
where
    T: PartialEq + Debug,
{
    move |actual: &T| {
        if *actual == expected {
            Ok(())
        } else {
            Err(format!("expected {:?}, got {:?}", expected, actual))
        }
    }
}

/// String value contains `needle`
pub fn contains<S>(needle: impl Into<String>) -> impl Fn(&S) -> Verdict
where
    S: AsRef<str>,
{
    let needle = needle.into();
    move |actual: &S| {
        let actual = actual.as_ref();
        if actual.contains(&needle) {
            Ok(())
        } else {
            Err(format!("expected {:?} to contain {:?}", truncate(actual), needle))
        }
    }
}

/// Value satisfies an arbitrary condition
pub fn satisfies<T, F>(description: impl Into<String>, condition: F) -> impl Fn(&T) -> Verdict
where
    T: Debug,
    F: Fn(&T) -> bool,
{
    let description = description.into();
    move |actual: &T| {
        if condition(actual) {
            Ok(())
        } else {
            Err(format!("expected {:?} to {}", actual, description))
        }
    }
}

/// Inverts a predicate
pub fn not<T, P>(description: impl Into<String>, predicate: P) -> impl Fn(&T) -> Verdict
where
    T: Debug,
    P: Fn(&T) -> Verdict,
{
    let description = description.into();
    move |actual: &T| match predicate(actual) {
        Ok(()) => Err(format!("expected {:?} not to {}", actual, description)),
        Err(_) => Ok(()),
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 120;
    if s.chars().count() <= MAX {
        s.to_string()
    } else {
        let head: String = s.chars().take(MAX).collect();
        format!("{}…", head)
    }
}

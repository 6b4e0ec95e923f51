//! Registration of parsed suite files into a suite tree

use std::sync::Arc;

use suiterun_core::{StructureError, SuiteBuilder, SuiteTree};

use crate::error::{RunnerError, RunnerResult};
use crate::spec::{GroupSpec, SpecFile};
use crate::steps::StepExecutor;

/// Build one tree from every loaded file.
///
/// Shared groups from all files are defined first, so any suite may include
/// any of them. Each file's suite becomes a top-level group, in file order.
pub fn compile(files: &[SpecFile], executor: &Arc<StepExecutor>) -> RunnerResult<SuiteTree> {
    let mut builder = SuiteBuilder::new();

    for file in files {
        for (name, group) in file.suite.shared_groups() {
            let group = group.clone();
            let executor = Arc::clone(executor);
            builder
                .define_shared(name, move |b| register(b, &group, &executor))
                .map_err(|e| structure(file, e))?;
        }
    }

    for file in files {
        let suite = &file.suite;
        builder
            .group(suite.name.clone(), suite.mode, suite.tags.clone(), |b| {
                register(b, &suite.body, executor)
            })
            .map_err(|e| structure(file, e))?;
    }

    // Errors a body swallowed are still recorded by the builder.
    builder.build().map_err(|e| RunnerError::Structure {
        path: files
            .last()
            .map(|f| f.path.clone())
            .unwrap_or_default(),
        source: e,
    })
}

/// Register a group's hooks, includes, tests and nested suites, in that order
fn register(
    b: &mut SuiteBuilder,
    group: &GroupSpec,
    executor: &Arc<StepExecutor>,
) -> Result<(), StructureError> {
    for hook in &group.before_all {
        b.before_all(executor.hook(hook))?;
    }
    for hook in &group.before_each {
        b.before_each(executor.hook(hook))?;
    }
    for hook in &group.after_each {
        b.after_each(executor.hook(hook))?;
    }
    for hook in &group.after_all {
        b.after_all(executor.hook(hook))?;
    }

    for name in &group.include {
        b.include(name)?;
    }

    for test in &group.tests {
        b.test(
            test.name.clone(),
            test.mode,
            test.tags.clone(),
            executor.sequence(test.steps.clone()),
        )?;
    }

    for suite in &group.suites {
        b.group(suite.name.clone(), suite.mode, suite.tags.clone(), |b| {
            register(b, &suite.body, executor)
        })?;
    }
    Ok(())
}

fn structure(file: &SpecFile, source: StructureError) -> RunnerError {
    RunnerError::Structure {
        path: file.path.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SuiteSpec;
    use std::path::PathBuf;
    use suiterun_core::{HookKind, PollOptions};

    fn file(name: &str, yaml: &str) -> SpecFile {
        SpecFile {
            path: PathBuf::from(name),
            suite: SuiteSpec::from_yaml(yaml).unwrap(),
        }
    }

    fn executor() -> Arc<StepExecutor> {
        Arc::new(StepExecutor::new(PollOptions::default()))
    }

    #[test]
    fn test_compiles_nested_suites_in_order() {
        let files = vec![file(
            "cart.yaml",
            r#"
name: cart
before_each:
  - steps: [{ action: log, message: setup }]
tests:
  - name: adds item
  - name: removes item
suites:
  - name: coupons
    tests:
      - name: applies code
"#,
        )];

        let tree = compile(&files, &executor()).unwrap();
        assert_eq!(tree.test_count(), 3);
        assert_eq!(tree.test_full_title(2), "cart coupons applies code");
        assert_eq!(tree.suite(1).hooks.get(HookKind::BeforeEach).len(), 1);
    }

    #[test]
    fn test_shared_group_from_another_file() {
        let files = vec![
            file(
                "a.yaml",
                r#"
name: dashboard
include: [logged-in]
"#,
            ),
            file(
                "b.yaml",
                r#"
name: helpers
shared:
  logged-in:
    before_each:
      - steps: [{ action: log, message: login }]
    tests:
      - name: shows avatar
"#,
            ),
        ];

        let tree = compile(&files, &executor()).unwrap();
        assert_eq!(tree.test_full_title(0), "dashboard shows avatar");
        assert_eq!(tree.suite(1).hooks.get(HookKind::BeforeEach).len(), 1);
    }

    #[test]
    fn test_recursive_include_is_structure_error() {
        let files = vec![file(
            "loop.yaml",
            r#"
name: loop
shared:
  a:
    include: [b]
  b:
    suites:
      - name: inner
        include: [a]
include: [a]
"#,
        )];

        match compile(&files, &executor()) {
            Err(RunnerError::Structure { path, source }) => {
                assert_eq!(path, PathBuf::from("loop.yaml"));
                assert!(matches!(
                    source,
                    StructureError::RecursiveRegistration { .. }
                ));
            }
            other => panic!("expected structure error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_shared_across_files() {
        let shared = r#"
name: x
shared:
  setup: {}
"#;
        let files = vec![file("one.yaml", shared), file("two.yaml", shared)];

        match compile(&files, &executor()) {
            Err(RunnerError::Structure { path, source }) => {
                assert_eq!(path, PathBuf::from("two.yaml"));
                assert_eq!(source, StructureError::DuplicateShared("setup".to_string()));
            }
            other => panic!("expected structure error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_test_name_rejected() {
        let files = vec![file(
            "empty.yaml",
            r#"
name: suite
tests:
  - name: ""
"#,
        )];
        assert!(matches!(
            compile(&files, &executor()),
            Err(RunnerError::Structure {
                source: StructureError::EmptyName { kind: "test", .. },
                ..
            })
        ));
    }
}

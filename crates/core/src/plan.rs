//! Execution plan: which tests run, which are reported as skipped, and which
//! are left out entirely.
//!
//! When any node is marked `only`, the selection is the union of the subtrees
//! of the leaf-most `only` nodes (those with no `only` descendant). `skip` on a
//! test or any of its groups always wins. Grep and tag filters narrow the
//! selection further; tests they drop are not reported.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tree::{Child, FilterMode, SuiteId, SuiteTree, TestId, ROOT};

/// What the scheduler does with a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inclusion {
    Run,
    Skip,
    Excluded,
}

/// Title and tag filters applied on top of only/skip
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    /// Match against the full title
    pub grep: Option<Regex>,

    /// Keep tests carrying at least one of these tags (own or inherited)
    pub tags: Vec<String>,
}

impl TestFilter {
    fn matches(&self, tree: &SuiteTree, test: TestId) -> bool {
        if let Some(grep) = &self.grep {
            if !grep.is_match(&tree.test_full_title(test)) {
                return false;
            }
        }
        if !self.tags.is_empty() {
            let tags = tree.effective_tags(test);
            if !self.tags.iter().any(|t| tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

/// Resolved inclusion for every test and suite of a tree
#[derive(Debug, Clone)]
pub struct Plan {
    tests: Vec<Inclusion>,
    runnable: Vec<usize>,
    reported: Vec<usize>,
}

impl Plan {
    pub fn new(tree: &SuiteTree, filter: &TestFilter) -> Self {
        let suite_count = tree.suites().len();

        // Suites are stored in registration (pre-)order, so a reverse sweep
        // sees every child before its parent.
        let mut only_below = vec![false; suite_count];
        for id in (0..suite_count).rev() {
            let flag = tree.suite(id).children.iter().any(|child| match *child {
                Child::Test(t) => tree.test(t).mode == FilterMode::Only,
                Child::Suite(s) => tree.suite(s).mode == FilterMode::Only || only_below[s],
            });
            only_below[id] = flag;
        }

        let any_only = tree.has_only();
        let tests = (0..tree.test_count())
            .map(|t| Self::resolve(tree, filter, t, any_only, &only_below))
            .collect::<Vec<_>>();

        let mut runnable = vec![0; suite_count];
        let mut reported = vec![0; suite_count];
        for (t, inclusion) in tests.iter().enumerate() {
            let suite = tree.test(t).suite;
            for s in tree.ancestors(suite) {
                match inclusion {
                    Inclusion::Run => {
                        runnable[s] += 1;
                        reported[s] += 1;
                    }
                    Inclusion::Skip => reported[s] += 1,
                    Inclusion::Excluded => {}
                }
            }
        }

        Self {
            tests,
            runnable,
            reported,
        }
    }

    fn resolve(
        tree: &SuiteTree,
        filter: &TestFilter,
        t: TestId,
        any_only: bool,
        only_below: &[bool],
    ) -> Inclusion {
        let test = tree.test(t);
        let ancestors = tree.ancestors(test.suite);

        let in_scope = !any_only
            || test.mode == FilterMode::Only
            || ancestors
                .iter()
                .any(|&s| tree.suite(s).mode == FilterMode::Only && !only_below[s]);
        if !in_scope || !filter.matches(tree, t) {
            return Inclusion::Excluded;
        }

        let skipped = test.mode == FilterMode::Skip
            || ancestors.iter().any(|&s| tree.suite(s).mode == FilterMode::Skip);
        if skipped {
            Inclusion::Skip
        } else {
            Inclusion::Run
        }
    }

    pub fn inclusion(&self, test: TestId) -> Inclusion {
        self.tests[test]
    }

    /// Tests under `suite` that will execute
    pub fn runnable(&self, suite: SuiteId) -> usize {
        self.runnable[suite]
    }

    /// Tests under `suite` that produce an outcome record (run or skipped)
    pub fn reported(&self, suite: SuiteId) -> usize {
        self.reported[suite]
    }

    pub fn total_reported(&self) -> usize {
        self.reported[ROOT]
    }

    pub fn total_runnable(&self) -> usize {
        self.runnable[ROOT]
    }
}

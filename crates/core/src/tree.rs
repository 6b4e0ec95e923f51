//! Suite tree and its builder
//!
//! Suites and tests live in flat tables addressed by index; parent/child
//! links are indices. The builder keeps a cursor on the group currently being
//! registered, so nested `describe` bodies register into the right parent.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::error::StructureError;
use crate::outcome::full_title;
use crate::step::SharedStep;

/// Index of a suite in [`SuiteTree`]
pub type SuiteId = usize;

/// Index of a test in [`SuiteTree`]
pub type TestId = usize;

/// The unnamed root group every registration hangs off
pub const ROOT: SuiteId = 0;

/// Per-node execution filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Normal,
    Only,
    Skip,
}

/// Hook kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookKind::BeforeAll => "before all",
            HookKind::AfterAll => "after all",
            HookKind::BeforeEach => "before each",
            HookKind::AfterEach => "after each",
        };
        f.write_str(s)
    }
}

/// Entry in a suite's ordered child list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Suite(SuiteId),
    Test(TestId),
}

/// Hooks bound to one suite, each kind in registration order
#[derive(Default, Clone)]
pub struct Hooks {
    before_all: Vec<SharedStep>,
    after_all: Vec<SharedStep>,
    before_each: Vec<SharedStep>,
    after_each: Vec<SharedStep>,
}

impl Hooks {
    pub fn get(&self, kind: HookKind) -> &[SharedStep] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::AfterAll => &self.after_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
        }
    }

    fn push(&mut self, kind: HookKind, step: SharedStep) {
        match kind {
            HookKind::BeforeAll => self.before_all.push(step),
            HookKind::AfterAll => self.after_all.push(step),
            HookKind::BeforeEach => self.before_each.push(step),
            HookKind::AfterEach => self.after_each.push(step),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_all", &self.before_all.len())
            .field("after_all", &self.after_all.len())
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .finish()
    }
}

/// A named group of tests and nested groups
#[derive(Debug, Clone)]
pub struct SuiteNode {
    pub name: String,
    pub parent: Option<SuiteId>,
    pub mode: FilterMode,
    pub tags: Vec<String>,
    pub children: Vec<Child>,
    pub hooks: Hooks,
}

/// A single executable test
#[derive(Clone)]
pub struct TestCase {
    pub name: String,
    pub suite: SuiteId,
    pub mode: FilterMode,
    pub tags: Vec<String>,
    pub body: SharedStep,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("suite", &self.suite)
            .field("mode", &self.mode)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Immutable suite tree produced by [`SuiteBuilder::build`]
#[derive(Debug, Clone)]
pub struct SuiteTree {
    suites: Vec<SuiteNode>,
    tests: Vec<TestCase>,
}

impl SuiteTree {
    pub fn root(&self) -> &SuiteNode {
        &self.suites[ROOT]
    }

    pub fn suite(&self, id: SuiteId) -> &SuiteNode {
        &self.suites[id]
    }

    pub fn test(&self, id: TestId) -> &TestCase {
        &self.tests[id]
    }

    pub fn suites(&self) -> &[SuiteNode] {
        &self.suites
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Suites from the root down to `id`, inclusive
    pub fn ancestors(&self, id: SuiteId) -> Vec<SuiteId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.suites[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Names of the suites from the root down to `id`, root excluded
    pub fn suite_path(&self, id: SuiteId) -> Vec<String> {
        self.ancestors(id)
            .into_iter()
            .skip(1)
            .map(|s| self.suites[s].name.clone())
            .collect()
    }

    pub fn test_full_title(&self, id: TestId) -> String {
        let test = &self.tests[id];
        full_title(&self.suite_path(test.suite), &test.name)
    }

    /// Tags of the test plus tags inherited from its suites
    pub fn effective_tags(&self, id: TestId) -> Vec<String> {
        let test = &self.tests[id];
        let mut tags: Vec<String> = self
            .ancestors(test.suite)
            .into_iter()
            .flat_map(|s| self.suites[s].tags.iter().cloned())
            .collect();
        tags.extend(test.tags.iter().cloned());
        let mut seen = HashSet::new();
        tags.retain(|tag| seen.insert(tag.clone()));
        tags
    }

    pub fn has_only(&self) -> bool {
        self.suites.iter().any(|s| s.mode == FilterMode::Only)
            || self.tests.iter().any(|t| t.mode == FilterMode::Only)
    }
}

type SharedBody = Rc<dyn Fn(&mut SuiteBuilder) -> Result<(), StructureError>>;

/// Registers groups, tests and hooks, then finalizes them into a [`SuiteTree`]
///
/// ```
/// use suiterun_core::{from_fn, SuiteBuilder};
///
/// let mut builder = SuiteBuilder::new();
/// builder
///     .describe("cart", |s| {
///         s.before_each(from_fn(|_| Ok(())))?;
///         s.it("adds an item", from_fn(|_| Ok(())))?;
///         Ok(())
///     })
///     .unwrap();
/// let tree = builder.build().unwrap();
/// assert_eq!(tree.test_count(), 1);
/// ```
pub struct SuiteBuilder {
    suites: Vec<SuiteNode>,
    tests: Vec<TestCase>,
    cursor: SuiteId,
    shared: HashMap<String, SharedBody>,
    expanding: Vec<String>,
    error: Option<StructureError>,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self {
            suites: vec![SuiteNode {
                name: String::new(),
                parent: None,
                mode: FilterMode::Normal,
                tags: Vec::new(),
                children: Vec::new(),
                hooks: Hooks::default(),
            }],
            tests: Vec::new(),
            cursor: ROOT,
            shared: HashMap::new(),
            expanding: Vec::new(),
            error: None,
        }
    }

    /// Register a group; `body` runs immediately to collect its contents
    pub fn describe<F>(&mut self, name: impl Into<String>, body: F) -> Result<SuiteId, StructureError>
    where
        F: FnOnce(&mut Self) -> Result<(), StructureError>,
    {
        self.group(name, FilterMode::Normal, Vec::new(), body)
    }

    pub fn describe_only<F>(&mut self, name: impl Into<String>, body: F) -> Result<SuiteId, StructureError>
    where
        F: FnOnce(&mut Self) -> Result<(), StructureError>,
    {
        self.group(name, FilterMode::Only, Vec::new(), body)
    }

    pub fn describe_skip<F>(&mut self, name: impl Into<String>, body: F) -> Result<SuiteId, StructureError>
    where
        F: FnOnce(&mut Self) -> Result<(), StructureError>,
    {
        self.group(name, FilterMode::Skip, Vec::new(), body)
    }

    /// Register a group with an explicit filter mode and tags
    pub fn group<F>(
        &mut self,
        name: impl Into<String>,
        mode: FilterMode,
        tags: Vec<String>,
        body: F,
    ) -> Result<SuiteId, StructureError>
    where
        F: FnOnce(&mut Self) -> Result<(), StructureError>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return self.fail(StructureError::EmptyName {
                kind: "group",
                parent: self.cursor_name(),
            });
        }

        let parent = self.cursor;
        let id = self.suites.len();
        self.suites.push(SuiteNode {
            name,
            parent: Some(parent),
            mode,
            tags,
            children: Vec::new(),
            hooks: Hooks::default(),
        });
        self.suites[parent].children.push(Child::Suite(id));

        self.cursor = id;
        let result = body(self);
        self.cursor = parent;

        result.map(|()| id)
    }

    pub fn it(&mut self, name: impl Into<String>, body: SharedStep) -> Result<TestId, StructureError> {
        self.test(name, FilterMode::Normal, Vec::new(), body)
    }

    pub fn it_only(&mut self, name: impl Into<String>, body: SharedStep) -> Result<TestId, StructureError> {
        self.test(name, FilterMode::Only, Vec::new(), body)
    }

    pub fn it_skip(&mut self, name: impl Into<String>, body: SharedStep) -> Result<TestId, StructureError> {
        self.test(name, FilterMode::Skip, Vec::new(), body)
    }

    /// Register a test with an explicit filter mode and tags
    pub fn test(
        &mut self,
        name: impl Into<String>,
        mode: FilterMode,
        tags: Vec<String>,
        body: SharedStep,
    ) -> Result<TestId, StructureError> {
        let name = name.into();
        if name.trim().is_empty() {
            return self.fail(StructureError::EmptyName {
                kind: "test",
                parent: self.cursor_name(),
            });
        }

        let id = self.tests.len();
        self.tests.push(TestCase {
            name,
            suite: self.cursor,
            mode,
            tags,
            body,
        });
        self.suites[self.cursor].children.push(Child::Test(id));
        Ok(id)
    }

    pub fn before_all(&mut self, step: SharedStep) -> Result<(), StructureError> {
        self.hook(HookKind::BeforeAll, step)
    }

    pub fn after_all(&mut self, step: SharedStep) -> Result<(), StructureError> {
        self.hook(HookKind::AfterAll, step)
    }

    pub fn before_each(&mut self, step: SharedStep) -> Result<(), StructureError> {
        self.hook(HookKind::BeforeEach, step)
    }

    pub fn after_each(&mut self, step: SharedStep) -> Result<(), StructureError> {
        self.hook(HookKind::AfterEach, step)
    }

    /// Bind a hook to the current group; illegal at the root
    pub fn hook(&mut self, kind: HookKind, step: SharedStep) -> Result<(), StructureError> {
        if self.cursor == ROOT {
            return self.fail(StructureError::HookOutsideGroup { hook: kind });
        }
        self.suites[self.cursor].hooks.push(kind, step);
        Ok(())
    }

    /// Define a reusable group body that [`SuiteBuilder::include`] splices in
    pub fn define_shared<F>(&mut self, name: impl Into<String>, body: F) -> Result<(), StructureError>
    where
        F: Fn(&mut Self) -> Result<(), StructureError> + 'static,
    {
        let name = name.into();
        if self.shared.contains_key(&name) {
            return self.fail(StructureError::DuplicateShared(name));
        }
        self.shared.insert(name, Rc::new(body));
        Ok(())
    }

    /// Register the contents of a shared group into the current group
    pub fn include(&mut self, name: &str) -> Result<(), StructureError> {
        if self.expanding.iter().any(|n| n == name) {
            let mut chain = self.expanding.clone();
            chain.push(name.to_string());
            return self.fail(StructureError::RecursiveRegistration {
                name: name.to_string(),
                chain,
            });
        }

        let body = match self.shared.get(name) {
            Some(body) => Rc::clone(body),
            None => return self.fail(StructureError::UnknownShared(name.to_string())),
        };

        self.expanding.push(name.to_string());
        let result = body(self);
        self.expanding.pop();
        result
    }

    /// Finalize the tree; fails with the first structure error recorded
    pub fn build(self) -> Result<SuiteTree, StructureError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(SuiteTree {
            suites: self.suites,
            tests: self.tests,
        })
    }

    fn cursor_name(&self) -> String {
        let name = &self.suites[self.cursor].name;
        if name.is_empty() {
            "<root>".to_string()
        } else {
            name.clone()
        }
    }

    fn fail<T>(&mut self, err: StructureError) -> Result<T, StructureError> {
        if self.error.is_none() {
            self.error = Some(err.clone());
        }
        Err(err)
    }
}

impl Default for SuiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

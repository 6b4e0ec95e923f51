//! suiterun suite runner
//!
//! Drives the core scheduler from declarative YAML suite files:
//! - loads `*.yaml` suites from a directory
//! - registers them into one suite tree (shared groups are run-global)
//! - executes file and command steps, polling where a step waits
//! - writes failure artifacts and a JSON results file
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SuiteRunner                                                │
//! │    ├── load()     -> Vec<SpecFile>                          │
//! │    ├── build()    -> SuiteTree                              │
//! │    ├── list() / validate()                                  │
//! │    ├── run()      -> RunSummary                             │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteSpec (YAML)                                           │
//! │    ├── name, mode, tags, shared, include                    │
//! │    ├── before_all / before_each / after_each / after_all    │
//! │    │     └── { when, steps }                                │
//! │    ├── tests: [{ name, mode, tags, steps }]                 │
//! │    └── suites: [SuiteSpec]                                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  StepExecutor                                               │
//! │    ├── log / sleep / fail                                   │
//! │    ├── exec / wait_for_command                              │
//! │    ├── write_file / remove_file                             │
//! │    └── assert_file / wait_for_file                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod compile;
pub mod config;
pub mod error;
pub mod runner;
pub mod spec;
pub mod steps;

pub use artifacts::ArtifactStore;
pub use config::{PollConfig, RunnerConfig, DEFAULT_CONFIG_FILE};
pub use error::{RunnerError, RunnerResult};
pub use runner::{ListedTest, SuiteRunner, ValidationReport};
pub use spec::{Condition, GroupSpec, HookSpec, SpecFile, SuiteSpec, SuiteStep, TestSpec};
pub use steps::StepExecutor;

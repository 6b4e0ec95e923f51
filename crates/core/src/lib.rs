//! suiterun core library
//!
//! The orchestration core of the suiterun test runner:
//! - builds nested suites, tests and hooks into an immutable arena tree
//! - schedules tests depth-first with only/skip filtering and hook ordering
//! - polls assertions until they hold or a timeout elapses
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SuiteBuilder                                               │
//! │    ├── describe / describe_only / describe_skip             │
//! │    ├── it / it_only / it_skip                               │
//! │    ├── before_all / before_each / after_each / after_all    │
//! │    └── define_shared / include  ──▶ SuiteTree (arena)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scheduler                                                  │
//! │    ├── Plan (only / skip / grep / tags)                     │
//! │    ├── run(tree) -> RunSummary                              │
//! │    ├── Reporter events                                      │
//! │    └── ArtifactSink on failure                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  poll(clock, retrieve, predicate, options)                  │
//! │  check(retrieve, predicate)                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod context;
pub mod error;
pub mod expect;
pub mod outcome;
pub mod plan;
pub mod poll;
pub mod report;
pub mod scheduler;
pub mod step;
pub mod tree;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ExecutionContext, PreviousTest, TestState};
pub use error::{AssertionError, PollError, StepError, StepResult, StructureError, TimeoutError};
pub use outcome::{ArtifactRef, FailureDetail, FailurePhase, RunSummary, TestOutcome};
pub use plan::{Inclusion, Plan, TestFilter};
pub use poll::{check, poll, PollOptions};
pub use report::{EventLog, Reporter, RunEvent, TracingReporter};
pub use scheduler::{ArtifactSink, RunOptions, Scheduler};
pub use step::{from_async, from_fn, SharedStep, Step};
pub use tree::{Child, FilterMode, HookKind, SuiteBuilder, SuiteId, SuiteTree, TestId, ROOT};

/// suiterun version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

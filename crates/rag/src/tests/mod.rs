//! Cross-module scenario tests.

mod indexing_runs;

//! Integration and unit tests for Modellwald.
//!
//! ## Test Modules
//!
//! - **support**: shared fixtures (in-memory database, temp trees)
//! - **scanner_tests**: scan passes against temporary directory trees
//! - **merge_tests**: merging models and path updates
//! - **api_tests**: HTTP endpoints through the full router
//! - **error_tests**: error responses
//! - **config_tests**: configuration loading and validation
//! - **db_tests**: schema, migrations and catalog queries
//!
//! Individual test modules can be run with:
//! ```bash
//! cargo test scanner_tests
//! cargo test merge_tests
//! ```

pub mod api_tests;
pub mod config_tests;
pub mod support;

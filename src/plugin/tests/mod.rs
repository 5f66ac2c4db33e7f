//! Plugin System Tests
//!
//! Registry, pipeline and base-contract tests built on the mock plugins.


#[cfg(test)]
pub mod manager_tests;



#[cfg(test)]
pub mod dispatch_tests;

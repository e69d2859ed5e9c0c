pub mod concurrent_test;
pub mod run_once_test;

pub mod common;

mod job_tests;
mod result_tests;
mod rule_tests;
mod url_tests;

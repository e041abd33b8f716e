//! Integration tests for the notegen generation client

mod config_integration;
mod generation_run;
mod persistence_resume;
mod test_utils;

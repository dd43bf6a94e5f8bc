//! StackWizard - full-stack project generator
//!
//! This library exposes the generator's error handling and recovery layer:
//! error classification, diagnostics, input validation, preflight checks,
//! recovery decisions and cleanup. The `stackwizard` binary drives them
//! through [`workflow::GenerationWorkflow`].

pub mod cleanup;
pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod process;
pub mod project;
pub mod recovery;
pub mod requirements;
pub mod ui;
pub mod validation;
pub mod workflow;

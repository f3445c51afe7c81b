//! Ambient terminal narration, separate from the structured Diagnostic Sink.
//!
//! `Output` is how the Orchestrator and binary tell a human what stage is
//! running right now ("Discovering Makefiles...", "Writing 4 files..."); it
//! is not consulted by any core stage and carries no data other than text.
//! Modeled directly on the teacher's `output` module.

use colored::Colorize;

const MAKEFORGE_PREFIX: &str = "makeforge";

#[derive(Debug, Clone, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn status(&self, text: &str) {
        log::info!("{}", text);
        if !self.quiet {
            println!("{}", self.with_prefix(text).green());
        }
    }

    pub fn warning(&self, text: &str) {
        log::warn!("{}", text);
        if !self.quiet {
            println!("{}", self.with_prefix(text).yellow());
        }
    }

    pub fn error(&self, text: &str) {
        log::error!("{}", text);
        eprintln!("{}", self.with_prefix(text).red());
    }

    fn with_prefix(&self, text: &str) -> String {
        format!("{}: {}", MAKEFORGE_PREFIX, text)
    }
}

use crate::location::SourceLocation;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("Error occured reading from file {0:?}")]
    ReadFromFile(std::path::PathBuf, #[source] std::io::Error),
    #[error("Error occured in creating directory {0:?}")]
    CreateDirectory(std::path::PathBuf, #[source] std::io::Error),
    #[error("Error occured in creating file {0:?}")]
    CreateFile(std::path::PathBuf, #[source] std::io::Error),
    #[error("Failed to write to file {0:?}")]
    WriteToFile(std::path::PathBuf, #[source] std::io::Error),
    #[error("Failed to convert UTF-8 bytes to string for {0:?}")]
    NotUtf8(std::path::PathBuf, #[source] std::string::FromUtf8Error),
    #[error("Failed to canonicalize path {0:?}")]
    Canonicalize(std::path::PathBuf, #[source] std::io::Error),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration value for \"{0}\" had the wrong shape")]
    WrongShape(String),
    #[error("Configuration mapping root must be an object")]
    NotAnObject,
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("No Makefile found in {0:?}; tried Makefile, makefile, GNUmakefile")]
    EntryMissing(std::path::PathBuf),
    #[error("Explicit entry file {0:?} does not exist")]
    ExplicitEntryMissing(std::path::PathBuf),
    #[error("Include cycle detected: {}", .0.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join(" -> "))]
    Cycle(Vec<std::sync::Arc<str>>),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unterminated or unmatched conditional at {0}")]
    Conditional(SourceLocation),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Recursive expansion loop on variable \"{0}\" closing at {1}")]
    RecursiveLoop(String, SourceLocation),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    #[error("Duplicate target physical name \"{0}\"")]
    DuplicateTarget(String),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Failed writing emitted file {0:?}")]
    WriteFail(std::path::PathBuf, #[source] FsError),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Failed to create file appender: {0}")]
    FailedToCreateFileAppender(#[source] std::io::Error),
    #[error("Failed to create logger configuration: {0}")]
    FailedToCreateConfig(#[source] log4rs::config::runtime::ConfigErrors),
    #[error(transparent)]
    FailedToSetLogger(#[from] log::SetLoggerError),
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CommandLineError {
    #[error("Input cannot be non-UTF-8")]
    NonUtf8Input,
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Top-level error returned by the orchestrator. Every stage's own error type
/// folds into this one so `main` has a single place to map faults to an exit
/// code; unexpected internal faults are represented as diagnostics (code
/// `INTERNAL`), not as a variant here — per spec.md §7 they must not abort
/// the process.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

//! Thin binary entry point: argument parsing, config loading, logger
//! initialization, and rendering the pipeline's diagnostics. All real work
//! happens in the library crate.

use clap::Parser;

use makeforge::cli::command_line::{CommandLine, OutputFormat, Subcommand};
use makeforge::config::Config;
use makeforge::diagnostics::{codes, Diagnostic, DiagnosticSink, Severity};
use makeforge::output::Output;
use makeforge::orchestrator::{self, TranslateOptions};
use makeforge::unknown::UnknownConstruct;

fn main() {
    let command_line = CommandLine::parse();

    if command_line.show_version {
        println!("makeforge {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let Some(Subcommand::Translate(opts)) = command_line.subcommand else {
        eprintln!("makeforge: no subcommand given; run `makeforge translate --help`");
        std::process::exit(1);
    };

    let output = Output::new(opts.verbose == 0);

    let log_level = match opts.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    if let Err(err) = makeforge::logger::Logger::init(opts.output_dir.as_path(), log_level) {
        eprintln!("makeforge: failed to initialize logger: {err}");
    }

    let mut config_diagnostics = DiagnosticSink::new();
    let config = match load_config(opts.config.as_deref(), opts.strict, opts.jobs, &mut config_diagnostics) {
        Ok(config) => config,
        Err(err) => {
            output.error(&format!("failed to load configuration: {err}"));
            std::process::exit(1);
        }
    };

    let translate_options = TranslateOptions {
        source_dir: opts.source_dir.as_path().to_path_buf(),
        entry: opts.entry.map(std::path::PathBuf::from),
        output_dir: opts.output_dir.as_path().to_path_buf(),
        dry_run: opts.dry_run,
        packaging_enabled: opts.with_packaging,
    };

    let filesystem = makeforge::fs::RealFilesystem;
    let spinner = (opts.verbose == 0).then(|| {
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_message("translating Makefile tree");
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        bar
    });
    if spinner.is_none() {
        output.status("translating Makefile tree");
    }
    let mut report = match orchestrator::run(&translate_options, &config, &filesystem) {
        Ok(report) => report,
        Err(err) => {
            if let Some(bar) = &spinner {
                bar.finish_and_clear();
            }
            output.error(&format!("pipeline failed: {err}"));
            std::process::exit(1);
        }
    };
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    // Config diagnostics are collected before the pipeline runs, but they
    // share the same rendered stream and the same exit-status computation
    // (spec.md §9 P9) as everything the pipeline itself records.
    report.diagnostics.merge(config_diagnostics);
    report.exit_status = if report.diagnostics.any_error() { 1 } else { 0 };

    render_diagnostics(&report.diagnostics, opts.format, &output);
    render_unknown_constructs(&report.unknown_constructs, opts.format);

    if !opts.dry_run && report.exit_status == 0 {
        output.status(&format!("wrote {} file(s) to {}", report.files.len(), opts.output_dir.to_string()));
    }

    std::process::exit(report.exit_status);
}

/// Loads configuration from an optional YAML/JSON file. A missing or
/// unreadable `--config` path is recorded as a `CONFIG_MISSING` diagnostic
/// (falling back to an empty mapping) rather than short-circuiting via
/// `anyhow`, so it shares the same diagnostic stream and exit-status
/// computation as every other stage (spec.md §6, §9 P9). Malformed YAML/JSON
/// content still propagates as a hard error: that is a different failure
/// mode than an absent file, and not one the diagnostic model is asked to
/// represent.
fn load_config(
    path: Option<&std::path::Path>,
    strict: bool,
    jobs: usize,
    sink: &mut DiagnosticSink,
) -> anyhow::Result<Config> {
    let value = match path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(raw) => serde_yaml::from_str::<serde_json::Value>(&raw)?,
            Err(err) => {
                sink.push(Diagnostic::new(
                    Severity::Error,
                    codes::CONFIG_MISSING,
                    format!("configuration file {path:?} could not be read: {err}"),
                ));
                serde_json::json!({})
            }
        },
        None => serde_json::json!({}),
    };
    let (mut config, diagnostics) = Config::from_value(value)?;
    if strict {
        config.strict = true;
    }
    config.jobs = jobs;
    for diagnostic in diagnostics {
        sink.push(diagnostic);
    }
    Ok(config)
}

fn render_diagnostics(sink: &makeforge::diagnostics::DiagnosticSink, format: OutputFormat, output: &Output) {
    match format {
        OutputFormat::Json => {
            let entries: Vec<&Diagnostic> = sink.sorted_view();
            match serde_json::to_string_pretty(&entries) {
                Ok(json) => println!("{json}"),
                Err(err) => output.error(&format!("failed to render diagnostics as JSON: {err}")),
            }
        }
        OutputFormat::Text => {
            for diagnostic in sink.sorted_view() {
                let location = diagnostic
                    .location
                    .as_ref()
                    .map(|l| format!(" ({l})"))
                    .unwrap_or_default();
                let line = format!("[{}] {}{}", diagnostic.code, diagnostic.message, location);
                match diagnostic.severity {
                    Severity::Error => output.error(&line),
                    Severity::Warn => output.warning(&line),
                    Severity::Info => output.status(&line),
                }
            }
        }
    }
}

const UNKNOWN_CATEGORIES: &[makeforge::unknown::Category] = &[
    makeforge::unknown::Category::MakeSyntax,
    makeforge::unknown::Category::MakeFunction,
    makeforge::unknown::Category::ConditionalLogic,
    makeforge::unknown::Category::ShellCommand,
    makeforge::unknown::Category::ToolchainSpecific,
    makeforge::unknown::Category::Other,
];

fn render_unknown_constructs(registry: &makeforge::unknown::UnknownConstructRegistry, format: OutputFormat) {
    if registry.is_empty() {
        return;
    }
    match format {
        OutputFormat::Json => {
            let entries: Vec<&UnknownConstruct> = registry.iter().collect();
            if let Ok(json) = serde_json::to_string_pretty(&entries) {
                println!("{json}");
            }
        }
        OutputFormat::Text => {
            for category in UNKNOWN_CATEGORIES {
                let mut constructs = registry.by_category(*category).peekable();
                if constructs.peek().is_none() {
                    continue;
                }
                println!("{category:?}:");
                for construct in constructs {
                    println!(
                        "  {}: {} -> {:?} ({:?})",
                        construct.id, construct.normalized_form, construct.cmake_status, construct.suggested_action
                    );
                }
            }
        }
    }
}

//! Orchestrator (spec.md §4.10): wires Discoverer → Parser → Evaluator → IR
//! Builder → Emitter in one linear pass, carrying a shared diagnostic sink
//! and unknown-construct registry. Short-circuits emission when any stage
//! before it has already recorded an error.

use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::emit::EmitOptions;
use crate::errors::PipelineError;
use crate::eval::EvalContext;
use crate::fs::FilesystemBoundary;
use crate::ir::types::Project;
use crate::unknown::UnknownConstructRegistry;

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub source_dir: std::path::PathBuf,
    pub entry: Option<std::path::PathBuf>,
    pub output_dir: std::path::PathBuf,
    pub dry_run: bool,
    pub packaging_enabled: bool,
}

/// Everything the pipeline produced: the fully-populated diagnostic sink and
/// unknown-construct registry, the built IR (`None` if discovery/config
/// failed outright), the emitted file list, and the final exit status
/// (spec.md §4.10: 1 if any error was recorded, else 0).
pub struct RunReport {
    pub diagnostics: DiagnosticSink,
    pub unknown_constructs: UnknownConstructRegistry,
    pub project: Option<Project>,
    pub files: Vec<(String, String)>,
    pub exit_status: i32,
}

/// Parses every discovered file, optionally spread across `jobs` worker
/// threads (spec.md §5's parallel-parse extension). Workers each accumulate
/// their own diagnostic sink; results are folded back into `sink` strictly in
/// discovery order so determinism (P1, P3) does not depend on `jobs`.
fn parse_files(
    files: &[crate::discovery::DiscoveredFile],
    jobs: usize,
    sink: &mut DiagnosticSink,
) -> Vec<crate::parser::types::SyntaxTree> {
    let worker_count = jobs.max(1).min(files.len().max(1));
    if worker_count <= 1 || files.len() <= 1 {
        return files
            .iter()
            .map(|f| crate::parser::parse(f.path.clone(), &f.content, sink))
            .collect();
    }

    let mut slots: Vec<Option<(crate::parser::types::SyntaxTree, DiagnosticSink)>> =
        (0..files.len()).map(|_| None).collect();
    let chunk_size = (files.len() + worker_count - 1) / worker_count;

    std::thread::scope(|scope| {
        let mut remaining_files = files;
        let mut remaining_slots = slots.as_mut_slice();
        while !remaining_files.is_empty() {
            let take = chunk_size.min(remaining_files.len());
            let (file_chunk, rest_files) = remaining_files.split_at(take);
            let (slot_chunk, rest_slots) = remaining_slots.split_at_mut(take);
            remaining_files = rest_files;
            remaining_slots = rest_slots;
            scope.spawn(move || {
                for (slot, file) in slot_chunk.iter_mut().zip(file_chunk) {
                    let mut local_sink = DiagnosticSink::new();
                    let tree = crate::parser::parse(file.path.clone(), &file.content, &mut local_sink);
                    *slot = Some((tree, local_sink));
                }
            });
        }
    });

    slots
        .into_iter()
        .map(|slot| {
            let (tree, local_sink) = slot.expect("every discovered file is assigned exactly one slot");
            sink.merge(local_sink);
            tree
        })
        .collect()
}

pub fn run(
    options: &TranslateOptions,
    config: &Config,
    filesystem: &dyn FilesystemBoundary,
) -> Result<RunReport, PipelineError> {
    let mut sink = DiagnosticSink::new();
    let mut unknown = UnknownConstructRegistry::new();

    let discovery = crate::discovery::discover(
        &options.source_dir,
        options.entry.as_deref(),
        filesystem,
        &mut sink,
    )?;

    if sink.any_error() {
        return Ok(RunReport {
            diagnostics: sink,
            unknown_constructs: unknown,
            project: None,
            files: Vec::new(),
            exit_status: 1,
        });
    }

    let trees = parse_files(&discovery.files, config.jobs, &mut sink);

    if sink.any_error() {
        return Ok(RunReport {
            diagnostics: sink,
            unknown_constructs: unknown,
            project: None,
            files: Vec::new(),
            exit_status: 1,
        });
    }

    let facts = {
        let mut eval_ctx = EvalContext {
            filesystem,
            sink: &mut sink,
            unknown: &mut unknown,
            ignore_paths: &config.ignore_paths,
        };
        crate::eval::evaluate(&trees, config, &mut eval_ctx)
    };

    if sink.any_error() {
        return Ok(RunReport {
            diagnostics: sink,
            unknown_constructs: unknown,
            project: None,
            files: Vec::new(),
            exit_status: 1,
        });
    }

    let project = crate::ir::build(&facts, config, filesystem, &mut sink, &mut unknown);

    if sink.any_error() {
        return Ok(RunReport {
            diagnostics: sink,
            unknown_constructs: unknown,
            project: Some(project),
            files: Vec::new(),
            exit_status: 1,
        });
    }

    let emit_options = EmitOptions {
        packaging_enabled: options.packaging_enabled,
    };
    let files = crate::emit::emit(&project, &emit_options, &mut sink, &mut unknown);

    if !options.dry_run && !sink.any_error() {
        for (relative_path, content) in &files {
            let absolute = options.output_dir.join(relative_path);
            if let Err(err) = filesystem.write_utf8(&absolute, content) {
                sink.push(
                    crate::diagnostics::Diagnostic::new(
                        crate::diagnostics::Severity::Error,
                        crate::diagnostics::codes::EMIT_WRITE_FAIL,
                        format!("failed writing {absolute:?}: {err}"),
                    ),
                );
                break;
            }
        }
    }

    let exit_status = if sink.any_error() { 1 } else { 0 };

    Ok(RunReport {
        diagnostics: sink,
        unknown_constructs: unknown,
        project: Some(project),
        files,
        exit_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFilesystem;

    #[test]
    fn dry_run_produces_files_without_writing() {
        let memfs = MemoryFilesystem::new().with_file(
            "/src/Makefile",
            "app: main.c\n\tgcc -c main.c -o app\n",
        );
        let config = Config::default();
        let options = TranslateOptions {
            source_dir: std::path::PathBuf::from("/src"),
            entry: None,
            output_dir: std::path::PathBuf::from("/out"),
            dry_run: true,
            packaging_enabled: false,
        };
        let report = run(&options, &config, &memfs).unwrap();
        assert_eq!(report.exit_status, 0);
        assert!(!report.files.is_empty());
        assert!(memfs.written_files().is_empty());
    }

    #[test]
    fn non_dry_run_flushes_files_through_the_boundary() {
        let memfs = MemoryFilesystem::new().with_file(
            "/src/Makefile",
            "app: main.c\n\tgcc -c main.c -o app\n",
        );
        let config = Config::default();
        let options = TranslateOptions {
            source_dir: std::path::PathBuf::from("/src"),
            entry: None,
            output_dir: std::path::PathBuf::from("/out"),
            dry_run: false,
            packaging_enabled: false,
        };
        let report = run(&options, &config, &memfs).unwrap();
        assert_eq!(report.exit_status, 0);
        assert!(memfs
            .written_files()
            .contains_key(&std::path::PathBuf::from("/out/CMakeLists.txt")));
    }

    #[test]
    fn parallel_parse_preserves_discovery_order_and_determinism() {
        let memfs = MemoryFilesystem::new()
            .with_file("/src/Makefile", "include sub.mk\napp: main.c\n\tgcc -c main.c -o app\n")
            .with_file("/src/sub.mk", "HELPER := 1\n");
        let mut config = Config::default();
        config.jobs = 4;
        let options = TranslateOptions {
            source_dir: std::path::PathBuf::from("/src"),
            entry: None,
            output_dir: std::path::PathBuf::from("/out"),
            dry_run: true,
            packaging_enabled: false,
        };
        let first = run(&options, &config, &memfs).unwrap();
        let second = run(&options, &config, &memfs).unwrap();
        assert_eq!(first.exit_status, 0);
        assert_eq!(first.files, second.files);
    }

    #[test]
    fn missing_entry_short_circuits_before_emission() {
        let memfs = MemoryFilesystem::new();
        let config = Config::default();
        let options = TranslateOptions {
            source_dir: std::path::PathBuf::from("/src"),
            entry: None,
            output_dir: std::path::PathBuf::from("/out"),
            dry_run: true,
            packaging_enabled: false,
        };
        let result = run(&options, &config, &memfs);
        assert!(result.is_err());
    }
}

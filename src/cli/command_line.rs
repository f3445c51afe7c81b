use crate::cli;

#[derive(clap::Parser, Debug)]
/// Translates GNU Make build descriptions into CMake projects.
pub struct CommandLine {
    #[command(subcommand)]
    pub subcommand: Option<Subcommand>,
    /// Display version and exit
    #[arg(long = "version")]
    pub show_version: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Translate a Makefile tree into a CMake project.
    Translate(TranslateOpts),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
pub struct TranslateOpts {
    /// Directory containing the Makefile tree to translate. Defaults to the
    /// current working directory.
    #[arg(long = "source-dir", short = 's', default_value_t, hide_default_value(true))]
    pub source_dir: cli::ProjectDirectory,
    /// Explicit entry Makefile name, relative to `source-dir`. By default
    /// Makefile, makefile and GNUmakefile are tried in that order.
    #[arg(long)]
    pub entry: Option<String>,
    /// Directory the generated CMake project is written into.
    #[arg(long = "output-dir", short = 'o', default_value_t, hide_default_value(true))]
    pub output_dir: cli::ProjectDirectory,
    /// Path to a YAML or JSON configuration file.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    /// Compute the translation without writing any files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Emit install/export packaging files alongside the generated project.
    #[arg(long = "with-packaging")]
    pub with_packaging: bool,
    /// Increase diagnostic verbosity; may be repeated.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Promote unrecognized configuration keys from warnings to errors.
    #[arg(long)]
    pub strict: bool,
    /// Diagnostic rendering format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Number of worker threads for the optional parallel-parse extension.
    /// Defaults to the number of logical CPUs.
    #[arg(long, default_value_t = num_cpus::get())]
    pub jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn translate_subcommand_parses_required_flags() {
        let command_line = CommandLine::parse_from([
            "makeforge",
            "translate",
            "--source-dir",
            "/tmp/proj",
            "--output-dir",
            "/tmp/out",
            "--with-packaging",
        ]);
        let opts = match command_line.subcommand {
            Some(Subcommand::Translate(t)) => t,
            _ => panic!("expected translate subcommand"),
        };
        assert!(opts.with_packaging);
        assert_eq!(opts.source_dir.as_path(), std::path::Path::new("/tmp/proj"));
    }

    #[test]
    fn verbose_flag_is_repeatable() {
        let command_line = CommandLine::parse_from([
            "makeforge", "translate", "-v", "-v",
        ]);
        let opts = match command_line.subcommand {
            Some(Subcommand::Translate(t)) => t,
            _ => panic!("expected translate subcommand"),
        };
        assert_eq!(opts.verbose, 2);
    }

    #[test]
    fn cli_definition_is_well_formed() {
        use clap::CommandFactory;
        CommandLine::command().debug_assert()
    }
}

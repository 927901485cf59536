mod tracing_config;

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use pathdiff::diff_paths;
use pike_analysis::{
    analyze_source, handle_request_json, AnalyzeOptions, Diagnostic, DiagnosticLevel, Lexer,
    LexerError, SourceFile, SourceId,
};
use serde_json::json;
use tracing::debug;

const PIKE_EXTENSIONS: &[&str] = &["pike", "pmod", "h"];

const CHECK_AFTER_HELP: &str = "\
Subcommands:
  pike-lint check [PATH]...   Report reads of possibly uninitialized variables (default).
  pike-lint tokens <FILE>     Dump the token stream of a Pike file.
  pike-lint request           Answer one JSON analyze request read from stdin.

See `pike-lint <subcommand> --help` for command-specific options.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Parser)]
#[command(
    name = "pike-lint",
    version,
    about = "Find reads of uninitialized variables in Pike sources.",
    after_help = CHECK_AFTER_HELP
)]
struct CheckCli {
    /// Files or directories to check (defaults to current directory).
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Treat a variable as initialized after `if`/`else` only when both arms
    /// assign it.
    #[arg(long)]
    merge_else: bool,

    /// Do not report variables that are assigned on some paths only.
    #[arg(long)]
    no_maybe: bool,

    /// Exit with an error when any warning is reported.
    #[arg(long)]
    deny_warnings: bool,
}

#[derive(Parser)]
#[command(
    name = "pike-lint tokens",
    version,
    about = "Dump the token stream of a Pike source file."
)]
struct TokensCli {
    /// Path to a Pike source file.
    input: PathBuf,
}

#[derive(Parser)]
#[command(
    name = "pike-lint request",
    version,
    about = "Read an analyze request as JSON from stdin and write the response to stdout."
)]
struct RequestCli {
    #[arg(long)]
    merge_else: bool,

    #[arg(long)]
    no_maybe: bool,
}

fn main() -> Result<()> {
    tracing_config::init_tracing();

    let mut raw: Vec<OsString> = env::args_os().collect();
    if raw.get(1).map(|arg| arg == "tokens").unwrap_or(false) {
        raw.remove(1);
        return run_tokens(&TokensCli::parse_from(raw));
    }
    if raw.get(1).map(|arg| arg == "request").unwrap_or(false) {
        raw.remove(1);
        return run_request(&RequestCli::parse_from(raw));
    }
    if raw.get(1).map(|arg| arg == "check").unwrap_or(false) {
        raw.remove(1);
    }

    run_check(&CheckCli::parse_from(raw))
}

fn analyze_options(merge_else: bool, no_maybe: bool) -> AnalyzeOptions {
    AnalyzeOptions {
        merge_else_branches: merge_else,
        report_maybe_initialized: !no_maybe,
    }
}

fn run_check(cli: &CheckCli) -> Result<()> {
    let cwd = env::current_dir().context("failed to determine current directory")?;
    let inputs = if cli.inputs.is_empty() {
        vec![cwd.clone()]
    } else {
        cli.inputs.clone()
    };

    let mut targets = BTreeSet::new();
    for input in &inputs {
        collect_pike_files(input, &mut targets)?;
    }
    debug!(files = targets.len(), "collected pike sources");

    let options = analyze_options(cli.merge_else, cli.no_maybe);
    let mut warnings = 0usize;
    let mut untokenizable = 0usize;
    let mut reports = Vec::new();

    for (index, path) in targets.iter().enumerate() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let display_path = display_path(path, &cwd);
        let source = SourceFile::new(SourceId(index as u32), display_path.clone(), contents);
        let filename = source.display_name();
        let report = analyze_source(&source.contents, &filename, &options);

        warnings += report.diagnostics.len();
        if report.lexer_error.is_some() {
            untokenizable += 1;
        }

        match cli.format {
            OutputFormat::Human => {
                let lines = source.lines();
                if let Some(error) = &report.lexer_error {
                    print_lexer_error(&source, &lines, error);
                }
                for diagnostic in &report.diagnostics {
                    print_diagnostic(&lines, diagnostic);
                }
            }
            OutputFormat::Json => reports.push(json!({
                "file": filename,
                "diagnostics": report.diagnostics,
                "error": report.lexer_error.as_ref().map(|error| error.to_string()),
            })),
        }
    }

    match cli.format {
        OutputFormat::Human => {
            eprintln!(
                "checked {} file(s): {} warning(s)",
                targets.len(),
                warnings
            );
        }
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&reports)
                .context("failed to serialize diagnostics")?;
            println!("{rendered}");
        }
    }

    if untokenizable > 0 {
        bail!("{} file(s) could not be tokenized", untokenizable);
    }
    if cli.deny_warnings && warnings > 0 {
        bail!("{} warning(s) reported and --deny-warnings is set", warnings);
    }

    Ok(())
}

fn run_tokens(cli: &TokensCli) -> Result<()> {
    let contents = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {:?}", cli.input))?;
    let source = SourceFile::new(SourceId(0), cli.input.clone(), contents);
    let tokens = Lexer::new(&source)
        .tokenize()
        .with_context(|| format!("failed to tokenize {}", source.display_name()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for token in &tokens {
        match token.column {
            Some(column) => writeln!(out, "{}:{}\t{:?}", token.line, column, token.text)?,
            None => writeln!(out, "{}\t{:?}", token.line, token.text)?,
        }
    }
    Ok(())
}

fn run_request(cli: &RequestCli) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read request from stdin")?;
    let response = handle_request_json(&input, &analyze_options(cli.merge_else, cli.no_maybe))?;
    println!("{response}");
    Ok(())
}

fn collect_pike_files(path: &PathBuf, targets: &mut BTreeSet<PathBuf>) -> Result<()> {
    let metadata = fs::metadata(path).with_context(|| format!("Failed to access {:?}", path))?;

    if metadata.is_dir() {
        let mut child_paths = Vec::new();
        for entry in
            fs::read_dir(path).with_context(|| format!("Failed to read directory {:?}", path))?
        {
            let entry =
                entry.with_context(|| format!("Failed to access entry within {:?}", path))?;
            child_paths.push(entry.path());
        }
        child_paths.sort();
        for child in child_paths {
            collect_pike_files(&child, targets)?;
        }
    } else if metadata.is_file() && is_pike_source(path) {
        targets.insert(path.clone());
    }

    Ok(())
}

fn is_pike_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PIKE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Paths under the working directory are shown relative to it.
fn display_path(path: &Path, cwd: &Path) -> PathBuf {
    let absolute = if path.is_relative() {
        cwd.join(path)
    } else {
        path.to_path_buf()
    };
    match diff_paths(&absolute, cwd) {
        Some(relative) if !relative.starts_with("..") => relative,
        _ => path.to_path_buf(),
    }
}

fn print_lexer_error(source: &SourceFile, lines: &[&str], error: &LexerError) {
    eprintln!("  - error: {}", error);
    eprintln!(
        "     --> {}:{}:{}",
        source.display_name(),
        error.line(),
        error.column()
    );
    print_source_line(lines, error.line(), error.column().saturating_sub(1));
}

fn print_diagnostic(lines: &[&str], diagnostic: &Diagnostic) {
    let (level_label, level_color) = match diagnostic.severity {
        DiagnosticLevel::Warning => ("warning", "  ~"),
    };
    let position = &diagnostic.position;
    eprintln!("{} {}: {}", level_color, level_label, diagnostic.message);
    eprintln!(
        "     --> {}:{}:{}",
        position.file,
        position.line,
        position.character + 1
    );
    print_source_line(lines, position.line, position.character);
}

/// Prints line `line` (1-based) with a caret under character `character`
/// (0-based). Tabs are widened to four spaces in both.
fn print_source_line(lines: &[&str], line: usize, character: usize) {
    let Some(raw_line) = lines.get(line.saturating_sub(1)) else {
        return;
    };
    let raw_line = raw_line.trim_end_matches('\r');
    eprintln!("      {}", raw_line.replace('\t', "    "));

    let mut caret_line = String::from("      ");
    for ch in raw_line.chars().take(character) {
        match ch {
            '\t' => caret_line.push_str("    "),
            _ => caret_line.push(' '),
        }
    }
    caret_line.push('^');
    eprintln!("{}", caret_line);
}

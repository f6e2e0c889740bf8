//! CHTL command line compiler.
//!
//! A thin CLI wrapper around [`chtl::api::compile_file`]: this binary
//! does argument parsing, file IO, diagnostic rendering and exit codes;
//! the library crate does the actual compilation.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use chtl::{compile_file, Diagnostic, Severity};

#[derive(Parser, Debug)]
#[command(name = "chtlc", version, about = "Compiles .chtl sources to HTML/CSS/JS", long_about = None)]
struct Args {
    /// Path to the .chtl file to compile
    input: PathBuf,

    /// Directory to write <stem>.html/.css/.js into (default: alongside the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Continue with whatever partial output is available after errors
    #[arg(long)]
    allow_partial: bool,

    /// Never emit colored diagnostics
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if !args.input.exists() {
        eprintln!("Error: input file '{}' does not exist", args.input.display());
        return ExitCode::FAILURE;
    }

    let allow_partial = args.allow_partial;
    let output = compile_file(&args.input, |opts| {
        let mut opts = opts;
        opts.allow_partial = allow_partial;
        opts
    });

    let color_choice = choose_color(args.no_color);
    render_diagnostics(&output.diagnostics, color_choice);

    if !output.succeeded() && !args.allow_partial {
        return ExitCode::FAILURE;
    }

    let out_dir = args.output.clone().unwrap_or_else(|| {
        args.input.parent().map(Path::to_path_buf).unwrap_or_default()
    });
    if let Err(err) = write_outputs(&out_dir, &args.input, &output) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    if output.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn choose_color(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn write_outputs(out_dir: &Path, input: &Path, output: &chtl::CompileOutputs) -> std::io::Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    std::fs::write(out_dir.join(format!("{stem}.html")), &output.html)?;
    std::fs::write(out_dir.join(format!("{stem}.css")), &output.css)?;
    std::fs::write(out_dir.join(format!("{stem}.js")), &output.js)?;
    Ok(())
}

fn render_diagnostics(diagnostics: &[Diagnostic], color_choice: ColorChoice) {
    let mut stream = StandardStream::stderr(color_choice);
    for diag in diagnostics {
        let mut spec = ColorSpec::new();
        match diag.severity {
            Severity::Error => spec.set_fg(Some(Color::Red)).set_bold(true),
            Severity::Warning => spec.set_fg(Some(Color::Yellow)).set_bold(true),
        };
        let _ = stream.set_color(&spec);
        let _ = write!(stream, "{:?}", diag.severity);
        let _ = stream.reset();
        let _ = writeln!(
            stream,
            " [{}:{}] {}{}",
            diag.position.line,
            diag.position.column,
            diag.message,
            diag.hint.as_deref().map(|h| format!(" (hint: {h})")).unwrap_or_default()
        );
    }
    if !diagnostics.is_empty() {
        if let Some((width, _)) = terminal_size::terminal_size() {
            eprintln!("{}", "-".repeat((width.0 as usize).min(80)));
        }
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = diagnostics.len() - errors;
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }
}


//! Output formatting

use crate::cli::args::VerbosityLevel;
use crate::core::resolver::BatchResult;
use crate::platform::cipher::FunctionPair;
use colored::Colorize;

/// Output formatter for ryt-sig
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "info:".blue().bold(), message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "ok:".green().bold(), message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    /// Print extracted functions
    pub fn print_functions(&self, functions: &FunctionPair) {
        print!("{}", render_functions(functions));
    }

    /// Print resolved URLs to stdout and failures to stderr
    pub fn print_batch(&self, result: &BatchResult) {
        for line in render_urls(result) {
            println!("{}", line);
        }
        for failure in &result.failures {
            self.warning(&format!(
                "format #{} ({}) failed: {}",
                failure.index,
                failure.format.label(),
                failure.error
            ));
        }
        self.success(&format!(
            "{} URL(s) resolved, {} failed",
            result.formats.len(),
            result.failures.len()
        ));
    }
}

/// One `<itag> <url>` line per resolved format, ordered by URL
pub fn render_urls(result: &BatchResult) -> Vec<String> {
    let mut lines: Vec<String> = result
        .formats
        .iter()
        .map(|(url, format)| match format.itag {
            Some(itag) => format!("{}\t{}", itag, url),
            None => format!("-\t{}", url),
        })
        .collect();
    lines.sort_by(|a, b| a.split('\t').nth(1).cmp(&b.split('\t').nth(1)));
    lines
}

/// Labelled fragment listing; a missing fragment is shown as such
pub fn render_functions(functions: &FunctionPair) -> String {
    let mut out = String::new();
    for (label, fragment) in [
        ("decipher", &functions.decipher),
        ("n-transform", &functions.n_transform),
    ] {
        out.push_str(&format!("// {}\n", label));
        match fragment {
            Some(fragment) => out.push_str(fragment),
            None => out.push_str("// not found"),
        }
        out.push('\n');
    }
    out
}

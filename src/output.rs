use console::style;

/// Prints the `gha-watch` banner to stderr.
///
/// Stdout carries only event lines, so nothing decorative may go there.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        style("👀 gha-watch").magenta().bold(),
        style(env!("CARGO_PKG_VERSION")).dim(),
        style("GitHub Actions run, job and step watcher").dim()
    );
}

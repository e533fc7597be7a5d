mod browser;
mod exports;
mod html;
mod styling;
mod summary;
mod tables;

pub use browser::open_in_browser;
pub use exports::{export_csv, export_json};
pub use html::{render_html, RenderOptions};
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the pipescope banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔭 pipescope"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Azure DevOps pipeline staleness report")
    );
}

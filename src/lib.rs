mod accel;
mod app;
mod buffers;
mod camera;
mod capture;
mod context;
mod heatmap_pass;
mod input;
mod options;
mod present_pass;
mod scene;
mod trace_pass;

use anyhow::Result;

pub use options::{usage, Options, UsageError};

/// Runs in the mode the options select: a single reference frame written
/// to a file, or the interactive window.
pub fn run(options: Options) -> Result<()> {
    match options.output_file.clone() {
        Some(path) => app::render_to_file(&options, &path),
        None => app::run_interactive(options),
    }
}

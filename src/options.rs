use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_WIDTH: u32 = 1000;
pub const DEFAULT_HEIGHT: u32 = 1000;

/// Launch configuration parsed from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Render a single frame to this path and exit instead of opening a window.
    pub output_file: Option<PathBuf>,
    /// When false, presentation goes through a per-frame staging copy
    /// instead of binding the render target directly.
    pub use_interop: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            output_file: None,
            use_interop: true,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// `-h`/`--help`: not a parse failure, but the caller prints usage and
    /// exits all the same.
    Help,
    Invalid(String),
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::Help => write!(f, "help requested"),
            UsageError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for UsageError {}

pub fn usage(program: &str) -> String {
    format!(
        "\nUsage: {program} [options]\n\
         App Options:\n\
         \x20 -h | --help                 Print this usage message and exit.\n\
         \x20 -f | --file <path>          Save single frame to file and exit.\n\
         \x20 -n | --nopbo                Disable interop for the display buffer.\n\
         \x20 -d | --dim=<width>x<height> Set image dimensions. Defaults to {DEFAULT_WIDTH}x{DEFAULT_HEIGHT}\n\
         App Keystrokes:\n\
         \x20 ESC        Quit\n\
         \x20 p          Save current frame to 'adaptive-path-tracer.png'\n\
         \x20 r          Reset camera\n\
         \x20 w/a/s/d    Move camera forward/left/back/right\n\
         \x20 q/e        Move camera up/down\n\
         \x20 h          Cycle heat-map channel\n"
    )
}

impl Options {
    pub fn parse<I>(args: I) -> Result<Options, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Options::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Err(UsageError::Help),
                "-f" | "--file" => {
                    let path = args.next().ok_or_else(|| {
                        UsageError::Invalid(format!("option '{arg}' requires a file argument"))
                    })?;
                    options.output_file = Some(PathBuf::from(path));
                }
                "-n" | "--nopbo" => options.use_interop = false,
                s if s.starts_with("-d") || s.starts_with("--dim") => {
                    let (width, height) = parse_dimensions(s)?;
                    options.width = width;
                    options.height = height;
                }
                other => {
                    return Err(UsageError::Invalid(format!("unknown option '{other}'")));
                }
            }
        }
        Ok(options)
    }
}

fn parse_dimensions(arg: &str) -> Result<(u32, u32), UsageError> {
    let malformed = || {
        UsageError::Invalid(format!(
            "option '{arg}' is malformed, expected -d=<width>x<height>"
        ))
    };
    let (_, body) = arg.split_once('=').ok_or_else(malformed)?;
    let (width, height) = body.split_once('x').ok_or_else(malformed)?;
    let width: u32 = width.parse().map_err(|_| malformed())?;
    let height: u32 = height.parse().map_err(|_| malformed())?;
    if width == 0 || height == 0 {
        return Err(UsageError::Invalid(format!(
            "option '{arg}' requests an empty image"
        )));
    }
    Ok((width, height))
}

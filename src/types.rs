use std::path::PathBuf;

/// Where to search for configuration files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// What to do when several candidate configuration files exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Load every existing file in search order. Later files overwrite
    /// single-valued options and append to multiple-valued ones.
    #[default]
    Merge,
    /// Load only the first existing file in search order.
    FirstMatch,
}

/// Project metadata kept for usage renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    pub version: Option<String>,
    pub license: Option<String>,
    pub copyright: Option<String>,
    pub build_date: Option<String>,
    pub build_time: Option<String>,
    pub help_header: Option<String>,
    pub help_footer: Option<String>,
}

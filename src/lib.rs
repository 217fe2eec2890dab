//! Command-line, environment, and configuration-file options resolved into
//! one validated set.
//!
//! Optfig takes one list of option declarations and fills it from three
//! sources: configuration files, an environment variable holding extra
//! arguments, and the command line.
//!
//! ```ignore
//! let options = Optfig::builder()
//!     .project_name("mytool")
//!     .options(vec![
//!         OptionDef::new("verbose")
//!             .with_short_name('v')
//!             .with_flags(OptionFlags::ALL_SOURCES | OptionFlags::FLAG),
//!         OptionDef::new("level")
//!             .with_flags(OptionFlags::ALL_SOURCES | OptionFlags::REQUIRED)
//!             .with_default("3")
//!             .with_validator("integer(1...5)"),
//!         OptionDef::new("--").with_flags(OptionFlags::COMMAND_LINE | OptionFlags::MULTIPLE),
//!     ])
//!     .config_file("mytool.conf")
//!     .env_var("MYTOOL_OPTIONS")
//!     .parse_env_args()?;
//!
//! let level = options.get_long("level", 0)?;
//! ```
//!
//! That call searches the platform config directory for `mytool.conf`,
//! applies `MYTOOL_OPTIONS="--level 4"`-style arguments from the environment,
//! then the command line, and hands back an [`Options`] to query.
//!
//! # Declarations as source of truth
//!
//! Each [`OptionDef`] says where its option may come from
//! ([`OptionFlags::COMMAND_LINE`], [`ENVIRONMENT_VARIABLE`](OptionFlags::ENVIRONMENT_VARIABLE),
//! [`CONFIGURATION_FILE`](OptionFlags::CONFIGURATION_FILE)), whether it takes
//! an argument, and whether it keeps one value or many. Mistakes in the
//! declarations (duplicate names, two default options, an alias of an alias)
//! are [`OptfigError::Logic`] errors raised before anything is read.
//!
//! Declarations can be extended at run time from `<dir>/<project>.ini`, see
//! [`OptfigBuilder::options_files_dir`].
//!
//! # Source precedence
//!
//! ```text
//! Compiled defaults     .with_default(...), exposed but never stored
//!        ↑ overridden by
//! Config files          search paths in order, later paths win
//!        ↑ overridden by
//! Environment variable  shell-like argument list
//!        ↑ overridden by
//! Command line
//! ```
//!
//! Single-valued options keep the last value given. `MULTIPLE` options keep
//! every value in source order, so a file giving `a b c`, the environment
//! `d e`, and the command line `f g` yields `a b c d e f g`.
//!
//! # Configuration file dialects
//!
//! Every file is read through a [`Dialect`]: one of six line continuation
//! styles plus sets of assignment operators, comment markers, and section
//! notations. Whatever notation is used, section names are stored joined by
//! `::`, so `a.b=1`, `a::b=1`, `[a]` + `b=1`, and `a { b=1 }` all set the
//! option named `a::b`.
//!
//! Parsed files live in a [`ConfCache`] keyed by path. A file is parsed at most
//! once per cache; asking for it again with a different dialect is a logic
//! error. Share one `Arc<ConfCache>` between parses with
//! [`OptfigBuilder::cache`].
//!
//! # Error handling
//!
//! Errors come in two families:
//!
//! - **Raised** ([`OptfigError`]): declaration mistakes, API misuse, missing
//!   values, failed conversions.
//! - **Reported** (through a [`Logger`]): bad configuration lines, unknown
//!   or misplaced arguments, values rejected by a validator. Each defect is
//!   reported once and skipped, so one run lists every problem.
//!
//! Validators are advisory: a rejected value is reported and still stored.

pub mod error;
pub mod types;

mod builder;
mod cache;
mod cli;
mod conf_file;
mod dialect;
mod env;
mod file;
mod lines;
mod logger;
mod option;
mod options;
mod registry;
mod resolve;
mod validator;

#[cfg(test)]
mod fixtures;

pub use builder::{Optfig, OptfigBuilder};
pub use cache::ConfCache;
pub use conf_file::{ConfFile, SECTION_SEPARATOR};
pub use dialect::{
    AssignmentOperators, CommentStyles, Dialect, DialectDescriptor, LineContinuation,
    SectionOperators,
};
pub use env::{EnvSource, MapEnv, StdEnv, split_args};
pub use error::OptfigError;
pub use logger::{LogCrateLogger, Logger, MessageCollector, Severity, StderrLogger};
pub use option::{DEFAULT_OPTION_NAME, OptionDef, OptionFlags};
pub use options::Options;
pub use registry::OptionRegistry;
pub use types::{ProjectInfo, SearchMode, SearchPath};
pub use validator::{
    KeywordsValidator, LengthValidator, RangeValidator, RegexValidator, Validator,
    ValidatorRegistry,
};

//! Core resolution pipeline: apply every source to the option values.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Stages, in order:
//!
//! 1. Configuration files, in search order
//! 2. The options environment variable, split like a shell command line
//! 3. The command line
//! 4. Validation of every stored value (advisory)
//!
//! Each stage only adds values (`MULTIPLE` options) or overwrites them
//! (single-valued options). Defaults are never stored; see
//! [`Options`](crate::Options).

use std::sync::Arc;

use crate::cli::{self, ArgSource};
use crate::conf_file::ConfFile;
use crate::env;
use crate::option::OptionFlags;
use crate::options::Options;

/// All pre-loaded data needed to resolve options. No I/O happens here.
#[derive(Debug, Default)]
pub(crate) struct ResolveInput {
    /// Parsed configuration files, first = lowest priority.
    pub files: Vec<Arc<ConfFile>>,
    /// Content of the options environment variable, if set.
    pub env_value: Option<String>,
    /// Command line arguments, without the program name.
    pub args: Vec<String>,
}

/// Run every stage over `options`.
pub(crate) fn resolve(mut options: Options, input: ResolveInput) -> Options {
    for file in &input.files {
        apply_file(&mut options, file);
    }

    if let Some(value) = &input.env_value {
        match env::split_args(value) {
            Ok(args) => cli::scan(&mut options, &args, ArgSource::Environment),
            Err(e) => options.report(&format!(
                "environment variable \"{}\" cannot be parsed: {e}.",
                options.environment_variable_name().unwrap_or_default()
            )),
        }
    }

    cli::scan(&mut options, &input.args, ArgSource::CommandLine);

    options.validate_all();
    options
}

fn apply_file(options: &mut Options, file: &ConfFile) {
    let path = file.descriptor().path().display();
    for (name, value) in file.parameters() {
        let Some(index) = options.registry().index_of(name) else {
            options.report(&format!(
                "unknown option \"{name}\" found in configuration file \"{path}\"."
            ));
            continue;
        };
        if !options
            .registry()
            .def(index)
            .has_flag(OptionFlags::CONFIGURATION_FILE)
        {
            options.report(&format!(
                "option \"{name}\" is not supported in configuration files (found in \"{path}\")."
            ));
            continue;
        }
        options.store(index, value);
    }
}

//! Argument scanning for the command line and the options environment variable.
//!
//! Tokens are read left to right:
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `--name`, `--name=value` | long option |
//! | `-abc` | short options `a`, `b`, `c`; only `c` may take the next token |
//! | `--` | every later token is an unnamed argument |
//! | `-`, anything else | unnamed argument, stored in the default option |
//!
//! An option that takes an argument consumes the following token unless it
//! starts with `-` (a lone `-` is a value). A `MULTIPLE` option consumes
//! every such token. Flags store `"true"`. Options with neither `REQUIRED`
//! nor `FLAG` take an optional argument and store `""` without one.
//!
//! Every defect (unknown option, option not allowed in this source, missing
//! argument) is reported and scanning continues with the next token.

use crate::option::{DEFAULT_OPTION_NAME, OptionDef, OptionFlags};
use crate::options::Options;

/// Where the arguments come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgSource {
    CommandLine,
    Environment,
}

impl ArgSource {
    fn flag(self) -> OptionFlags {
        match self {
            Self::CommandLine => OptionFlags::COMMAND_LINE,
            Self::Environment => OptionFlags::ENVIRONMENT_VARIABLE,
        }
    }

    fn location(self) -> &'static str {
        match self {
            Self::CommandLine => "on the command line",
            Self::Environment => "in the environment variable",
        }
    }
}

struct Scanner<'a> {
    options: &'a mut Options,
    args: &'a [String],
    pos: usize,
    source: ArgSource,
}

/// Apply `args` to `options`.
pub(crate) fn scan(options: &mut Options, args: &[String], source: ArgSource) {
    let mut scanner = Scanner {
        options,
        args,
        pos: 0,
        source,
    };
    scanner.run();
}

fn is_value(token: &str) -> bool {
    token == "-" || !token.starts_with('-')
}

impl<'a> Scanner<'a> {
    fn run(&mut self) {
        while let Some(token) = self.next() {
            if token == "--" {
                if !self.allows_unnamed("--") {
                    // Skip the rest so it is not read as options.
                    self.pos = self.args.len();
                    return;
                }
                while let Some(rest) = self.next() {
                    self.unnamed(rest);
                }
            } else if let Some(long) = token.strip_prefix("--") {
                self.long(long);
            } else if token.len() > 1
                && let Some(shorts) = token.strip_prefix('-')
            {
                self.shorts(shorts);
            } else {
                self.unnamed(token);
            }
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        let args = self.args;
        let token = args.get(self.pos)?;
        self.pos += 1;
        Some(token.as_str())
    }

    fn report(&self, message: String) {
        self.options.report(&message);
    }

    fn def(&self, index: usize) -> &OptionDef {
        self.options.registry().def(index)
    }

    /// Check that the option at `index` may be given from this source.
    fn allowed(&self, index: usize, display: &str) -> bool {
        if self.def(index).has_flag(self.source.flag()) {
            return true;
        }
        self.report(format!(
            "option {display} is not supported {}.",
            self.source.location()
        ));
        false
    }

    fn allows_unnamed(&self, token: &str) -> bool {
        let Some(default) = self.options.registry().default_option() else {
            self.report(format!(
                "no default options defined; we do not know what to do of \"{token}\"."
            ));
            return false;
        };
        self.allowed(default, &format!("\"{token}\""))
    }

    fn unnamed(&mut self, token: &str) {
        if self.allows_unnamed(token)
            && let Some(default) = self.options.registry().default_option()
        {
            self.options.store(default, token);
        }
    }

    fn long(&mut self, long: &str) {
        let (name, inline) = match long.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (long, None),
        };
        let display = format!("--{name}");
        let index = self
            .options
            .registry()
            .index_of(name)
            .filter(|&i| name != DEFAULT_OPTION_NAME && !self.def(i).is_short_only());
        let Some(index) = index else {
            self.report(format!("option {display} is not supported."));
            return;
        };
        let keep = self.allowed(index, &display);
        self.arguments(index, &display, inline, keep);
    }

    fn shorts(&mut self, shorts: &str) {
        let count = shorts.chars().count();
        for (n, c) in shorts.chars().enumerate() {
            let display = format!("-{c}");
            let Some(index) = self.options.registry().index_of_short(c) else {
                self.report(format!("option {display} is not supported."));
                continue;
            };
            let keep = self.allowed(index, &display);
            if n + 1 == count {
                self.arguments(index, &display, None, keep);
            } else {
                self.inline_short(index, &display, keep);
            }
        }
    }

    /// A short option inside a cluster cannot read the next token.
    fn inline_short(&mut self, index: usize, display: &str, keep: bool) {
        let target = self.options.registry().target(index);
        let flags = self.def(target).flags();
        if flags.contains(OptionFlags::REQUIRED) {
            self.report(format!("option {display} expects an argument."));
        } else if keep {
            let value = if flags.contains(OptionFlags::FLAG) { "true" } else { "" };
            self.options.store(index, value);
        }
    }

    /// Read the arguments of the option at `index`. With `keep` false the
    /// arguments are consumed and dropped.
    fn arguments(&mut self, index: usize, display: &str, inline: Option<&str>, keep: bool) {
        let target = self.options.registry().target(index);
        let flags = self.def(target).flags();

        if flags.contains(OptionFlags::FLAG) {
            if inline.is_some() {
                self.report(format!("option {display} cannot be given a value."));
            } else if keep {
                self.options.store(index, "true");
            }
            return;
        }

        let mut values: Vec<String> = inline.map(str::to_string).into_iter().collect();
        if inline.is_none() {
            let args = self.args;
            while let Some(token) = args.get(self.pos)
                && is_value(token)
            {
                values.push(token.clone());
                self.pos += 1;
                if !flags.contains(OptionFlags::MULTIPLE) {
                    break;
                }
            }
        }

        if values.is_empty() {
            if flags.contains(OptionFlags::REQUIRED) {
                // An ineligible option was already reported once.
                if keep {
                    self.report(format!("option {display} expects an argument."));
                }
                return;
            }
            values.push(String::new());
        }
        if keep {
            for value in &values {
                self.options.store(index, value);
            }
        }
    }
}

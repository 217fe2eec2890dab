//! Option definitions.
//!
//! An [`OptionDef`] declares one option: its long name, optional short name,
//! where it may be set from, and how many values it takes.
//!
//! ```ignore
//! let defs = vec![
//!     OptionDef::new("verbose")
//!         .with_short_name('v')
//!         .with_flags(OptionFlags::COMMAND_LINE | OptionFlags::FLAG),
//!     OptionDef::new("level")
//!         .with_flags(OptionFlags::ALL_SOURCES | OptionFlags::REQUIRED)
//!         .with_default("3")
//!         .with_validator("integer(1...5)"),
//!     OptionDef::new("--").with_flags(OptionFlags::COMMAND_LINE | OptionFlags::MULTIPLE),
//! ];
//! ```

use bitflags::bitflags;

/// Long name of the option that absorbs unnamed arguments.
pub const DEFAULT_OPTION_NAME: &str = "--";

bitflags! {
    /// Behavior of one option.
    ///
    /// The `GROUP1`, `GROUP2`, `SHOW_ALL`, and `SYSTEM` bits are only read by
    /// usage renderers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OptionFlags: u32 {
        /// May be given on the command line.
        const COMMAND_LINE = 1 << 0;
        /// May be given in the environment variable.
        const ENVIRONMENT_VARIABLE = 1 << 1;
        /// May be given in configuration files.
        const CONFIGURATION_FILE = 1 << 2;
        /// Always takes an argument.
        const REQUIRED = 1 << 3;
        /// Takes no argument.
        const FLAG = 1 << 4;
        /// Keeps every value instead of the last one.
        const MULTIPLE = 1 << 5;
        /// Absorbs unnamed arguments.
        const DEFAULT_OPTION = 1 << 6;
        /// Has a compiled default.
        const HAS_DEFAULT = 1 << 7;
        /// Stores into another option.
        const ALIAS = 1 << 8;
        /// Ignores writes until unlocked.
        const LOCK = 1 << 9;

        const GROUP1 = 1 << 16;
        const GROUP2 = 1 << 17;
        const SHOW_ALL = 1 << 18;
        const SYSTEM = 1 << 19;

        const ALL_SOURCES = Self::COMMAND_LINE.bits()
            | Self::ENVIRONMENT_VARIABLE.bits()
            | Self::CONFIGURATION_FILE.bits();
    }
}

impl OptionFlags {
    /// Flag names used in options-definition files.
    pub(crate) const NAMES: [(&'static str, OptionFlags); 13] = [
        ("command-line", Self::COMMAND_LINE),
        ("environment-variable", Self::ENVIRONMENT_VARIABLE),
        ("configuration-file", Self::CONFIGURATION_FILE),
        ("required", Self::REQUIRED),
        ("flag", Self::FLAG),
        ("multiple", Self::MULTIPLE),
        ("default-option", Self::DEFAULT_OPTION),
        ("alias", Self::ALIAS),
        ("locked", Self::LOCK),
        ("group1", Self::GROUP1),
        ("group2", Self::GROUP2),
        ("show-all", Self::SHOW_ALL),
        ("system", Self::SYSTEM),
    ];

    pub(crate) fn from_label(label: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == label)
            .map(|(_, flag)| *flag)
    }
}

/// Declaration of one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDef {
    name: String,
    short_name: Option<char>,
    flags: OptionFlags,
    default: Option<String>,
    help: Option<String>,
    validator: Option<String>,
    alias_of: Option<String>,
    separators: Vec<String>,
}

impl OptionDef {
    /// A definition with no flags set. Naming it [`DEFAULT_OPTION_NAME`]
    /// makes it the default option.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let flags = if name == DEFAULT_OPTION_NAME {
            OptionFlags::DEFAULT_OPTION
        } else {
            OptionFlags::empty()
        };
        Self {
            name,
            short_name: None,
            flags,
            default: None,
            help: None,
            validator: None,
            alias_of: None,
            separators: Vec::new(),
        }
    }

    pub fn with_short_name(mut self, short: char) -> Self {
        self.short_name = Some(short);
        self
    }

    /// Add `flags` to the definition.
    pub fn with_flags(mut self, flags: OptionFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the compiled default (also sets [`OptionFlags::HAS_DEFAULT`]).
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self.flags |= OptionFlags::HAS_DEFAULT;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach a validator by spec, e.g. `"integer(1...10)"`. The spec is
    /// resolved against the [`ValidatorRegistry`](crate::ValidatorRegistry)
    /// when the option set is built.
    pub fn with_validator(mut self, spec: impl Into<String>) -> Self {
        self.validator = Some(spec.into());
        self
    }

    /// Make this option an alias: values given for it are stored in `target`.
    pub fn with_alias_of(mut self, target: impl Into<String>) -> Self {
        self.alias_of = Some(target.into());
        self.flags |= OptionFlags::ALIAS;
        self
    }

    /// Strings that split one given value into several (requires `MULTIPLE`).
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> Option<char> {
        self.short_name
    }

    pub fn flags(&self) -> OptionFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: OptionFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn validator_spec(&self) -> Option<&str> {
        self.validator.as_deref()
    }

    pub fn alias_of(&self) -> Option<&str> {
        self.alias_of.as_deref()
    }

    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    pub fn is_default_option(&self) -> bool {
        self.flags.contains(OptionFlags::DEFAULT_OPTION)
    }

    /// A one-character name is only reachable through its short form.
    pub fn is_short_only(&self) -> bool {
        self.name.chars().count() == 1
    }

    pub(crate) fn set_help(&mut self, help: String) {
        self.help = Some(help);
    }

    pub(crate) fn set_default(&mut self, value: String) {
        self.default = Some(value);
        self.flags |= OptionFlags::HAS_DEFAULT;
    }

    pub(crate) fn set_validator_spec(&mut self, spec: String) {
        self.validator = Some(spec);
    }

    pub(crate) fn set_short_name(&mut self, short: char) {
        self.short_name = Some(short);
    }

    pub(crate) fn set_alias_of(&mut self, target: String) {
        self.alias_of = Some(target);
        self.flags |= OptionFlags::ALIAS;
    }

    pub(crate) fn add_flags(&mut self, flags: OptionFlags) {
        self.flags |= flags;
    }

    pub(crate) fn set_separators(&mut self, separators: Vec<String>) {
        self.separators = separators;
    }
}

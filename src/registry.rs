//! The catalog of option definitions for one program.
//!
//! [`OptionRegistry::new`] checks every registration rule up front and fails
//! with [`OptfigError::Logic`] on the first violation: these are mistakes in
//! the program's declarations, not in user input.
//!
//! Aliases are resolved to the index of their target here, so the rest of the
//! crate never follows names at resolution time.
//!
//! # Options-definition files
//!
//! Definitions can also come from `<dir>/<project>.ini`, one section per
//! option:
//!
//! ```text
//! [level]
//! shortname=l
//! allowed=command-line,configuration-file
//! flags=required
//! default=3
//! validator=integer(1...5)
//! help=Verbosity level
//! ```
//!
//! A section naming a declared option updates it; any other section adds an
//! option. Defects in the file are reported through the logger; the merged set
//! still goes through the registration rules.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::conf_file::{ConfFile, SECTION_SEPARATOR};
use crate::dialect::{Dialect, DialectDescriptor};
use crate::error::OptfigError;
use crate::logger::{Logger, Severity};
use crate::option::{DEFAULT_OPTION_NAME, OptionDef, OptionFlags};
use crate::validator::{Validator, ValidatorRegistry};

#[derive(Debug)]
struct Entry {
    def: OptionDef,
    validator: Option<Arc<dyn Validator>>,
    /// Index values are stored under; the entry itself unless it is an alias.
    target: usize,
}

/// Registered option definitions, indexed by long and short name.
#[derive(Debug)]
pub struct OptionRegistry {
    entries: Vec<Entry>,
    by_name: IndexMap<String, usize>,
    by_short: HashMap<char, usize>,
    default_option: Option<usize>,
}

impl OptionRegistry {
    /// Validate and index `defs`, building their validators from `validators`.
    pub fn new(defs: Vec<OptionDef>, validators: &ValidatorRegistry) -> Result<Self, OptfigError> {
        let mut registry = Self {
            entries: Vec::with_capacity(defs.len()),
            by_name: IndexMap::new(),
            by_short: HashMap::new(),
            default_option: None,
        };
        for def in defs {
            registry.insert(def, validators)?;
        }
        registry.resolve_aliases()?;
        Ok(registry)
    }

    fn insert(&mut self, def: OptionDef, validators: &ValidatorRegistry) -> Result<(), OptfigError> {
        let name = def.name();
        let logic = |msg: &str| OptfigError::logic(format!("option \"{name}\": {msg}"));

        if name.is_empty() {
            return Err(OptfigError::logic("an option must have a name"));
        }
        if name.starts_with('-') && name != DEFAULT_OPTION_NAME {
            return Err(logic("long names cannot start with '-'"));
        }
        if self.by_name.contains_key(name) {
            return Err(logic("defined more than once"));
        }

        let short = match (def.is_short_only(), def.short_name()) {
            (true, Some(c)) if name.starts_with(c) => Some(c),
            (true, Some(_)) => {
                return Err(logic("a one-character name must match its short name"));
            }
            (true, None) => name.chars().next(),
            (false, short) => short,
        };
        if let Some(c) = short {
            if c == '-' {
                return Err(logic("'-' cannot be used as a short name"));
            }
            if name == DEFAULT_OPTION_NAME {
                return Err(logic("the default option cannot have a short name"));
            }
            if self.by_short.contains_key(&c) {
                return Err(logic(&format!("short name '{c}' is already in use")));
            }
        }

        if def.is_short_only() && def.has_flag(OptionFlags::CONFIGURATION_FILE) {
            return Err(logic("configuration file options need a long name"));
        }
        if def.has_flag(OptionFlags::REQUIRED) && def.has_flag(OptionFlags::FLAG) {
            return Err(logic("an option cannot be both a flag and require an argument"));
        }
        if !def.separators().is_empty() && !def.has_flag(OptionFlags::MULTIPLE) {
            return Err(logic("separators need the multiple flag"));
        }
        if def.has_flag(OptionFlags::ALIAS) != def.alias_of().is_some() {
            return Err(logic("an alias needs exactly one target"));
        }
        if def.has_flag(OptionFlags::HAS_DEFAULT) != def.default_value().is_some() {
            return Err(logic("the has-default flag does not match the default value"));
        }

        if def.is_default_option() {
            if def.has_flag(OptionFlags::FLAG) {
                return Err(logic("the default option must take values"));
            }
            if let Some(existing) = self.default_option {
                let other = &self.entries[existing].def;
                let message = if other.has_flag(OptionFlags::MULTIPLE) != def.has_flag(OptionFlags::MULTIPLE) {
                    format!(
                        "mixes single and multiple values with default option \"{}\"",
                        other.name()
                    )
                } else {
                    format!("\"{}\" is already the default option", other.name())
                };
                return Err(logic(&message));
            }
        }

        let validator = def
            .validator_spec()
            .map(|spec| validators.create_from_spec(spec))
            .transpose()
            .map_err(|e| logic(&e.to_string()))?;

        let index = self.entries.len();
        if def.is_default_option() {
            self.default_option = Some(index);
        }
        if let Some(c) = short {
            self.by_short.insert(c, index);
        }
        self.by_name.insert(name.to_string(), index);
        self.entries.push(Entry {
            def,
            validator,
            target: index,
        });
        Ok(())
    }

    fn resolve_aliases(&mut self) -> Result<(), OptfigError> {
        for index in 0..self.entries.len() {
            let Some(target_name) = self.entries[index].def.alias_of() else {
                continue;
            };
            let name = self.entries[index].def.name();
            let target = *self.by_name.get(target_name).ok_or_else(|| {
                OptfigError::logic(format!(
                    "option \"{name}\": alias target \"{target_name}\" is not defined"
                ))
            })?;
            if self.entries[target].def.has_flag(OptionFlags::ALIAS) {
                return Err(OptfigError::logic(format!(
                    "option \"{name}\": alias target \"{target_name}\" is itself an alias"
                )));
            }
            self.entries[index].target = target;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the option named `name` (long name, or the name of a
    /// one-character option).
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn index_of_short(&self, short: char) -> Option<usize> {
        self.by_short.get(&short).copied()
    }

    pub fn def(&self, index: usize) -> &OptionDef {
        &self.entries[index].def
    }

    /// Index where values given for `index` are stored.
    pub fn target(&self, index: usize) -> usize {
        self.entries[index].target
    }

    pub fn default_option(&self) -> Option<usize> {
        self.default_option
    }

    pub fn validator(&self, index: usize) -> Option<&Arc<dyn Validator>> {
        self.entries[index].validator.as_ref()
    }

    pub(crate) fn set_validator(&mut self, index: usize, validator: Option<Arc<dyn Validator>>) {
        self.entries[index].validator = validator;
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDef> {
        self.entries.iter().map(|e| &e.def)
    }
}

/// Merge `<dir>/<project>.ini` into `defs`. A missing file is skipped.
pub(crate) fn merge_definitions_file(
    defs: &mut Vec<OptionDef>,
    dir: &Path,
    project: &str,
    logger: &dyn Logger,
) -> Result<(), OptfigError> {
    let descriptor = DialectDescriptor::new(dir.join(format!("{project}.ini")), Dialect::default());
    let file = ConfFile::load(&descriptor, logger)?;
    if !file.exists() {
        log::debug!("no options file at {}", descriptor.path().display());
        return Ok(());
    }
    let path = descriptor.path().display().to_string();

    let mut sections: IndexMap<&str, Vec<(&str, &str)>> = IndexMap::new();
    for (key, value) in file.parameters() {
        match key.rsplit_once(SECTION_SEPARATOR) {
            Some((option, field)) => sections.entry(option).or_default().push((field, value)),
            None => logger.log(
                Severity::Error,
                &format!("{path}: field \"{key}\" is outside of an option section."),
            ),
        }
    }

    for (option, fields) in sections {
        let index = match defs.iter().position(|d| d.name() == option) {
            Some(index) => index,
            None => {
                defs.push(OptionDef::new(option));
                defs.len() - 1
            }
        };
        for (field, value) in fields {
            if let Err(message) = apply_field(&mut defs[index], field, value) {
                logger.log(
                    Severity::Error,
                    &format!("{path}: option \"{option}\" field \"{field}\": {message}."),
                );
            }
        }
    }
    Ok(())
}

fn apply_field(def: &mut OptionDef, field: &str, value: &str) -> Result<(), String> {
    match field {
        "shortname" => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => def.set_short_name(c),
                _ => return Err(format!("\"{value}\" is not a single character")),
            }
        }
        "default" => def.set_default(value.to_string()),
        "help" => def.set_help(value.to_string()),
        "validator" => def.set_validator_spec(value.to_string()),
        "alias" => def.set_alias_of(value.to_string()),
        "allowed" => def.add_flags(flag_list(value, OptionFlags::ALL_SOURCES)?),
        "flags" => def.add_flags(flag_list(value, OptionFlags::all() - OptionFlags::ALL_SOURCES)?),
        "separators" => def.set_separators(
            value
                .split('|')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => return Err("unknown field".to_string()),
    }
    Ok(())
}

fn flag_list(value: &str, allowed: OptionFlags) -> Result<OptionFlags, String> {
    let mut flags = OptionFlags::empty();
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match OptionFlags::from_label(name) {
            Some(flag) if allowed.contains(flag) => flags |= flag,
            _ => return Err(format!("unknown flag \"{name}\"")),
        }
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::sample_definitions;
    use crate::logger::MessageCollector;
    use std::fs;
    use tempfile::TempDir;

    fn build(defs: Vec<OptionDef>) -> Result<OptionRegistry, OptfigError> {
        OptionRegistry::new(defs, &ValidatorRegistry::with_builtins())
    }

    fn assert_logic(defs: Vec<OptionDef>) {
        assert!(matches!(build(defs), Err(OptfigError::Logic(_))));
    }

    #[test]
    fn sample_registers() {
        let registry = build(sample_definitions()).unwrap();
        assert_eq!(registry.len(), sample_definitions().len());
        let verbose = registry.index_of("verbose").unwrap();
        assert_eq!(registry.index_of_short('v'), Some(verbose));
        assert!(registry.default_option().is_some());
    }

    #[test]
    fn empty_name_rejected() {
        assert_logic(vec![OptionDef::new("")]);
    }

    #[test]
    fn dash_prefixed_name_rejected() {
        assert_logic(vec![OptionDef::new("-x")]);
        assert_logic(vec![OptionDef::new("---")]);
    }

    #[test]
    fn dash_short_name_rejected() {
        assert_logic(vec![OptionDef::new("minus").with_short_name('-')]);
    }

    #[test]
    fn default_option_cannot_have_short_name() {
        assert_logic(vec![OptionDef::new("--").with_short_name('f')]);
    }

    #[test]
    fn two_default_options_rejected() {
        assert_logic(vec![
            OptionDef::new("--").with_flags(OptionFlags::MULTIPLE),
            OptionDef::new("files").with_flags(OptionFlags::DEFAULT_OPTION | OptionFlags::MULTIPLE),
        ]);
    }

    #[test]
    fn mixed_default_option_multiplicity_rejected() {
        let result = build(vec![
            OptionDef::new("--").with_flags(OptionFlags::MULTIPLE),
            OptionDef::new("file").with_flags(OptionFlags::DEFAULT_OPTION),
        ]);
        let Err(OptfigError::Logic(message)) = result else {
            panic!("expected a logic error");
        };
        assert!(message.contains("mixes single and multiple"), "{message}");
    }

    #[test]
    fn duplicate_names_rejected() {
        assert_logic(vec![OptionDef::new("alpha"), OptionDef::new("alpha")]);
        assert_logic(vec![
            OptionDef::new("alpha").with_short_name('a'),
            OptionDef::new("another").with_short_name('a'),
        ]);
    }

    #[test]
    fn short_only_option() {
        let registry = build(vec![OptionDef::new("q").with_flags(OptionFlags::COMMAND_LINE)]).unwrap();
        assert_eq!(registry.index_of_short('q'), Some(0));
        assert_logic(vec![OptionDef::new("q").with_short_name('z')]);
    }

    #[test]
    fn short_only_option_cannot_be_in_config_files() {
        assert_logic(vec![OptionDef::new("q").with_flags(OptionFlags::CONFIGURATION_FILE)]);
    }

    #[test]
    fn flag_and_required_conflict() {
        assert_logic(vec![
            OptionDef::new("both").with_flags(OptionFlags::FLAG | OptionFlags::REQUIRED),
        ]);
    }

    #[test]
    fn separators_need_multiple() {
        assert_logic(vec![OptionDef::new("list").with_separators([","])]);
    }

    #[test]
    fn bad_validator_is_logic_error() {
        assert_logic(vec![OptionDef::new("n").with_validator("integer(x)")]);
        assert_logic(vec![OptionDef::new("name").with_validator("nope")]);
    }

    #[test]
    fn alias_resolves_to_target_index() {
        let registry = build(vec![
            OptionDef::new("color"),
            OptionDef::new("colour").with_alias_of("color"),
        ])
        .unwrap();
        let colour = registry.index_of("colour").unwrap();
        assert_eq!(registry.target(colour), registry.index_of("color").unwrap());
    }

    #[test]
    fn alias_to_unknown_rejected() {
        assert_logic(vec![OptionDef::new("colour").with_alias_of("color")]);
    }

    #[test]
    fn chained_alias_rejected() {
        assert_logic(vec![
            OptionDef::new("color"),
            OptionDef::new("colour").with_alias_of("color"),
            OptionDef::new("kolor").with_alias_of("colour"),
        ]);
    }

    #[test]
    fn definitions_file_updates_and_adds() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tool.ini"),
            "[verbose]\nhelp=Talk more\n\n\
             [level]\nshortname=l\nallowed=command-line, configuration-file\n\
             flags=required\ndefault=3\nvalidator=integer(1...5)\n\n\
             [tags]\nallowed=command-line\nflags=multiple\nseparators=,|:|\n",
        )
        .unwrap();

        let mut defs = vec![OptionDef::new("verbose").with_flags(OptionFlags::FLAG)];
        let logger = MessageCollector::new();
        merge_definitions_file(&mut defs, dir.path(), "tool", &logger).unwrap();
        assert_eq!(logger.error_count(), 0, "{:?}", logger.errors());
        assert_eq!(defs.len(), 3);

        assert_eq!(defs[0].help(), Some("Talk more"));
        assert!(defs[0].has_flag(OptionFlags::FLAG));

        let level = &defs[1];
        assert_eq!(level.name(), "level");
        assert_eq!(level.short_name(), Some('l'));
        assert_eq!(
            level.flags(),
            OptionFlags::COMMAND_LINE
                | OptionFlags::CONFIGURATION_FILE
                | OptionFlags::REQUIRED
                | OptionFlags::HAS_DEFAULT
        );
        assert_eq!(level.default_value(), Some("3"));
        assert_eq!(level.validator_spec(), Some("integer(1...5)"));

        assert_eq!(defs[2].separators(), [",".to_string(), ":".to_string()]);

        build(vec![defs[0].clone(), defs[1].clone()]).unwrap();
    }

    #[test]
    fn definitions_file_defects_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tool.ini"),
            "stray=1\n[a-option]\nshortname=xy\nflags=bogus\ncolor=red\n",
        )
        .unwrap();
        let mut defs = Vec::new();
        let logger = MessageCollector::new();
        merge_definitions_file(&mut defs, dir.path(), "tool", &logger).unwrap();
        assert_eq!(logger.error_count(), 4, "{:?}", logger.errors());
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn missing_definitions_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let mut defs = vec![OptionDef::new("keep")];
        let logger = MessageCollector::new();
        merge_definitions_file(&mut defs, dir.path(), "tool", &logger).unwrap();
        assert!(logger.messages().is_empty());
        assert_eq!(defs.len(), 1);
    }
}

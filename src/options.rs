//! Resolved option values and the query surface.
//!
//! An [`Options`] is produced by [`OptfigBuilder::parse`](crate::OptfigBuilder::parse).
//! Each option owns an ordered list of string values. Options given without
//! the `MULTIPLE` flag hold at most one value.
//!
//! A compiled default is never stored. It is returned by the value accessors
//! when nothing was given, while [`Options::is_defined`] stays `false`.
//!
//! Asking about an option that was never declared, or with an empty name, is
//! a [`OptfigError::Logic`]; asking for a value that does not exist is an
//! [`OptfigError::Undefined`].

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::OptfigError;
use crate::logger::{Logger, Severity};
use crate::option::{OptionDef, OptionFlags};
use crate::registry::OptionRegistry;
use crate::types::ProjectInfo;
use crate::validator::Validator;

#[derive(Debug, Default, Clone)]
struct ValueStore {
    values: Vec<String>,
    locked: bool,
}

/// Resolved options of one program run.
pub struct Options {
    registry: OptionRegistry,
    stores: Vec<ValueStore>,
    logger: Arc<dyn Logger>,
    project: ProjectInfo,
    program_fullname: String,
    env_var: Option<String>,
    env_value: Option<String>,
    config_directories: Vec<PathBuf>,
    config_filenames: Vec<PathBuf>,
}

/// Everything about the run that is not an option value.
#[derive(Debug, Default, Clone)]
pub(crate) struct RunInfo {
    pub project: ProjectInfo,
    pub program_fullname: String,
    pub env_var: Option<String>,
    pub env_value: Option<String>,
    pub config_directories: Vec<PathBuf>,
    pub config_filenames: Vec<PathBuf>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<(&str, &[String])> = self
            .registry
            .iter()
            .zip(&self.stores)
            .map(|(def, store)| (def.name(), store.values.as_slice()))
            .collect();
        f.debug_struct("Options")
            .field("project", &self.project.name)
            .field("values", &values)
            .finish()
    }
}

impl Options {
    pub(crate) fn new(registry: OptionRegistry, logger: Arc<dyn Logger>, info: RunInfo) -> Self {
        let stores = registry
            .iter()
            .map(|def| ValueStore {
                values: Vec::new(),
                locked: def.has_flag(OptionFlags::LOCK),
            })
            .collect();
        Self {
            registry,
            stores,
            logger,
            project: info.project,
            program_fullname: info.program_fullname,
            env_var: info.env_var,
            env_value: info.env_value,
            config_directories: info.config_directories,
            config_filenames: info.config_filenames,
        }
    }

    pub(crate) fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    /// Report a content defect. Processing always continues.
    pub(crate) fn report(&self, message: &str) {
        self.logger.log(Severity::Error, message);
    }

    /// Store `value` for the option at `index` (or its alias target) and
    /// return how many values were added.
    ///
    /// Multi-value separators split the value; empty pieces are dropped.
    /// Single-valued options keep only the latest value. Locked options
    /// ignore the write.
    pub(crate) fn store(&mut self, index: usize, value: &str) -> usize {
        let target = self.registry.target(index);
        let def = self.registry.def(target);
        let store = &mut self.stores[target];
        if store.locked {
            log::debug!("option \"{}\" is locked, ignoring \"{value}\"", def.name());
            return 0;
        }
        if !def.has_flag(OptionFlags::MULTIPLE) {
            store.values.clear();
            store.values.push(value.to_string());
            return 1;
        }
        let mut pieces = vec![value];
        for sep in def.separators() {
            let sep = sep.as_str();
            pieces = pieces.into_iter().flat_map(move |p| p.split(sep)).collect();
        }
        let before = store.values.len();
        store
            .values
            .extend(pieces.into_iter().filter(|p| !p.is_empty()).map(str::to_string));
        store.values.len() - before
    }

    /// Check every stored value against its option's validator.
    pub(crate) fn validate_all(&self) {
        for index in 0..self.registry.len() {
            self.validate_option(index);
        }
    }

    fn validate_option(&self, index: usize) {
        let Some(validator) = self.registry.validator(index) else {
            return;
        };
        let name = self.registry.def(index).name();
        for value in &self.stores[index].values {
            if !validator.validate(value) {
                self.report(&format!(
                    "input \"{value}\" given to option \"{name}\" is not valid for the {} validator.",
                    validator.name()
                ));
            }
        }
    }

    /// Index of the value store backing `name`.
    fn index(&self, name: &str) -> Result<usize, OptfigError> {
        if name.is_empty() {
            return Err(OptfigError::logic("an option name cannot be empty"));
        }
        self.registry
            .index_of(name)
            .map(|index| self.registry.target(index))
            .ok_or_else(|| OptfigError::logic(format!("option \"{name}\" is not defined")))
    }

    /// Whether `name` was declared.
    pub fn has_option(&self, name: &str) -> bool {
        self.registry.index_of(name).is_some()
    }

    /// Whether a value was actually given for `name`. Defaults do not count.
    pub fn is_defined(&self, name: &str) -> Result<bool, OptfigError> {
        Ok(!self.stores[self.index(name)?].values.is_empty())
    }

    /// Number of stored values. Defaults do not count.
    pub fn size(&self, name: &str) -> Result<usize, OptfigError> {
        Ok(self.stores[self.index(name)?].values.len())
    }

    /// The value at `idx`, or the default when nothing was given and `idx` is 0.
    pub fn get_string(&self, name: &str, idx: usize) -> Result<&str, OptfigError> {
        let index = self.index(name)?;
        let values = &self.stores[index].values;
        if values.is_empty() {
            return match self.registry.def(index).default_value() {
                Some(default) if idx == 0 => Ok(default),
                Some(_) => Err(OptfigError::undefined(format!(
                    "option \"{name}\" only has a default value, index {idx} does not exist"
                ))),
                None => Err(OptfigError::undefined(format!(
                    "option \"{name}\" is not defined and has no default"
                ))),
            };
        }
        values.get(idx).map(String::as_str).ok_or_else(|| {
            OptfigError::undefined(format!(
                "option \"{name}\" has {} value(s), index {idx} does not exist",
                values.len()
            ))
        })
    }

    /// Every stored value, or the default alone when nothing was given.
    pub fn get_strings(&self, name: &str) -> Result<Vec<&str>, OptfigError> {
        let index = self.index(name)?;
        let values = &self.stores[index].values;
        if values.is_empty() {
            return Ok(self.registry.def(index).default_value().into_iter().collect());
        }
        Ok(values.iter().map(String::as_str).collect())
    }

    /// The value at `idx` as a 64-bit integer.
    ///
    /// A value that is not a valid integer is reported and `-1` is returned.
    pub fn get_long(&self, name: &str, idx: usize) -> Result<i64, OptfigError> {
        let value = self.get_string(name, idx)?;
        Ok(value.trim().parse::<i64>().unwrap_or_else(|_| {
            self.report(&format!(
                "invalid number ({value}) in parameter --{name}."
            ));
            -1
        }))
    }

    /// Like [`get_long`](Self::get_long), also reporting values outside
    /// `min..=max` and returning `-1` for them.
    pub fn get_long_in_range(
        &self,
        name: &str,
        idx: usize,
        min: i64,
        max: i64,
    ) -> Result<i64, OptfigError> {
        let value = self.get_string(name, idx)?;
        let Ok(number) = value.trim().parse::<i64>() else {
            self.report(&format!("invalid number ({value}) in parameter --{name}."));
            return Ok(-1);
        };
        if number < min || number > max {
            self.report(&format!(
                "{number} is out of bounds ({min}..{max} inclusive) in parameter --{name}."
            ));
            return Ok(-1);
        }
        Ok(number)
    }

    /// The value at `idx` converted with [`FromStr`].
    pub fn value_as<T>(&self, name: &str, idx: usize) -> Result<T, OptfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self.get_string(name, idx)?;
        value.parse::<T>().map_err(|e| OptfigError::InvalidValue {
            option: name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn has_default(&self, name: &str) -> Result<bool, OptfigError> {
        let index = self.index(name)?;
        Ok(self.registry.def(index).default_value().is_some())
    }

    pub fn get_default(&self, name: &str) -> Result<&str, OptfigError> {
        let index = self.index(name)?;
        self.registry
            .def(index)
            .default_value()
            .ok_or_else(|| OptfigError::undefined(format!("option \"{name}\" has no default")))
    }

    /// Ignore further writes to `name` until [`unlock`](Self::unlock).
    pub fn lock(&mut self, name: &str) -> Result<(), OptfigError> {
        let index = self.index(name)?;
        self.stores[index].locked = true;
        Ok(())
    }

    pub fn unlock(&mut self, name: &str) -> Result<(), OptfigError> {
        let index = self.index(name)?;
        self.stores[index].locked = false;
        Ok(())
    }

    pub fn is_locked(&self, name: &str) -> Result<bool, OptfigError> {
        Ok(self.stores[self.index(name)?].locked)
    }

    /// Add a value as if it had been given on the command line.
    pub fn add_value(&mut self, name: &str, value: &str) -> Result<(), OptfigError> {
        let index = self.index(name)?;
        let added = self.store(index, value);
        let values = &self.stores[index].values;
        for value in &values[values.len() - added..] {
            self.validate_value(index, value);
        }
        Ok(())
    }

    /// Replace the value at `idx`, or append when `idx` equals the count.
    pub fn set_value(&mut self, name: &str, idx: usize, value: &str) -> Result<(), OptfigError> {
        let index = self.index(name)?;
        let multiple = self.registry.def(index).has_flag(OptionFlags::MULTIPLE);
        let store = &mut self.stores[index];
        if store.locked {
            log::debug!("option \"{name}\" is locked, ignoring \"{value}\"");
            return Ok(());
        }
        if idx > 0 && !multiple {
            return Err(OptfigError::logic(format!(
                "option \"{name}\" takes a single value, index {idx} is invalid"
            )));
        }
        match idx.cmp(&store.values.len()) {
            std::cmp::Ordering::Less => store.values[idx] = value.to_string(),
            std::cmp::Ordering::Equal => store.values.push(value.to_string()),
            std::cmp::Ordering::Greater => {
                return Err(OptfigError::undefined(format!(
                    "option \"{name}\" has {} value(s), index {idx} cannot be set",
                    store.values.len()
                )));
            }
        }
        self.validate_value(index, value);
        Ok(())
    }

    /// Drop every stored value of `name` (unless locked).
    pub fn reset(&mut self, name: &str) -> Result<(), OptfigError> {
        let index = self.index(name)?;
        let store = &mut self.stores[index];
        if store.locked {
            log::debug!("option \"{name}\" is locked, not resetting");
        } else {
            store.values.clear();
        }
        Ok(())
    }

    /// Replace the validator of `name` and check the stored values against it.
    pub fn set_validator(
        &mut self,
        name: &str,
        validator: Option<Arc<dyn Validator>>,
    ) -> Result<(), OptfigError> {
        let index = self.index(name)?;
        self.registry.set_validator(index, validator);
        self.validate_option(index);
        Ok(())
    }

    fn validate_value(&self, index: usize, value: &str) {
        if let Some(validator) = self.registry.validator(index)
            && !validator.validate(value)
        {
            self.report(&format!(
                "input \"{value}\" given to option \"{}\" is not valid for the {} validator.",
                self.registry.def(index).name(),
                validator.name()
            ));
        }
    }

    /// Program name without its directory.
    pub fn program_name(&self) -> &str {
        Path::new(&self.program_fullname)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.program_fullname.as_str())
    }

    /// Program name as given in the first argument.
    pub fn program_fullname(&self) -> &str {
        &self.program_fullname
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn environment_variable_name(&self) -> Option<&str> {
        self.env_var.as_deref()
    }

    /// Content of the options environment variable, if it was set.
    pub fn environment_variable_value(&self) -> Option<&str> {
        self.env_value.as_deref()
    }

    pub fn config_directories(&self) -> &[PathBuf] {
        &self.config_directories
    }

    /// Every candidate configuration file, whether it exists or not.
    pub fn config_filenames(&self) -> &[PathBuf] {
        &self.config_filenames
    }

    pub fn definitions(&self) -> impl Iterator<Item = &OptionDef> {
        self.registry.iter()
    }
}

//! Pluggable value validators.
//!
//! A [`ValidatorRegistry`] maps a name to a factory that turns constructor
//! parameters into a [`Validator`]. Option definitions refer to validators by
//! spec string, `name(param, param, ...)` or just `name`:
//!
//! | Spec | Accepts |
//! |------|---------|
//! | `integer(1...5, 8)` | 64-bit integers 1 to 5, or 8 |
//! | `double(0.0...1.0)` | floating point values in range |
//! | `length(3...20)` | values of 3 to 20 characters |
//! | `regex("^[a-z]+$")` | values matching the expression |
//! | `regex("/^yes$/i")` | same, case-insensitive |
//! | `keywords(low, high)` | one of the listed words |
//!
//! Parameters are separated by commas; wrap a parameter in double quotes to
//! keep commas or parentheses in it.
//!
//! Validation is advisory. A failure is reported through the logger and the
//! value is stored anyway.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::OptfigError;

/// A value checker built from constructor parameters.
pub trait Validator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn validate(&self, value: &str) -> bool;
}

type Factory = Box<dyn Fn(&[String]) -> Result<Arc<dyn Validator>, OptfigError> + Send + Sync>;

/// Name-keyed set of validator factories.
pub struct ValidatorRegistry {
    factories: HashMap<String, Factory>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ValidatorRegistry")
            .field("factories", &names)
            .finish()
    }
}

impl ValidatorRegistry {
    /// A registry with no factories.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding `integer`, `double`, `length`, `regex`, and `keywords`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        let builtins: [(&str, Factory); 5] = [
            ("integer", Box::new(|p| Ok(Arc::new(RangeValidator::<i64>::new("integer", p)?)))),
            ("double", Box::new(|p| Ok(Arc::new(RangeValidator::<f64>::new("double", p)?)))),
            ("length", Box::new(|p| Ok(Arc::new(LengthValidator::new(p)?)))),
            ("regex", Box::new(|p| Ok(Arc::new(RegexValidator::new(p)?)))),
            ("keywords", Box::new(|p| Ok(Arc::new(KeywordsValidator::new(p)?)))),
        ];
        for (name, factory) in builtins {
            registry.factories.insert(name.to_string(), factory);
        }
        registry
    }

    /// Add a factory. Registering a name twice is a logic error.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), OptfigError>
    where
        F: Fn(&[String]) -> Result<Arc<dyn Validator>, OptfigError> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(OptfigError::logic(format!(
                "validator \"{name}\" is already registered"
            )));
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the validator `name` with `params`.
    pub fn create(&self, name: &str, params: &[String]) -> Result<Arc<dyn Validator>, OptfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| OptfigError::logic(format!("unknown validator \"{name}\"")))?;
        factory(params)
    }

    /// Build a validator from a `name(param, ...)` spec string.
    pub fn create_from_spec(&self, spec: &str) -> Result<Arc<dyn Validator>, OptfigError> {
        let (name, params) = parse_spec(spec)?;
        self.create(&name, &params)
    }
}

fn parse_spec(spec: &str) -> Result<(String, Vec<String>), OptfigError> {
    let spec = spec.trim();
    let Some(open) = spec.find('(') else {
        if spec.is_empty() {
            return Err(OptfigError::logic("empty validator spec"));
        }
        return Ok((spec.to_string(), Vec::new()));
    };
    let inner = spec[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| OptfigError::logic(format!("validator spec \"{spec}\" is missing its ')'")))?;
    let name = spec[..open].trim().to_string();
    if name.is_empty() {
        return Err(OptfigError::logic(format!("validator spec \"{spec}\" has no name")));
    }
    Ok((name, split_params(inner)))
}

/// Split on commas outside double quotes; quotes are removed.
fn split_params(inner: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in inner.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => params.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !params.is_empty() {
        params.push(current.trim().to_string());
    }
    params
}

/// Parse `a` or `a...b` into an inclusive range.
fn parse_range<T>(validator: &str, param: &str) -> Result<(T, T), OptfigError>
where
    T: FromStr + PartialOrd + Copy,
{
    let parse = |s: &str| {
        s.trim().parse::<T>().map_err(|_| {
            OptfigError::logic(format!(
                "invalid {validator} validator parameter \"{param}\""
            ))
        })
    };
    let (min, max) = match param.split_once("...") {
        Some((min, max)) => (parse(min)?, parse(max)?),
        None => {
            let v = parse(param)?;
            (v, v)
        }
    };
    if min > max {
        return Err(OptfigError::logic(format!(
            "{validator} validator range \"{param}\" has its minimum above its maximum"
        )));
    }
    Ok((min, max))
}

/// Numeric values within any of a list of inclusive ranges.
#[derive(Debug)]
pub struct RangeValidator<T> {
    name: &'static str,
    ranges: Vec<(T, T)>,
}

impl<T> RangeValidator<T>
where
    T: FromStr + PartialOrd + Copy,
{
    pub fn new(name: &'static str, params: &[String]) -> Result<Self, OptfigError> {
        let ranges = params
            .iter()
            .map(|p| parse_range(name, p))
            .collect::<Result<_, _>>()?;
        Ok(Self { name, ranges })
    }
}

impl<T> Validator for RangeValidator<T>
where
    T: FromStr + PartialOrd + Copy + Send + Sync + fmt::Debug,
{
    fn name(&self) -> &str {
        self.name
    }

    fn validate(&self, value: &str) -> bool {
        let Ok(v) = value.parse::<T>() else {
            return false;
        };
        self.ranges.is_empty() || self.ranges.iter().any(|(min, max)| *min <= v && v <= *max)
    }
}

/// Character counts within any of a list of inclusive ranges.
#[derive(Debug)]
pub struct LengthValidator {
    ranges: Vec<(usize, usize)>,
}

impl LengthValidator {
    pub fn new(params: &[String]) -> Result<Self, OptfigError> {
        let ranges = params
            .iter()
            .map(|p| parse_range("length", p))
            .collect::<Result<_, _>>()?;
        Ok(Self { ranges })
    }
}

impl Validator for LengthValidator {
    fn name(&self) -> &str {
        "length"
    }

    fn validate(&self, value: &str) -> bool {
        let len = value.chars().count();
        self.ranges.is_empty() || self.ranges.iter().any(|(min, max)| *min <= len && len <= *max)
    }
}

#[derive(Debug)]
pub struct RegexValidator {
    regex: Regex,
}

impl RegexValidator {
    /// One parameter: a pattern, or `/pattern/i` for case-insensitive matching.
    pub fn new(params: &[String]) -> Result<Self, OptfigError> {
        let [pattern] = params else {
            return Err(OptfigError::logic(
                "the regex validator takes exactly one parameter",
            ));
        };
        let (pattern, insensitive) = match pattern.strip_prefix('/').and_then(|p| p.rsplit_once('/')) {
            Some((body, "i")) => (body, true),
            Some((body, "")) => (body, false),
            Some((_, flags)) => {
                return Err(OptfigError::logic(format!(
                    "unsupported regex validator flags \"{flags}\""
                )));
            }
            None => (pattern.as_str(), false),
        };
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(insensitive)
            .build()
            .map_err(|e| OptfigError::logic(format!("invalid regex validator: {e}")))?;
        Ok(Self { regex })
    }
}

impl Validator for RegexValidator {
    fn name(&self) -> &str {
        "regex"
    }

    fn validate(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

#[derive(Debug)]
pub struct KeywordsValidator {
    words: Vec<String>,
}

impl KeywordsValidator {
    pub fn new(params: &[String]) -> Result<Self, OptfigError> {
        if params.is_empty() {
            return Err(OptfigError::logic(
                "the keywords validator needs at least one keyword",
            ));
        }
        Ok(Self {
            words: params.to_vec(),
        })
    }
}

impl Validator for KeywordsValidator {
    fn name(&self) -> &str {
        "keywords"
    }

    fn validate(&self, value: &str) -> bool {
        self.words.iter().any(|w| w == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(spec: &str) -> Arc<dyn Validator> {
        ValidatorRegistry::with_builtins()
            .create_from_spec(spec)
            .unwrap()
    }

    #[test]
    fn integer_ranges_and_singles() {
        let v = create("integer(1, 2, 5...6, 8)");
        assert_eq!(v.name(), "integer");
        for ok in ["1", "2", "5", "6", "8"] {
            assert!(v.validate(ok), "{ok}");
        }
        for bad in ["0", "3", "7", "51", "abc", "", "2.5"] {
            assert!(!v.validate(bad), "{bad}");
        }
    }

    #[test]
    fn integer_without_params_accepts_any_i64() {
        let v = create("integer");
        assert!(v.validate("-9223372036854775808"));
        assert!(!v.validate("9223372036854775808"));
    }

    #[test]
    fn negative_integer_range() {
        let v = create("integer(-10...-5)");
        assert!(v.validate("-7"));
        assert!(!v.validate("-4"));
    }

    #[test]
    fn double_range() {
        let v = create("double(0.5...1.5)");
        assert!(v.validate("1"));
        assert!(v.validate("0.75"));
        assert!(!v.validate("2.0"));
    }

    #[test]
    fn length_range() {
        let v = create("length(2...4)");
        assert!(v.validate("abc"));
        assert!(v.validate("日本"));
        assert!(!v.validate("a"));
        assert!(!v.validate("abcde"));
    }

    #[test]
    fn regex_plain_and_insensitive() {
        let v = create("regex(\"^[a-z]{1,3}$\")");
        assert!(v.validate("abc"));
        assert!(!v.validate("ABC"));

        let v = create("regex(\"/^yes$/i\")");
        assert!(v.validate("YES"));
        assert!(!v.validate("no"));
    }

    #[test]
    fn keywords() {
        let v = create("keywords(low, medium, high)");
        assert!(v.validate("medium"));
        assert!(!v.validate("extreme"));
    }

    #[test]
    fn bad_specs_are_logic_errors() {
        let registry = ValidatorRegistry::with_builtins();
        for spec in [
            "",
            "nonexistent",
            "integer(1",
            "integer(abc)",
            "integer(5...1)",
            "regex()",
            "regex(\"(\")",
            "regex(\"/x/q\")",
            "keywords()",
            "(1)",
        ] {
            assert!(
                matches!(registry.create_from_spec(spec), Err(OptfigError::Logic(_))),
                "{spec}"
            );
        }
    }

    #[derive(Debug)]
    struct Even;

    impl Validator for Even {
        fn name(&self) -> &str {
            "even"
        }

        fn validate(&self, value: &str) -> bool {
            value.parse::<i64>().is_ok_and(|v| v % 2 == 0)
        }
    }

    #[test]
    fn custom_factory() {
        let mut registry = ValidatorRegistry::empty();
        registry
            .register("even", |_| Ok(Arc::new(Even) as Arc<dyn Validator>))
            .unwrap();
        assert!(registry.contains("even"));
        let v = registry.create_from_spec("even").unwrap();
        assert!(v.validate("4"));
        assert!(!v.validate("5"));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ValidatorRegistry::with_builtins();
        let result = registry.register("integer", |_| Ok(Arc::new(Even) as Arc<dyn Validator>));
        assert!(matches!(result, Err(OptfigError::Logic(_))));
    }

    #[test]
    fn params_split_respects_quotes() {
        assert_eq!(split_params("a, \"b,c\" , d"), vec!["a", "b,c", "d"]);
        assert!(split_params("").is_empty());
    }
}

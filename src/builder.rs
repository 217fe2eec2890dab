use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::ConfCache;
use crate::dialect::Dialect;
use crate::env::{EnvSource, StdEnv};
use crate::error::OptfigError;
use crate::file;
use crate::logger::{Logger, StderrLogger};
use crate::option::OptionDef;
use crate::options::{Options, RunInfo};
use crate::registry::{self, OptionRegistry};
use crate::resolve::{self, ResolveInput};
use crate::types::{ProjectInfo, SearchMode, SearchPath};
use crate::validator::ValidatorRegistry;

/// Entry point for building an option set.
pub struct Optfig;

impl Optfig {
    pub fn builder() -> OptfigBuilder {
        OptfigBuilder::new()
    }
}

/// Builder for declaring options and resolving them from every source.
///
/// Configuration files are controlled by three settings:
///
/// - **Names**: [`config_file()`](Self::config_file), relative names are
///   searched for, absolute ones are used as is.
/// - **Discovery**: [`search_paths()`](Self::search_paths), where to look.
/// - **Resolution**: [`search_mode()`](Self::search_mode), merge all or pick one.
pub struct OptfigBuilder {
    project: ProjectInfo,
    definitions: Vec<OptionDef>,
    env_var: Option<String>,
    config_files: Vec<String>,
    search_paths: Option<Vec<SearchPath>>,
    search_mode: SearchMode,
    dialect: Dialect,
    options_files_dir: Option<PathBuf>,
    validators: Option<ValidatorRegistry>,
    logger: Option<Arc<dyn Logger>>,
    cache: Option<Arc<ConfCache>>,
    env_source: Box<dyn EnvSource>,
}

impl OptfigBuilder {
    fn new() -> Self {
        Self {
            project: ProjectInfo::default(),
            definitions: Vec::new(),
            env_var: None,
            config_files: Vec::new(),
            search_paths: None,
            search_mode: SearchMode::default(),
            dialect: Dialect::default(),
            options_files_dir: None,
            validators: None,
            logger: None,
            cache: None,
            env_source: Box::new(StdEnv),
        }
    }

    /// Set the project name (required). Used for the platform config
    /// directory and the options-definition file name.
    pub fn project_name(mut self, name: &str) -> Self {
        self.project.name = name.to_string();
        self
    }

    /// Replace the option definitions.
    pub fn options(mut self, definitions: Vec<OptionDef>) -> Self {
        self.definitions = definitions;
        self
    }

    /// Add one option definition.
    pub fn option(mut self, definition: OptionDef) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Name of the environment variable holding extra arguments.
    pub fn env_var(mut self, name: &str) -> Self {
        self.env_var = Some(name.to_string());
        self
    }

    /// Add a configuration file name.
    pub fn config_file(mut self, name: &str) -> Self {
        self.config_files.push(name.to_string());
        self
    }

    pub fn config_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_files.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replace the default search paths entirely.
    ///
    /// Paths are listed in **priority-ascending** order: in
    /// [`Merge`](SearchMode::Merge) mode the last file found wins for
    /// single-valued options.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path without replacing the defaults.
    /// If no paths have been set yet, starts from the default `[Platform]`.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(|| vec![SearchPath::Platform])
            .push(path);
        self
    }

    /// Set the search mode (default: [`SearchMode::Merge`]).
    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Dialect used for every configuration file.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Directory holding `<project_name>.ini` option definitions.
    pub fn options_files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options_files_dir = Some(dir.into());
        self
    }

    pub fn help_header(mut self, text: &str) -> Self {
        self.project.help_header = Some(text.to_string());
        self
    }

    pub fn help_footer(mut self, text: &str) -> Self {
        self.project.help_footer = Some(text.to_string());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.project.version = Some(version.to_string());
        self
    }

    pub fn license(mut self, license: &str) -> Self {
        self.project.license = Some(license.to_string());
        self
    }

    pub fn copyright(mut self, copyright: &str) -> Self {
        self.project.copyright = Some(copyright.to_string());
        self
    }

    pub fn build_date(mut self, date: &str) -> Self {
        self.project.build_date = Some(date.to_string());
        self
    }

    pub fn build_time(mut self, time: &str) -> Self {
        self.project.build_time = Some(time.to_string());
        self
    }

    /// Validator factories (default: [`ValidatorRegistry::with_builtins`]).
    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = Some(validators);
        self
    }

    /// Where defects are reported (default: [`StderrLogger`]).
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Share a configuration file cache between several parses. Without
    /// one, each parse uses a fresh cache.
    pub fn cache(mut self, cache: Arc<ConfCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Where the options environment variable is read (default: the process
    /// environment).
    pub fn env_source(mut self, source: impl EnvSource + 'static) -> Self {
        self.env_source = Box::new(source);
        self
    }

    fn effective_search_paths(&self) -> Vec<SearchPath> {
        if let Some(paths) = &self.search_paths {
            return paths.clone();
        }
        vec![SearchPath::Platform]
    }

    /// Resolve options from every source. `args` starts with the program
    /// name, like [`std::env::args`].
    ///
    /// Declaration mistakes and dialect conflicts are errors. Defects in
    /// files, the environment variable, or arguments are reported through
    /// the logger and skipped.
    pub fn parse<I, S>(self, args: I) -> Result<Options, OptfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.project.name.is_empty() {
            return Err(OptfigError::logic(
                "a project name is required, call .project_name()",
            ));
        }
        let search_paths = self.effective_search_paths();
        let Self {
            project,
            mut definitions,
            env_var,
            config_files,
            search_mode,
            dialect,
            options_files_dir,
            validators,
            logger,
            cache,
            env_source,
            ..
        } = self;

        let logger = logger.unwrap_or_else(|| Arc::new(StderrLogger));
        if let Some(dir) = &options_files_dir {
            registry::merge_definitions_file(&mut definitions, dir, &project.name, logger.as_ref())?;
        }
        let registry = OptionRegistry::new(definitions, &validators.unwrap_or_default())?;

        let dirs = file::expand_search_paths(&search_paths, &project.name);
        let candidates = file::candidate_files(&config_files, &dirs);
        let cache = cache.unwrap_or_default();
        let files = file::load_config_files(&candidates, dialect, search_mode, &cache, logger.as_ref())?;

        let env_value = env_var.as_deref().and_then(|name| env_source.get(name));

        let mut args = args.into_iter().map(Into::into);
        let program_fullname = args.next().unwrap_or_default();
        let info = RunInfo {
            project,
            program_fullname,
            env_var,
            env_value: env_value.clone(),
            config_directories: dirs,
            config_filenames: candidates,
        };
        let input = ResolveInput {
            files,
            env_value,
            args: args.collect(),
        };
        Ok(resolve::resolve(Options::new(registry, logger, info), input))
    }

    /// [`parse`](Self::parse) the process arguments.
    pub fn parse_env_args(self) -> Result<Options, OptfigError> {
        self.parse(std::env::args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::LineContinuation;
    use crate::env::MapEnv;
    use crate::fixtures::test::sample_definitions;
    use crate::logger::MessageCollector;
    use crate::option::OptionFlags;
    use std::fs;
    use tempfile::TempDir;

    fn base(dir: &TempDir, logger: &Arc<MessageCollector>) -> OptfigBuilder {
        Optfig::builder()
            .project_name("tool")
            .options(sample_definitions())
            .search_paths(vec![SearchPath::Path(dir.path().to_path_buf())])
            .config_file("tool.conf")
            .env_source(MapEnv::new())
            .logger(logger.clone())
    }

    #[test]
    fn search_mode_defaults_to_merge() {
        let builder = Optfig::builder();
        assert_eq!(builder.search_mode, SearchMode::Merge);
        assert_eq!(builder.effective_search_paths(), vec![SearchPath::Platform]);
    }

    #[test]
    fn search_paths_replace() {
        let builder = Optfig::builder().search_paths(vec![SearchPath::Cwd]);
        assert_eq!(builder.effective_search_paths(), vec![SearchPath::Cwd]);
    }

    #[test]
    fn add_search_path_appends_to_defaults() {
        let builder = Optfig::builder().add_search_path(SearchPath::Cwd);
        assert_eq!(
            builder.effective_search_paths(),
            vec![SearchPath::Platform, SearchPath::Cwd]
        );
    }

    #[test]
    fn missing_project_name_errors() {
        let result = Optfig::builder().parse(["tool"]);
        assert!(matches!(result, Err(OptfigError::Logic(_))));
    }

    #[test]
    fn bad_definitions_error() {
        let result = Optfig::builder()
            .project_name("tool")
            .option(OptionDef::new("-bad"))
            .env_source(MapEnv::new())
            .parse(["tool"]);
        assert!(matches!(result, Err(OptfigError::Logic(_))));
    }

    #[test]
    fn all_sources_combined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tool.conf"), "tag=a\nlevel=1\noutput=file.txt\n").unwrap();
        let logger = Arc::new(MessageCollector::new());

        let options = base(&dir, &logger)
            .env_var("TOOL_OPTIONS")
            .env_source(MapEnv::from_pairs([("TOOL_OPTIONS", "--tag b -l 2")]))
            .parse(["/usr/bin/tool", "--tag", "c", "-v", "input.txt"])
            .unwrap();

        assert_eq!(logger.error_count(), 0, "{:?}", logger.errors());
        assert_eq!(options.get_strings("tag").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(options.get_long("level", 0).unwrap(), 2);
        assert_eq!(options.get_string("output", 0).unwrap(), "file.txt");
        assert!(options.is_defined("verbose").unwrap());
        assert_eq!(options.get_strings("--").unwrap(), vec!["input.txt"]);

        assert_eq!(options.program_name(), "tool");
        assert_eq!(options.environment_variable_name(), Some("TOOL_OPTIONS"));
        assert_eq!(options.environment_variable_value(), Some("--tag b -l 2"));
        assert_eq!(options.config_directories(), [dir.path().to_path_buf()]);
        assert_eq!(options.config_filenames(), [dir.path().join("tool.conf")]);
    }

    #[test]
    fn unset_env_var_is_ignored() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(MessageCollector::new());
        let options = base(&dir, &logger)
            .env_var("TOOL_OPTIONS")
            .parse(["tool"])
            .unwrap();
        assert_eq!(options.environment_variable_value(), None);
        assert!(logger.messages().is_empty());
    }

    #[test]
    fn first_match_uses_first_file_only() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("tool.conf"), "level=1\n").unwrap();
        fs::write(dir2.path().join("tool.conf"), "level=2\ncolor=red\n").unwrap();
        let logger = Arc::new(MessageCollector::new());

        let options = base(&dir1, &logger)
            .search_paths(vec![
                SearchPath::Path(dir1.path().to_path_buf()),
                SearchPath::Path(dir2.path().to_path_buf()),
            ])
            .search_mode(SearchMode::FirstMatch)
            .parse(["tool"])
            .unwrap();
        assert_eq!(options.get_string("level", 0).unwrap(), "1");
        assert!(!options.is_defined("color").unwrap());
    }

    #[test]
    fn merge_mode_later_file_wins() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("tool.conf"), "level=1\ncolor=red\n").unwrap();
        fs::write(dir2.path().join("tool.conf"), "level=2\n").unwrap();
        let logger = Arc::new(MessageCollector::new());

        let options = base(&dir1, &logger)
            .search_paths(vec![
                SearchPath::Path(dir1.path().to_path_buf()),
                SearchPath::Path(dir2.path().to_path_buf()),
            ])
            .parse(["tool"])
            .unwrap();
        assert_eq!(options.get_string("level", 0).unwrap(), "2");
        assert_eq!(options.get_string("color", 0).unwrap(), "red");
    }

    #[test]
    fn absolute_config_file_bypasses_search() {
        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let path = elsewhere.path().join("custom.conf");
        fs::write(&path, "level=4\n").unwrap();
        let logger = Arc::new(MessageCollector::new());

        let options = base(&dir, &logger)
            .config_file(path.to_str().unwrap())
            .parse(["tool"])
            .unwrap();
        assert_eq!(options.get_string("level", 0).unwrap(), "4");
        assert!(options.config_filenames().contains(&path));
    }

    #[test]
    fn configured_dialect_applies() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tool.conf"), "output=one \\\ntwo\n").unwrap();
        let logger = Arc::new(MessageCollector::new());

        let options = base(&dir, &logger)
            .dialect(Dialect::new(LineContinuation::Unix))
            .parse(["tool"])
            .unwrap();
        assert_eq!(options.get_string("output", 0).unwrap(), "one two");
    }

    #[test]
    fn shared_cache_rejects_dialect_change() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tool.conf"), "level=1\n").unwrap();
        let logger = Arc::new(MessageCollector::new());
        let cache = Arc::new(ConfCache::new());

        base(&dir, &logger).cache(cache.clone()).parse(["tool"]).unwrap();
        assert_eq!(cache.len(), 1);

        let result = base(&dir, &logger)
            .cache(cache.clone())
            .dialect(Dialect::new(LineContinuation::Unix))
            .parse(["tool"]);
        assert!(matches!(result, Err(OptfigError::Logic(_))));
    }

    #[test]
    fn shared_cache_parses_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.conf");
        fs::write(&path, "level=1\n").unwrap();
        let logger = Arc::new(MessageCollector::new());
        let cache = Arc::new(ConfCache::new());

        base(&dir, &logger).cache(cache.clone()).parse(["tool"]).unwrap();
        fs::write(&path, "level=9\n").unwrap();
        let options = base(&dir, &logger).cache(cache).parse(["tool"]).unwrap();
        assert_eq!(options.get_string("level", 0).unwrap(), "1");
    }

    #[test]
    fn options_file_extends_definitions() {
        let dir = TempDir::new().unwrap();
        let defs = TempDir::new().unwrap();
        fs::write(
            defs.path().join("tool.ini"),
            "[size]\nshortname=s\nallowed=command-line\nflags=required\nvalidator=integer(1...10)\n",
        )
        .unwrap();
        let logger = Arc::new(MessageCollector::new());

        let options = base(&dir, &logger)
            .options_files_dir(defs.path())
            .parse(["tool", "-s", "20"])
            .unwrap();
        assert_eq!(options.get_long("size", 0).unwrap(), 20);
        assert_eq!(logger.error_count(), 1, "{:?}", logger.errors());
        let size = options.definitions().find(|d| d.name() == "size").unwrap();
        assert!(size.has_flag(OptionFlags::COMMAND_LINE | OptionFlags::REQUIRED));
    }

    #[test]
    fn project_info_exposed() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(MessageCollector::new());
        let options = base(&dir, &logger)
            .version("1.2.3")
            .license("MIT")
            .copyright("(c) Someone")
            .build_date("2024-01-01")
            .build_time("12:00:00")
            .help_header("Usage: %p [-<opt>]")
            .help_footer("%c")
            .parse(["tool"])
            .unwrap();
        let project = options.project();
        assert_eq!(project.name, "tool");
        assert_eq!(project.version.as_deref(), Some("1.2.3"));
        assert_eq!(project.license.as_deref(), Some("MIT"));
        assert_eq!(project.help_header.as_deref(), Some("Usage: %p [-<opt>]"));
        assert_eq!(project.help_footer.as_deref(), Some("%c"));
    }
}

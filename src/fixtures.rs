#[cfg(test)]
pub mod test {
    use std::sync::Arc;

    use crate::logger::MessageCollector;
    use crate::option::{OptionDef, OptionFlags};
    use crate::options::{Options, RunInfo};
    use crate::registry::OptionRegistry;
    use crate::validator::ValidatorRegistry;

    /// A small tool's options, one of each kind.
    ///
    /// | Option | Short | Sources | Kind |
    /// |--------|-------|---------|------|
    /// | `verbose` | `v` | all | flag |
    /// | `level` | `l` | all | required argument, default `3` |
    /// | `output` | `o` | command line, file | required argument |
    /// | `tag` | `t` | all | required, multiple |
    /// | `color` | | all | optional argument |
    /// | `colour` | | command line | alias of `color` |
    /// | `--` | | command line | default option, multiple |
    pub fn sample_definitions() -> Vec<OptionDef> {
        vec![
            OptionDef::new("verbose")
                .with_short_name('v')
                .with_flags(OptionFlags::ALL_SOURCES | OptionFlags::FLAG)
                .with_help("Print more messages."),
            OptionDef::new("level")
                .with_short_name('l')
                .with_flags(OptionFlags::ALL_SOURCES | OptionFlags::REQUIRED)
                .with_default("3")
                .with_help("Verbosity level."),
            OptionDef::new("output")
                .with_short_name('o')
                .with_flags(
                    OptionFlags::COMMAND_LINE
                        | OptionFlags::CONFIGURATION_FILE
                        | OptionFlags::REQUIRED,
                ),
            OptionDef::new("tag")
                .with_short_name('t')
                .with_flags(OptionFlags::ALL_SOURCES | OptionFlags::REQUIRED | OptionFlags::MULTIPLE),
            OptionDef::new("color").with_flags(OptionFlags::ALL_SOURCES),
            OptionDef::new("colour")
                .with_flags(OptionFlags::COMMAND_LINE)
                .with_alias_of("color"),
            OptionDef::new("--").with_flags(OptionFlags::COMMAND_LINE | OptionFlags::MULTIPLE),
        ]
    }

    /// Empty options over `defs`, reporting into a collector.
    pub fn collected(defs: Vec<OptionDef>) -> (Options, Arc<MessageCollector>) {
        let registry = OptionRegistry::new(defs, &ValidatorRegistry::with_builtins())
            .expect("fixture definitions are valid");
        let logger = Arc::new(MessageCollector::new());
        let info = RunInfo {
            program_fullname: "tool".to_string(),
            ..RunInfo::default()
        };
        (Options::new(registry, logger.clone(), info), logger)
    }

    #[test]
    fn sample_definitions_register() {
        let (options, logger) = collected(sample_definitions());
        assert_eq!(options.definitions().count(), 7);
        assert!(logger.messages().is_empty());
    }
}

//! Configuration file parsing.
//!
//! A [`ConfFile`] is the result of running one file through one
//! [`DialectDescriptor`]: an insertion-ordered table of fully qualified
//! parameter names to string values, plus the set of section paths seen.
//!
//! Whatever notation produced a section (`[a]` headers, `a { }` blocks,
//! `a.b` or `a::b` names), names are stored with `::` between levels, so
//! `a.b=1` and `a::b=1` both produce the parameter `a::b` and the section `a`.
//!
//! Parsing never stops at a bad line. Each defect is reported once through
//! the [`Logger`], with the file name, line number, and raw text, and the
//! line is skipped. A file that cannot be opened yields an empty table with
//! the OS error code recorded in [`ConfFile::errno`].

use std::path::Path;

use indexmap::{IndexMap, IndexSet};

use crate::dialect::{AssignmentOperators, CommentStyles, Dialect, DialectDescriptor, SectionOperators};
use crate::error::OptfigError;
use crate::lines::{self, LogicalLine};
use crate::logger::{Logger, Severity};

/// Separator used between section levels in stored names.
pub const SECTION_SEPARATOR: &str = "::";

/// A parsed configuration file.
#[derive(Debug, Clone)]
pub struct ConfFile {
    descriptor: DialectDescriptor,
    exists: bool,
    errno: Option<i32>,
    parameters: IndexMap<String, String>,
    sections: IndexSet<String>,
    errors: usize,
}

impl ConfFile {
    /// Read and parse the descriptor's file.
    ///
    /// Fails only when the descriptor's dialect is invalid.
    pub fn load(descriptor: &DialectDescriptor, logger: &dyn Logger) -> Result<Self, OptfigError> {
        check_valid(descriptor)?;
        match std::fs::read(descriptor.path()) {
            Ok(bytes) => {
                log::debug!("parsing configuration file {}", descriptor.path().display());
                let text = String::from_utf8_lossy(&bytes);
                Self::parse_str(descriptor, &text, logger)
            }
            Err(e) => {
                log::debug!(
                    "configuration file {} not loaded: {e}",
                    descriptor.path().display()
                );
                Ok(Self {
                    descriptor: descriptor.clone(),
                    exists: false,
                    errno: e.raw_os_error(),
                    parameters: IndexMap::new(),
                    sections: IndexSet::new(),
                    errors: 0,
                })
            }
        }
    }

    /// Parse in-memory text as if it were the descriptor's file.
    pub fn parse_str(
        descriptor: &DialectDescriptor,
        text: &str,
        logger: &dyn Logger,
    ) -> Result<Self, OptfigError> {
        check_valid(descriptor)?;
        let mut parser = Parser::new(descriptor.dialect(), descriptor.path(), logger);
        parser.run(text);
        Ok(Self {
            descriptor: descriptor.clone(),
            exists: true,
            errno: None,
            parameters: parser.parameters,
            sections: parser.sections,
            errors: parser.errors,
        })
    }

    pub fn descriptor(&self) -> &DialectDescriptor {
        &self.descriptor
    }

    /// Whether the file could be read.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Raw OS error of the failed open, if any.
    pub fn errno(&self) -> Option<i32> {
        self.errno
    }

    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn sections(&self) -> &IndexSet<String> {
        &self.sections
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains(name)
    }

    /// Number of defects reported while parsing.
    pub fn error_count(&self) -> usize {
        self.errors
    }
}

fn check_valid(descriptor: &DialectDescriptor) -> Result<(), OptfigError> {
    if descriptor.is_valid() {
        Ok(())
    } else {
        Err(OptfigError::logic(format!(
            "configuration file {} has an invalid dialect",
            descriptor.path().display()
        )))
    }
}

/// Where the name scan stopped.
enum Split<'a> {
    Assignment { name: &'a str, value: &'a str },
    Block { name: &'a str },
    MissingOperator,
}

struct OpenBlock {
    line: usize,
    name: String,
    depth: usize,
    rejected: bool,
}

struct Parser<'a> {
    dialect: &'a Dialect,
    path: &'a Path,
    logger: &'a dyn Logger,
    comments: CommentStyles,
    separators: Vec<&'static str>,
    blocks: Vec<OpenBlock>,
    /// Full section path of the innermost open block, `[section]` included.
    block_path: Vec<String>,
    ini_section: Vec<String>,
    parameters: IndexMap<String, String>,
    sections: IndexSet<String>,
    errors: usize,
}

impl<'a> Parser<'a> {
    fn new(dialect: &'a Dialect, path: &'a Path, logger: &'a dyn Logger) -> Self {
        Self {
            dialect,
            path,
            logger,
            comments: dialect.effective_comments(),
            separators: dialect.inline_separators(),
            blocks: Vec::new(),
            block_path: Vec::new(),
            ini_section: Vec::new(),
            parameters: IndexMap::new(),
            sections: IndexSet::new(),
            errors: 0,
        }
    }

    fn sections_enabled(&self, op: SectionOperators) -> bool {
        self.dialect.section_operators().contains(op)
    }

    /// Section path that names on the current line are relative to.
    fn scope(&self) -> &[String] {
        if self.blocks.is_empty() {
            &self.ini_section
        } else {
            &self.block_path
        }
    }

    /// Inside a rejected block every line is skipped.
    fn skipping(&self) -> bool {
        self.blocks.iter().any(|b| b.rejected)
    }

    fn run(&mut self, text: &str) {
        let comments = self.comments;
        let style = self
            .dialect
            .line_continuation()
            .unwrap_or_default();
        let logical = lines::logical_lines(
            text,
            style,
            |line| is_comment(comments, line),
            self.sections_enabled(SectionOperators::INI_FILE),
        );

        for line in &logical {
            self.line(line);
        }

        for block in std::mem::take(&mut self.blocks) {
            self.report(
                block.line,
                &format!("block \"{}\" is not closed before the end of the file", block.name),
                &format!("{} {{", block.name),
            );
        }
    }

    fn report(&mut self, line: usize, message: &str, raw: &str) {
        self.errors += 1;
        self.logger.log(
            Severity::Error,
            &format!(
                "{}:{line}: {message} in \"{}\".",
                self.path.display(),
                raw.trim()
            ),
        );
    }

    fn line(&mut self, line: &LogicalLine) {
        let trimmed = line.text.trim();
        if trimmed.is_empty() || is_comment(self.comments, trimmed) {
            return;
        }

        if self.sections_enabled(SectionOperators::BLOCK)
            && let Some(rest) = trimmed.strip_prefix('}')
        {
            self.close_block(line, rest);
            return;
        }

        if self.sections_enabled(SectionOperators::INI_FILE) && trimmed.starts_with('[') {
            self.section_header(line, trimmed);
            return;
        }

        match split_name(trimmed, self.dialect) {
            Split::MissingOperator => {
                self.report(
                    line.number,
                    "option name contains a space or is missing an assignment operator",
                    &line.text,
                );
            }
            Split::Block { name } => {
                let mut full = None;
                if !self.skipping()
                    && let Some(components) = self.name_components(line, name)
                {
                    let path: Vec<String> = self.scope().iter().cloned().chain(components).collect();
                    if self.check_depth(line, path.len()) {
                        full = Some(path);
                    }
                }
                self.blocks.push(OpenBlock {
                    line: line.number,
                    name: name.to_string(),
                    depth: self.block_path.len(),
                    rejected: full.is_none(),
                });
                if let Some(full) = full {
                    self.add_sections(&full, full.len());
                    self.block_path = full;
                }
            }
            Split::Assignment { name, value } => {
                if self.skipping() {
                    return;
                }
                let Some(components) = self.name_components(line, name) else {
                    return;
                };
                let full: Vec<String> = self.scope().iter().cloned().chain(components).collect();
                if !self.check_depth(line, full.len() - 1) {
                    return;
                }
                self.add_sections(&full, full.len() - 1);
                self.parameters
                    .insert(full.join(SECTION_SEPARATOR), value.trim().to_string());
            }
        }
    }

    fn close_block(&mut self, line: &LogicalLine, rest: &str) {
        let rest = rest.trim();
        if !rest.is_empty() && !is_comment(self.comments, rest) {
            self.report(line.number, "unexpected text after '}'", &line.text);
            return;
        }
        match self.blocks.pop() {
            Some(block) => self.block_path.truncate(block.depth),
            None => self.report(line.number, "'}' without a matching '{'", &line.text),
        }
    }

    fn section_header(&mut self, line: &LogicalLine, trimmed: &str) {
        if !self.blocks.is_empty() {
            self.report(
                line.number,
                "a [section] header is not allowed inside a { } block",
                &line.text,
            );
            return;
        }
        let Some(close) = trimmed.find(']') else {
            self.report(line.number, "section header is missing its ']'", &line.text);
            return;
        };
        let after = trimmed[close + 1..].trim();
        if !after.is_empty() && !is_comment(self.comments, after) {
            self.report(line.number, "unexpected text after a section header", &line.text);
            return;
        }

        let name = trimmed[1..close].trim();
        if name.is_empty() {
            self.ini_section.clear();
            return;
        }
        if let Some(components) = self.name_components(line, name)
            && self.check_depth(line, components.len())
        {
            self.add_sections(&components, components.len());
            self.ini_section = components;
        }
    }

    /// Validate `name` and split it on the inline separators.
    fn name_components(&mut self, line: &LogicalLine, name: &str) -> Option<Vec<String>> {
        let name = name.trim();
        if name.is_empty() {
            self.report(line.number, "no option name found before the assignment operator", &line.text);
            return None;
        }
        if name.starts_with('-') || name.starts_with('_') {
            self.report(line.number, "option names cannot start with '-' or '_'", &line.text);
            return None;
        }
        if name.contains(char::is_whitespace) {
            self.report(
                line.number,
                "option name contains a space or is missing an assignment operator",
                &line.text,
            );
            return None;
        }
        let separators = self.separators.clone();
        for sep in &separators {
            if name.starts_with(sep) || name.ends_with(sep) {
                self.report(
                    line.number,
                    &format!("option name cannot start or end with \"{sep}\""),
                    &line.text,
                );
                return None;
            }
            if name.contains(&sep.repeat(2)) {
                self.report(
                    line.number,
                    &format!("option name cannot include a doubled \"{sep}\""),
                    &line.text,
                );
                return None;
            }
        }

        let mut components = vec![name.to_string()];
        for sep in &separators {
            components = components
                .iter()
                .flat_map(|c| c.split(sep).map(str::to_string).collect::<Vec<_>>())
                .collect();
        }
        if components.iter().any(String::is_empty) {
            self.report(line.number, "option name has an empty section", &line.text);
            return None;
        }
        if separators.contains(&"::")
            && components.iter().any(|c| c.starts_with(':') || c.ends_with(':'))
        {
            self.report(line.number, "option name has a stray ':' next to \"::\"", &line.text);
            return None;
        }
        Some(components)
    }

    /// Enforce `ONE_SECTION`: `levels` is the number of section levels.
    fn check_depth(&mut self, line: &LogicalLine, levels: usize) -> bool {
        if levels > 1 && self.sections_enabled(SectionOperators::ONE_SECTION) {
            self.report(
                line.number,
                "only one section level is allowed in this file",
                &line.text,
            );
            return false;
        }
        true
    }

    /// Record the first `levels` prefixes of `path` as sections.
    fn add_sections(&mut self, path: &[String], levels: usize) {
        for depth in 1..=levels {
            self.sections.insert(path[..depth].join(SECTION_SEPARATOR));
        }
    }
}

fn is_comment(comments: CommentStyles, line: &str) -> bool {
    (comments.contains(CommentStyles::SHELL) && line.starts_with('#'))
        || (comments.contains(CommentStyles::INI) && line.starts_with(';'))
        || (comments.contains(CommentStyles::CPP) && line.starts_with("//"))
}

/// Split a trimmed logical line into name and value.
///
/// The name ends at the first enabled operator: `=`, `:` (a `::` is a scope
/// separator when `::` sections are enabled), a blank, or `{` for blocks.
fn split_name<'l>(line: &'l str, dialect: &Dialect) -> Split<'l> {
    let ops = dialect.assignment_operators();
    let sections = dialect.section_operators();
    let scoped = sections.contains(SectionOperators::CPP);
    let blocks = sections.contains(SectionOperators::BLOCK);

    let bytes = line.as_bytes();
    let mut end = 0;
    while end < bytes.len() {
        match bytes[end] {
            b'=' if ops.contains(AssignmentOperators::EQUAL) => break,
            b':' if scoped && bytes.get(end + 1) == Some(&b':') => {
                end += 2;
                continue;
            }
            b':' if ops.contains(AssignmentOperators::COLON) => break,
            b' ' | b'\t' => break,
            b'{' if blocks => break,
            _ => end += 1,
        }
    }

    let name = &line[..end];
    let rest = &line[end..];
    let after_blanks = rest.trim_start_matches([' ', '\t']);

    if let Some(tail) = after_blanks.strip_prefix('{')
        && blocks
        && (tail.trim().is_empty() || is_comment(dialect.effective_comments(), tail.trim()))
    {
        return Split::Block { name };
    }
    if let Some(value) = after_blanks.strip_prefix('=')
        && ops.contains(AssignmentOperators::EQUAL)
    {
        return Split::Assignment { name, value };
    }
    if let Some(value) = after_blanks.strip_prefix(':')
        && ops.contains(AssignmentOperators::COLON)
        && !(scoped && value.starts_with(':'))
    {
        return Split::Assignment { name, value };
    }
    if ops.contains(AssignmentOperators::SPACE) && (rest.len() != after_blanks.len() || rest.is_empty()) {
        return Split::Assignment {
            name,
            value: after_blanks,
        };
    }
    Split::MissingOperator
}

//! Configuration file dialects.
//!
//! A [`Dialect`] is the combination of four orthogonal choices: how lines
//! continue, which characters assign a value, which markers start a comment,
//! and which notations introduce sections. A [`DialectDescriptor`] pairs a
//! dialect with one file path and derives the canonical key used to cache the
//! parsed file.
//!
//! # Canonical key
//!
//! ```text
//! file:///etc/app/app.conf?line-continuation=unix&comment=shell,cpp
//! ```
//!
//! Fields at their default value are left out of the query string. An empty
//! path is written as the literal `<empty>`.

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::error::OptfigError;

const FILE_SCHEME: &str = "file://";
const EMPTY_PATH: &str = "<empty>";

/// Bytes escaped in the path part of a canonical key.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// How one logical line may span several physical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineContinuation {
    /// Every line stands alone.
    #[default]
    SingleLine,
    /// A line starting with blanks continues the previous one.
    Rfc822,
    /// A trailing `&` joins the next, indented, line.
    MsDos,
    /// A trailing `\` joins the next line.
    Unix,
    /// A line starting with `&` continues the previous one.
    Fortran,
    /// An entry runs until a `;`, newlines included.
    Semicolon,
}

impl LineContinuation {
    pub const ALL: [Self; 6] = [
        Self::SingleLine,
        Self::Rfc822,
        Self::MsDos,
        Self::Unix,
        Self::Fortran,
        Self::Semicolon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SingleLine => "single-line",
            Self::Rfc822 => "rfc-822",
            Self::MsDos => "msdos",
            Self::Unix => "unix",
            Self::Fortran => "fortran",
            Self::Semicolon => "semicolon",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lc| lc.name() == name)
    }
}

impl TryFrom<u8> for LineContinuation {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(usize::from(raw)).copied().ok_or(raw)
    }
}

bitflags! {
    /// Characters that separate a parameter name from its value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AssignmentOperators: u8 {
        /// `name = value`
        const EQUAL = 1 << 0;
        /// `name: value`
        const COLON = 1 << 1;
        /// `name value`
        const SPACE = 1 << 2;
    }
}

bitflags! {
    /// Markers that turn the rest of a line into a comment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommentStyles: u8 {
        /// `; comment`
        const INI = 1 << 0;
        /// `# comment`
        const SHELL = 1 << 1;
        /// `// comment`
        const CPP = 1 << 2;
    }
}

bitflags! {
    /// Notations that group parameters into sections.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SectionOperators: u8 {
        /// `a.b = value`
        const C = 1 << 0;
        /// `a::b = value`
        const CPP = 1 << 1;
        /// `a { b = value }`
        const BLOCK = 1 << 2;
        /// `[a]` header lines
        const INI_FILE = 1 << 3;
        /// At most one level of sections.
        const ONE_SECTION = 1 << 4;
    }
}

const ASSIGNMENT_NAMES: &[(AssignmentOperators, &str)] = &[
    (AssignmentOperators::EQUAL, "equal"),
    (AssignmentOperators::COLON, "colon"),
    (AssignmentOperators::SPACE, "space"),
];

const COMMENT_NAMES: &[(CommentStyles, &str)] = &[
    (CommentStyles::INI, "ini"),
    (CommentStyles::SHELL, "shell"),
    (CommentStyles::CPP, "cpp"),
];

const SECTION_NAMES: &[(SectionOperators, &str)] = &[
    (SectionOperators::C, "c"),
    (SectionOperators::CPP, "c++"),
    (SectionOperators::BLOCK, "block"),
    (SectionOperators::INI_FILE, "ini-file"),
    (SectionOperators::ONE_SECTION, "one-section"),
];

const DEFAULT_ASSIGNMENT: AssignmentOperators = AssignmentOperators::EQUAL;
const DEFAULT_COMMENTS: CommentStyles = CommentStyles::INI.union(CommentStyles::SHELL);
const DEFAULT_SECTIONS: SectionOperators = SectionOperators::INI_FILE;

/// Notation bits; `ONE_SECTION` only restricts them.
const SECTION_NOTATIONS: SectionOperators = SectionOperators::C
    .union(SectionOperators::CPP)
    .union(SectionOperators::BLOCK)
    .union(SectionOperators::INI_FILE);

fn names_of<F: bitflags::Flags + Copy>(flags: F, table: &[(F, &'static str)]) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect()
}

fn parse_names<F: bitflags::Flags + Copy>(
    field: &str,
    list: &str,
    table: &[(F, &'static str)],
) -> Result<F, OptfigError> {
    let mut flags = F::empty();
    for name in list.split(',') {
        let (flag, _) = table
            .iter()
            .find(|(_, n)| *n == name)
            .ok_or_else(|| OptfigError::logic(format!("unknown {field} value \"{name}\"")))?;
        flags.insert(*flag);
    }
    Ok(flags)
}

/// The four syntax toggles applied to one configuration file.
///
/// Zero bit-sets resolve to the defaults on construction: `=` assignment,
/// `#` and `;` comments, `[section]` headers. The line continuation has no
/// implicit default when built from raw numbers; an out-of-range value makes
/// the dialect invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dialect {
    line_continuation: Option<LineContinuation>,
    assignment_operators: AssignmentOperators,
    comment_styles: CommentStyles,
    section_operators: SectionOperators,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::new(LineContinuation::SingleLine)
    }
}

impl Dialect {
    pub fn new(line_continuation: LineContinuation) -> Self {
        Self {
            line_continuation: Some(line_continuation),
            assignment_operators: DEFAULT_ASSIGNMENT,
            comment_styles: DEFAULT_COMMENTS,
            section_operators: DEFAULT_SECTIONS,
        }
    }

    /// Build a dialect from raw numeric choices.
    ///
    /// Unknown bits are dropped. A `line_continuation` outside `0..=5`
    /// produces an invalid dialect (see [`is_valid`](Self::is_valid)).
    pub fn from_raw(line_continuation: u8, assignment: u8, comment: u8, section: u8) -> Self {
        Self {
            line_continuation: LineContinuation::try_from(line_continuation).ok(),
            ..Self::default()
        }
        .with_assignment_operators(AssignmentOperators::from_bits_truncate(assignment))
        .with_comment_styles(CommentStyles::from_bits_truncate(comment))
        .with_section_operators(SectionOperators::from_bits_truncate(section))
    }

    pub fn with_assignment_operators(mut self, operators: AssignmentOperators) -> Self {
        self.assignment_operators = if operators.is_empty() {
            DEFAULT_ASSIGNMENT
        } else {
            operators
        };
        self
    }

    pub fn with_comment_styles(mut self, styles: CommentStyles) -> Self {
        self.comment_styles = if styles.is_empty() {
            DEFAULT_COMMENTS
        } else {
            styles
        };
        self
    }

    pub fn with_section_operators(mut self, operators: SectionOperators) -> Self {
        self.section_operators = if operators.intersects(SECTION_NOTATIONS) {
            operators
        } else {
            operators | DEFAULT_SECTIONS
        };
        self
    }

    pub fn is_valid(&self) -> bool {
        self.line_continuation.is_some()
    }

    /// `None` when the dialect was built from an out-of-range raw value.
    pub fn line_continuation(&self) -> Option<LineContinuation> {
        self.line_continuation
    }

    pub fn assignment_operators(&self) -> AssignmentOperators {
        self.assignment_operators
    }

    pub fn comment_styles(&self) -> CommentStyles {
        self.comment_styles
    }

    pub fn section_operators(&self) -> SectionOperators {
        self.section_operators
    }

    /// Comment markers in effect. `;` terminates entries in the semicolon
    /// continuation style, so it cannot start a comment there.
    pub(crate) fn effective_comments(&self) -> CommentStyles {
        if self.line_continuation == Some(LineContinuation::Semicolon) {
            self.comment_styles - CommentStyles::INI
        } else {
            self.comment_styles
        }
    }

    /// Inline separators (`.` and `::`) enabled by this dialect.
    pub(crate) fn inline_separators(&self) -> Vec<&'static str> {
        let mut separators = Vec::new();
        if self.section_operators.contains(SectionOperators::CPP) {
            separators.push("::");
        }
        if self.section_operators.contains(SectionOperators::C) {
            separators.push(".");
        }
        separators
    }

    fn query(&self, line_continuation: LineContinuation) -> Vec<String> {
        let mut fields = Vec::new();
        if line_continuation != LineContinuation::SingleLine {
            fields.push(format!("line-continuation={}", line_continuation.name()));
        }
        if self.assignment_operators != DEFAULT_ASSIGNMENT {
            fields.push(format!(
                "assignment-operator={}",
                names_of(self.assignment_operators, ASSIGNMENT_NAMES).join(",")
            ));
        }
        if self.comment_styles != DEFAULT_COMMENTS {
            fields.push(format!(
                "comment={}",
                names_of(self.comment_styles, COMMENT_NAMES).join(",")
            ));
        }
        if self.section_operators != DEFAULT_SECTIONS {
            fields.push(format!(
                "section-operator={}",
                names_of(self.section_operators, SECTION_NAMES).join(",")
            ));
        }
        fields
    }
}

/// A [`Dialect`] bound to one configuration file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DialectDescriptor {
    path: PathBuf,
    dialect: Dialect,
}

impl DialectDescriptor {
    pub fn new(path: impl Into<PathBuf>, dialect: Dialect) -> Self {
        Self {
            path: path.into(),
            dialect,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn is_valid(&self) -> bool {
        self.dialect.is_valid()
    }

    /// The path made absolute against the current directory, without
    /// touching the file system. Empty paths stay empty.
    pub fn absolute_path(&self) -> PathBuf {
        if self.path.as_os_str().is_empty() {
            return PathBuf::new();
        }
        std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone())
    }

    /// Deterministic encoding of the path and all four dialect fields.
    ///
    /// Fails with a logic error when the dialect is invalid.
    pub fn canonical_key(&self) -> Result<String, OptfigError> {
        let line_continuation = self.dialect.line_continuation.ok_or_else(|| {
            OptfigError::logic(format!(
                "cannot compute the key of {}: invalid line continuation",
                self.path.display()
            ))
        })?;

        let absolute = self.absolute_path();
        let path = if absolute.as_os_str().is_empty() {
            EMPTY_PATH.to_string()
        } else {
            utf8_percent_encode(&absolute.to_string_lossy(), PATH_ESCAPES).to_string()
        };

        let query = self.dialect.query(line_continuation);
        if query.is_empty() {
            Ok(format!("{FILE_SCHEME}{path}"))
        } else {
            Ok(format!("{FILE_SCHEME}{path}?{}", query.join("&")))
        }
    }

    /// Rebuild a descriptor from a key produced by
    /// [`canonical_key`](Self::canonical_key).
    pub fn from_key(key: &str) -> Result<Self, OptfigError> {
        let rest = key
            .strip_prefix(FILE_SCHEME)
            .ok_or_else(|| OptfigError::logic(format!("\"{key}\" is not a file:// key")))?;
        let (raw_path, query) = rest.split_once('?').unwrap_or((rest, ""));

        let path = if raw_path == EMPTY_PATH {
            PathBuf::new()
        } else {
            let decoded = percent_decode_str(raw_path)
                .decode_utf8()
                .map_err(|e| OptfigError::logic(format!("invalid path in \"{key}\": {e}")))?;
            PathBuf::from(decoded.as_ref())
        };

        let mut dialect = Dialect::default();
        for field in query.split('&').filter(|f| !f.is_empty()) {
            let (name, value) = field
                .split_once('=')
                .ok_or_else(|| OptfigError::logic(format!("malformed field \"{field}\"")))?;
            match name {
                "line-continuation" => {
                    let lc = LineContinuation::from_name(value).ok_or_else(|| {
                        OptfigError::logic(format!("unknown line-continuation \"{value}\""))
                    })?;
                    dialect.line_continuation = Some(lc);
                }
                "assignment-operator" => {
                    dialect = dialect.with_assignment_operators(parse_names(
                        name,
                        value,
                        ASSIGNMENT_NAMES,
                    )?);
                }
                "comment" => {
                    dialect = dialect.with_comment_styles(parse_names(name, value, COMMENT_NAMES)?);
                }
                "section-operator" => {
                    dialect =
                        dialect.with_section_operators(parse_names(name, value, SECTION_NAMES)?);
                }
                other => {
                    return Err(OptfigError::logic(format!(
                        "unknown field \"{other}\" in \"{key}\""
                    )));
                }
            }
        }

        Ok(Self { path, dialect })
    }
}

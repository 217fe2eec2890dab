//! Configuration file discovery and loading.
//!
//! # Discovery
//!
//! Each [`SearchPath`] variant resolves to one directory. Configuration file
//! names are joined to every directory in list order. A name that is already
//! an absolute path is used as is and skips the directory list.
//!
//! # Resolution
//!
//! Candidates that exist on disk are loaded through the shared [`ConfCache`]:
//!
//! - [`SearchMode::Merge`]: every existing candidate, in candidate order.
//! - [`SearchMode::FirstMatch`]: only the first existing candidate.
//!
//! Missing candidates are skipped without a message; they still appear in
//! [`Options::config_filenames`](crate::Options::config_filenames) for usage
//! output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::ConfCache;
use crate::conf_file::ConfFile;
use crate::dialect::{Dialect, DialectDescriptor};
use crate::error::OptfigError;
use crate::logger::Logger;
use crate::types::{SearchMode, SearchPath};

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `project_name` is used by `SearchPath::Platform` to construct the
/// platform-specific config directory (e.g. `~/.config/{project_name}/` on
/// Linux). Returns `None` if the path cannot be resolved (e.g. no home
/// directory found).
pub fn resolve_search_path(sp: &SearchPath, project_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", project_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Resolve every search path, dropping the ones that cannot be resolved.
pub fn expand_search_paths(search_paths: &[SearchPath], project_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, project_name))
        .collect()
}

/// Every path a configuration file may be read from, in search order.
///
/// File names are taken in order; relative names expand to one candidate per
/// directory, absolute names to themselves.
pub fn candidate_files(file_names: &[String], dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for name in file_names {
        let path = Path::new(name);
        if path.is_absolute() {
            candidates.push(path.to_path_buf());
        } else {
            candidates.extend(dirs.iter().map(|dir| dir.join(path)));
        }
    }
    candidates
}

/// Load the existing candidates, respecting [`SearchMode`].
///
/// Fails only when the cache rejects a file (invalid dialect, or a path
/// already loaded with a different dialect).
pub fn load_config_files(
    candidates: &[PathBuf],
    dialect: Dialect,
    mode: SearchMode,
    cache: &ConfCache,
    logger: &dyn Logger,
) -> Result<Vec<Arc<ConfFile>>, OptfigError> {
    let mut files = Vec::new();
    for path in candidates.iter().filter(|p| p.is_file()) {
        log::debug!("loading configuration file {}", path.display());
        let descriptor = DialectDescriptor::new(path, dialect);
        files.push(cache.load(&descriptor, logger)?);
        if mode == SearchMode::FirstMatch {
            break;
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::LineContinuation;
    use crate::logger::MessageCollector;
    use std::fs;
    use tempfile::TempDir;

    fn load(candidates: &[PathBuf], mode: SearchMode) -> Vec<Arc<ConfFile>> {
        load_config_files(
            candidates,
            Dialect::default(),
            mode,
            &ConfCache::new(),
            &MessageCollector::new(),
        )
        .unwrap()
    }

    #[test]
    fn resolve_explicit_path() {
        let p = PathBuf::from("/tmp/myapp");
        let resolved = resolve_search_path(&SearchPath::Path(p.clone()), "ignored");
        assert_eq!(resolved, Some(p));
    }

    #[test]
    fn resolve_cwd() {
        let resolved = resolve_search_path(&SearchPath::Cwd, "ignored");
        assert_eq!(resolved, std::env::current_dir().ok());
    }

    #[test]
    fn candidates_follow_name_then_directory_order() {
        let dirs = vec![PathBuf::from("/etc/tool"), PathBuf::from("/home/u/.tool")];
        let names = vec!["tool.conf".to_string(), "/opt/tool.conf".to_string(), "extra.conf".to_string()];
        assert_eq!(
            candidate_files(&names, &dirs),
            vec![
                PathBuf::from("/etc/tool/tool.conf"),
                PathBuf::from("/home/u/.tool/tool.conf"),
                PathBuf::from("/opt/tool.conf"),
                PathBuf::from("/etc/tool/extra.conf"),
                PathBuf::from("/home/u/.tool/extra.conf"),
            ]
        );
    }

    #[test]
    fn load_no_files_exist() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![dir.path().join("nonexistent.conf")];
        assert!(load(&candidates, SearchMode::Merge).is_empty());
        assert!(load(&candidates, SearchMode::FirstMatch).is_empty());
    }

    #[test]
    fn merge_loads_all_in_order() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("app.conf"), "host=a\n").unwrap();
        fs::write(dir2.path().join("app.conf"), "port=1000\n").unwrap();

        let candidates = vec![dir1.path().join("app.conf"), dir2.path().join("app.conf")];
        let files = load(&candidates, SearchMode::Merge);
        assert_eq!(files.len(), 2);
        assert!(files[0].has_parameter("host"));
        assert!(files[1].has_parameter("port"));
    }

    #[test]
    fn missing_file_silently_skipped() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir2.path().join("app.conf"), "port=1\n").unwrap();

        let candidates = vec![dir1.path().join("app.conf"), dir2.path().join("app.conf")];
        let logger = MessageCollector::new();
        let cache = ConfCache::new();
        let files =
            load_config_files(&candidates, Dialect::default(), SearchMode::Merge, &cache, &logger).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(cache.len(), 1);
        assert!(logger.messages().is_empty());
    }

    #[test]
    fn first_match_uses_first_existing() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        let dir3 = TempDir::new().unwrap();
        fs::write(dir2.path().join("app.conf"), "host=second\n").unwrap();
        fs::write(dir3.path().join("app.conf"), "host=third\n").unwrap();

        let candidates = vec![
            dir1.path().join("app.conf"),
            dir2.path().join("app.conf"),
            dir3.path().join("app.conf"),
        ];
        let files = load(&candidates, SearchMode::FirstMatch);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].get_parameter("host"), Some("second"));
    }

    #[test]
    fn cached_file_with_other_dialect_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.conf");
        fs::write(&path, "host=a\n").unwrap();
        let cache = ConfCache::new();
        let logger = MessageCollector::new();
        let candidates = vec![path];

        load_config_files(&candidates, Dialect::default(), SearchMode::Merge, &cache, &logger).unwrap();
        let result = load_config_files(
            &candidates,
            Dialect::new(LineContinuation::Unix),
            SearchMode::Merge,
            &cache,
            &logger,
        );
        assert!(matches!(result, Err(OptfigError::Logic(_))));
    }
}

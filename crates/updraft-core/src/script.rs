//! Patch-script parsing.
//!
//! The script is read top to bottom. Every version header opens a new pending
//! repository until the header of the installed version is reached; entries
//! that follow the installed header belong to versions already on disk and
//! are never read. Malformed entry lines are skipped and reported, so a
//! partially corrupted script still yields the changesets it can describe.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::model::{
    ChangesetEntry, OpKind, Operation, Registration, Repository, StagedPayload, StagingLayout,
};
use crate::version::{HEADER_TOKEN, SEPARATOR, Version};

/// Inputs that resolve script paths against the local installation.
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    /// Version currently on disk.
    pub installed: Version,
    /// Root every local path is placed under.
    pub install_root: &'a Path,
    /// Root of the per-version staging directories.
    pub staging_root: &'a Path,
    /// How payload names map into a staging directory.
    pub layout: StagingLayout,
}

/// Why an entry line was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The op field is not one of `C`, `D`, `M`, `R`.
    UnknownOperation {
        /// Offending op field.
        code: String,
    },
    /// Fewer fields than the operation requires.
    TooFewFields {
        /// Operation named by the line.
        op: OpKind,
        /// Minimum number of fields.
        required: usize,
        /// Number of fields present.
        found: usize,
    },
    /// The line appeared before any version header.
    OrphanEntry,
    /// A path field escapes the install or staging root, or is empty.
    UnsafePath {
        /// Offending path field.
        field: String,
    },
    /// An entry with the same kind and local path was already registered.
    AlreadyRegistered,
}

/// A script line the parser ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// One-based line number.
    pub line: usize,
    /// Line text.
    pub text: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Pending repositories in application order plus parse diagnostics.
#[derive(Debug, Serialize)]
pub struct ParsedChain {
    /// Repositories newer than the installed version, ascending.
    pub repositories: Vec<Repository>,
    /// Entry lines that were skipped.
    pub skipped: Vec<SkippedLine>,
}

impl ParsedChain {
    /// Total number of entries across every repository.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.repositories.iter().map(Repository::len).sum()
    }

    /// Newest pending version, if any.
    #[must_use]
    pub fn target(&self) -> Option<Version> {
        self.repositories.last().map(Repository::version)
    }
}

/// Parse `text` into the chain of repositories still pending for `ctx.installed`.
///
/// Staging directories for the pending versions are created once the chain
/// has been resolved; nothing is created when parsing fails.
///
/// # Errors
///
/// - [`CoreError::Header`] when a header line is malformed.
/// - [`CoreError::DuplicateVersion`] / [`CoreError::StaleVersion`] when the
///   pending headers are inconsistent with each other or the installed version.
/// - [`CoreError::VersionNotFound`] when the installed version is never declared.
/// - [`CoreError::Io`] when a staging directory cannot be created.
pub fn parse_script(text: &str, ctx: &ScriptContext<'_>) -> CoreResult<ParsedChain> {
    let mut repositories: Vec<Repository> = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = BTreeSet::new();
    let mut located = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end_matches('\r').trim();

        if line.is_empty() || line == SEPARATOR {
            continue;
        }

        if line.starts_with(HEADER_TOKEN) {
            let version = Version::parse(line).map_err(|source| CoreError::Header {
                line: line_no,
                source,
            })?;
            if version == ctx.installed {
                debug!(%version, line = line_no, "located installed version");
                located = true;
                break;
            }
            if version < ctx.installed {
                return Err(CoreError::StaleVersion {
                    line: line_no,
                    version,
                    installed: ctx.installed,
                });
            }
            if !seen.insert(version) {
                return Err(CoreError::DuplicateVersion {
                    line: line_no,
                    version,
                });
            }
            debug!(%version, line = line_no, "opening repository");
            repositories.push(Repository::new(version, ctx.install_root, ctx.layout));
            continue;
        }

        let Some(repository) = repositories.last_mut() else {
            skip(&mut skipped, line_no, line, SkipReason::OrphanEntry);
            continue;
        };

        match parse_entry(line, repository.version(), ctx) {
            Ok(entry) => {
                if repository.register(entry) == Registration::AlreadyRegistered {
                    skip(&mut skipped, line_no, line, SkipReason::AlreadyRegistered);
                }
            }
            Err(reason) => skip(&mut skipped, line_no, line, reason),
        }
    }

    if !located {
        warn!(
            installed = %ctx.installed,
            "installed version is not declared in the patch script"
        );
        return Err(CoreError::VersionNotFound {
            installed: ctx.installed,
        });
    }

    repositories.sort_by_key(Repository::version);
    prepare_staging(&repositories)?;

    Ok(ParsedChain {
        repositories,
        skipped,
    })
}

fn skip(skipped: &mut Vec<SkippedLine>, line: usize, text: &str, reason: SkipReason) {
    warn!(line, text, reason = ?reason, "skipping patch script line");
    skipped.push(SkippedLine {
        line,
        text: text.to_string(),
        reason,
    });
}

fn parse_entry(
    line: &str,
    version: Version,
    ctx: &ScriptContext<'_>,
) -> Result<ChangesetEntry, SkipReason> {
    let fields: Vec<&str> = line.split(' ').filter(|field| !field.is_empty()).collect();
    let code = fields.first().copied().unwrap_or_default();
    let op = OpKind::from_code(code).ok_or_else(|| SkipReason::UnknownOperation {
        code: code.to_string(),
    })?;

    if fields.len() < op.min_fields() {
        return Err(SkipReason::TooFewFields {
            op,
            required: op.min_fields(),
            found: fields.len(),
        });
    }

    let relative = fields[1];
    let local = ctx.install_root.join(confine(relative)?);

    let operation = match op {
        OpKind::Create => Operation::Create(stage(fields[2], fields[3], version, ctx)?),
        OpKind::Modify => Operation::Modify(stage(fields[2], fields[3], version, ctx)?),
        OpKind::Rename => Operation::Rename {
            relative: fields[2].to_string(),
            destination: ctx.install_root.join(confine(fields[2])?),
        },
        OpKind::Delete => Operation::Delete,
    };

    Ok(ChangesetEntry::new(relative, local, operation))
}

fn stage(
    remote: &str,
    checksum: &str,
    version: Version,
    ctx: &ScriptContext<'_>,
) -> Result<StagedPayload, SkipReason> {
    let version_dir = ctx.staging_root.join(version.path_safe());
    let staged_path = match ctx.layout {
        StagingLayout::Flat => {
            let name = Path::new(remote)
                .file_name()
                .ok_or_else(|| unsafe_path(remote))?;
            version_dir.join(name)
        }
        StagingLayout::Mirrored => version_dir.join(confine(remote)?),
    };

    Ok(StagedPayload {
        remote: remote.to_string(),
        staged_path,
        checksum: checksum.to_string(),
    })
}

/// Reduce a script path to a relative path that cannot leave its root.
fn confine(field: &str) -> Result<PathBuf, SkipReason> {
    let mut confined = PathBuf::new();
    for component in Path::new(field).components() {
        match component {
            Component::Normal(segment) => confined.push(segment),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return Err(unsafe_path(field)),
        }
    }
    if confined.as_os_str().is_empty() {
        return Err(unsafe_path(field));
    }
    Ok(confined)
}

fn unsafe_path(field: &str) -> SkipReason {
    SkipReason::UnsafePath {
        field: field.to_string(),
    }
}

fn prepare_staging(repositories: &[Repository]) -> CoreResult<()> {
    for entry in repositories.iter().flat_map(Repository::entries) {
        let Some(parent) = entry.staged_path().and_then(Path::parent) else {
            continue;
        };
        if !parent.is_dir() {
            fs::create_dir_all(parent)
                .map_err(|source| CoreError::io("create_staging_dir", parent, source))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    struct Roots {
        _temp: TempDir,
        install: PathBuf,
        staging: PathBuf,
    }

    fn roots() -> Result<Roots> {
        let temp = TempDir::new()?;
        let install = temp.path().join("app");
        let staging = temp.path().join("staging");
        Ok(Roots {
            _temp: temp,
            install,
            staging,
        })
    }

    fn ctx<'a>(roots: &'a Roots, installed: Version, layout: StagingLayout) -> ScriptContext<'a> {
        ScriptContext {
            installed,
            install_root: &roots.install,
            staging_root: &roots.staging,
            layout,
        }
    }

    const V100: Version = Version::from_parts(1, 0, 0);

    #[test]
    fn chain_contains_versions_declared_before_installed() -> Result<()> {
        let roots = roots()?;
        let script = "VERSION 1.1.0\n-\nD a\nVERSION 1.2.0\n-\nD b\nVERSION 1.0.0\n-\nD c\n";
        let chain = parse_script(script, &ctx(&roots, V100, StagingLayout::Flat))?;
        let versions: Vec<Version> = chain.repositories.iter().map(Repository::version).collect();
        assert_eq!(
            versions,
            vec![Version::from_parts(1, 1, 0), Version::from_parts(1, 2, 0)]
        );
        assert_eq!(chain.entry_count(), 2);
        assert_eq!(chain.target(), Some(Version::from_parts(1, 2, 0)));
        Ok(())
    }

    #[test]
    fn newest_first_scripts_apply_in_ascending_order() -> Result<()> {
        let roots = roots()?;
        let script = "VERSION 1.2.0\n-\nD b\nVERSION 1.1.0\n-\nD a\nVERSION 1.0.0\n";
        let chain = parse_script(script, &ctx(&roots, V100, StagingLayout::Flat))?;
        let first = &chain.repositories[0];
        assert_eq!(first.version(), Version::from_parts(1, 1, 0));
        assert_eq!(first.entries()[0].relative(), "a");
        Ok(())
    }

    #[test]
    fn up_to_date_script_yields_empty_chain() -> Result<()> {
        let roots = roots()?;
        let chain = parse_script("VERSION 1.0.0\n-\nD a\n", &ctx(&roots, V100, StagingLayout::Flat))?;
        assert!(chain.repositories.is_empty());
        assert!(chain.skipped.is_empty());
        Ok(())
    }

    #[test]
    fn missing_installed_version_fails_without_staging() -> Result<()> {
        let roots = roots()?;
        let script = "VERSION 1.1.0\n-\nC foo.txt stage/foo.txt abc\n";
        let err = parse_script(script, &ctx(&roots, V100, StagingLayout::Flat))
            .expect_err("installed version is absent");
        assert!(matches!(err, CoreError::VersionNotFound { installed } if installed == V100));
        assert!(!roots.staging.exists());
        Ok(())
    }

    #[test]
    fn malformed_header_is_fatal() -> Result<()> {
        let roots = roots()?;
        let err = parse_script("VERSION 1.1\n", &ctx(&roots, V100, StagingLayout::Flat))
            .expect_err("header is malformed");
        assert!(matches!(err, CoreError::Header { line: 1, .. }));
        Ok(())
    }

    #[test]
    fn duplicate_and_stale_headers_are_fatal() -> Result<()> {
        let roots = roots()?;
        let duplicate = "VERSION 1.1.0\nVERSION 1.1.0\nVERSION 1.0.0\n";
        assert!(matches!(
            parse_script(duplicate, &ctx(&roots, V100, StagingLayout::Flat)),
            Err(CoreError::DuplicateVersion { line: 2, .. })
        ));

        let stale = "VERSION 0.9.0\nVERSION 1.0.0\n";
        assert!(matches!(
            parse_script(stale, &ctx(&roots, V100, StagingLayout::Flat)),
            Err(CoreError::StaleVersion { line: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn malformed_lines_are_skipped_and_reported() -> Result<()> {
        let roots = roots()?;
        let script = "D orphan\n\
                      VERSION 1.1.0\n\
                      -\n\
                      C short.txt stage/short.txt\n\
                      M\n\
                      X what ever\n\
                      D ../escape\n\
                      R lonely\n\
                      D kept\n\
                      D kept\n\
                      VERSION 1.0.0\n";
        let chain = parse_script(script, &ctx(&roots, V100, StagingLayout::Flat))?;
        assert_eq!(chain.entry_count(), 1);

        let reasons: Vec<&SkipReason> = chain.skipped.iter().map(|line| &line.reason).collect();
        assert_eq!(reasons.len(), 7);
        assert_eq!(reasons[0], &SkipReason::OrphanEntry);
        assert_eq!(
            reasons[1],
            &SkipReason::TooFewFields {
                op: OpKind::Create,
                required: 4,
                found: 3
            }
        );
        assert!(matches!(reasons[2], SkipReason::TooFewFields { op: OpKind::Modify, .. }));
        assert!(matches!(reasons[3], SkipReason::UnknownOperation { code } if code == "X"));
        assert!(matches!(reasons[4], SkipReason::UnsafePath { .. }));
        assert!(matches!(reasons[5], SkipReason::TooFewFields { op: OpKind::Rename, .. }));
        assert_eq!(reasons[6], &SkipReason::AlreadyRegistered);
        assert_eq!(chain.skipped[0].line, 1);
        Ok(())
    }

    #[test]
    fn paths_are_rooted_and_payloads_staged_per_version() -> Result<()> {
        let roots = roots()?;
        let script = "VERSION 1.1.0\n\
                      -\n\
                      C bin/foo.txt remote/dir/foo.txt ABC\n\
                      M /lib/core.so diffs/core.so.diff DEF\n\
                      R docs/old.md docs/new.md\n\
                      VERSION 1.0.0\n";
        let chain = parse_script(script, &ctx(&roots, V100, StagingLayout::Flat))?;
        let entries = chain.repositories[0].entries();

        assert_eq!(entries[0].local(), roots.install.join("bin/foo.txt"));
        assert_eq!(
            entries[0].staged_path(),
            Some(roots.staging.join("1_1_0").join("foo.txt").as_path())
        );
        assert_eq!(entries[0].checksum(), Some("ABC"));
        assert_eq!(entries[1].local(), roots.install.join("lib/core.so"));
        assert_eq!(
            entries[1].staged_path(),
            Some(roots.staging.join("1_1_0").join("core.so.diff").as_path())
        );
        match entries[2].operation() {
            Operation::Rename { destination, .. } => {
                assert_eq!(destination, &roots.install.join("docs/new.md"));
            }
            other => panic!("unexpected operation {other:?}"),
        }
        assert!(roots.staging.join("1_1_0").is_dir());
        Ok(())
    }

    #[test]
    fn mirrored_layout_preserves_remote_tree() -> Result<()> {
        let roots = roots()?;
        let script = "VERSION 2.0.0\nC a/b.bin payload/a/b.bin 00\nVERSION 1.0.0\n";
        let chain = parse_script(script, &ctx(&roots, V100, StagingLayout::Mirrored))?;
        let staged = chain.repositories[0].entries()[0]
            .staged_path()
            .map(Path::to_path_buf);
        let expected = roots.staging.join("2_0_0").join("payload/a/b.bin");
        assert_eq!(staged, Some(expected.clone()));
        assert!(expected.parent().is_some_and(Path::is_dir));
        Ok(())
    }

    #[test]
    fn windows_line_endings_are_tolerated() -> Result<()> {
        let roots = roots()?;
        let script = "VERSION 1.1.0\r\n-\r\nD a\r\nVERSION 1.0.0\r\n";
        let chain = parse_script(script, &ctx(&roots, V100, StagingLayout::Flat))?;
        assert_eq!(chain.repositories[0].entries()[0].relative(), "a");
        Ok(())
    }
}

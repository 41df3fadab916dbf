//! Rendering repositories back into patch-script text.

use std::fmt::Write as _;

use crate::model::Repository;
use crate::version::SEPARATOR;

/// Render `repositories` in the given order as script text.
///
/// Each repository becomes a header, a separator line and one line per entry.
/// The installed-version header that terminates a script is the caller's to append.
#[must_use]
pub fn render_script(repositories: &[Repository]) -> String {
    let mut script = String::new();
    for repository in repositories {
        let _ = writeln!(script, "{}", repository.version());
        let _ = writeln!(script, "{SEPARATOR}");
        for entry in repository.entries() {
            let _ = writeln!(script, "{entry}");
        }
    }
    script
}

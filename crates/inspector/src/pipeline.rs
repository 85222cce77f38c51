//! Whole-project inspection: discover → prefilter → parse → dispatch.

use std::fs::File;
use std::path::Path;

use common::{LintConfig, Offense, Offenses};
use memmap2::MmapOptions;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::dispatch::Dispatcher;
use crate::parser::ParserHost;
use crate::path_util::display_path;
use crate::scan::{collect_spec_files, Prefilter};
use crate::InspectorError;

/// Offenses found in one file, ordered by position.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Path relative to the inspected root, with forward slashes.
    pub path: String,
    pub offenses: Vec<Offense>,
}

/// Results of a full project run.
#[derive(Debug, Default, Serialize)]
pub struct LintResult {
    /// One entry per inspected file, in path order.
    pub files: Vec<FileReport>,
    /// Files examined (including those the prefilter cleared without parsing).
    pub inspected: usize,
    /// Files that could not be read or parsed.
    pub skipped: usize,
}

impl LintResult {
    pub fn offense_count(&self) -> usize {
        self.files.iter().map(|f| f.offenses.len()).sum()
    }
}

/// Parses `source` and runs the dispatcher over it.
pub fn lint_source(
    host: &mut ParserHost,
    dispatcher: &Dispatcher,
    source: &[u8],
) -> Result<Offenses, InspectorError> {
    let tree = host.parse_bytes(source)?;
    Ok(dispatcher.run(&tree))
}

/// Inspects every selected file under `root`.
///
/// # Errors
/// Only discovery failures (missing root, prefilter construction) abort the run.
/// Per-file I/O or parse errors are logged and counted in `skipped`.
pub fn run(
    root: &Path,
    host: &mut ParserHost,
    dispatcher: &Dispatcher,
    config: &LintConfig,
) -> Result<LintResult, InspectorError> {
    let paths = collect_spec_files(root, &config.files)?;
    let prefilter = Prefilter::new(&dispatcher.interesting_methods())?;
    debug!(files = paths.len(), root = %root.display(), "starting inspection");

    let mut result = LintResult::default();
    for path in paths {
        let shown = display_path(&path, root)
            .unwrap_or_else(|_| path.display().to_string().replace('\\', "/"));

        match lint_file(&path, host, dispatcher, &prefilter) {
            Ok(mut offenses) => {
                offenses.sort_by_key(|o| o.span.start_byte);
                debug!(path = %shown, offenses = offenses.len(), "inspected");
                result.inspected += 1;
                result.files.push(FileReport {
                    path: shown,
                    offenses,
                });
            }
            Err(e) => {
                warn!(path = %shown, "skipping file: {e}");
                result.skipped += 1;
            }
        }
    }

    Ok(result)
}

fn lint_file(
    path: &Path,
    host: &mut ParserHost,
    dispatcher: &Dispatcher,
    prefilter: &Prefilter,
) -> Result<Vec<Offense>, InspectorError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    if file_len > u32::MAX as u64 {
        return Err(InspectorError::ByteRangeOverflow);
    }
    if file_len == 0 {
        return Ok(Vec::new());
    }

    // SAFETY: The file handle is held for the duration of the mmap lifetime.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let source = &mmap[..];

    if !prefilter.might_match(source) {
        trace!(path = %path.display(), "prefilter: no dispatched method names");
        return Ok(Vec::new());
    }

    Ok(lint_source(host, dispatcher, source)?.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::all_rules;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run_default(root: &Path) -> LintResult {
        let config = LintConfig::default();
        let mut host = ParserHost::new().unwrap();
        let dispatcher = Dispatcher::new(all_rules(), &config);
        run(root, &mut host, &dispatcher, &config).unwrap()
    }

    #[test]
    fn test_lint_source() {
        let config = LintConfig::default();
        let mut host = ParserHost::new().unwrap();
        let dispatcher = Dispatcher::new(all_rules(), &config);

        let offenses = lint_source(&mut host, &dispatcher, b"is_expected == 42").unwrap();
        assert_eq!(offenses.len(), 1);
    }

    #[test]
    fn test_project_run() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "spec/models/user_spec.rb",
            "RSpec.describe User do\n  it { expect(user).kind_of? User }\n  it { is_expected == 42 }\nend\n",
        );
        write(
            dir.path(),
            "spec/models/post_spec.rb",
            "RSpec.describe Post do\n  it { expect(post).to be_valid }\nend\n",
        );
        write(dir.path(), "spec/empty_spec.rb", "");
        write(dir.path(), "spec/plain_spec.rb", "RSpec.describe Plain do\nend\n");
        write(dir.path(), "lib/user.rb", "expect(x).kind_of?(Foo)\n");

        let result = run_default(dir.path());

        assert_eq!(result.inspected, 4);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.offense_count(), 2);

        let user = result
            .files
            .iter()
            .find(|f| f.path == "spec/models/user_spec.rb")
            .unwrap();
        let lines: Vec<u32> = user.offenses.iter().map(|o| o.span.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert!(user.offenses[0].span.start_byte < user.offenses[1].span.start_byte);

        // lib/ files are not specs.
        assert!(result.files.iter().all(|f| !f.path.starts_with("lib/")));
    }

    #[test]
    fn test_too_deeply_nested_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let deep = format!("expect(x){}\n", ".to_s".repeat(10_000));
        write(dir.path(), "spec/deep_spec.rb", &deep);
        write(dir.path(), "spec/shallow_spec.rb", "expect(x).kind_of?(Foo)\n");

        let result = run_default(dir.path());

        assert_eq!(result.skipped, 1);
        assert_eq!(result.inspected, 1);
        assert_eq!(result.files[0].path, "spec/shallow_spec.rb");
        assert_eq!(result.offense_count(), 1);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "check.rb", "expect(x).kind_of?(Foo)\n");

        let result = run_default(&dir.path().join("check.rb"));
        assert_eq!(result.inspected, 1);
        assert_eq!(result.offense_count(), 1);
        assert!(result.files[0].path.ends_with("check.rb"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let config = LintConfig::default();
        let mut host = ParserHost::new().unwrap();
        let dispatcher = Dispatcher::new(all_rules(), &config);
        let result = run(Path::new("/this/does/not/exist"), &mut host, &dispatcher, &config);
        assert!(result.is_err());
    }
}

use std::{
    collections::HashSet,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};

use wait_timeout::ChildExt;

use super::{
    locator::{CollaboratorLocator, JLECMD_EXECUTABLE},
    table::{RawRow, RawTable},
    ArtifactParser,
};
use crate::error::{JumpListError, Result};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs JLECmd against a directory and reads back its CSV output.
#[derive(Debug, Clone)]
pub struct JleCmdParser {
    locator: CollaboratorLocator,
    timeout: Duration,
}

impl Default for JleCmdParser {
    fn default() -> Self {
        Self::new(CollaboratorLocator::default(), DEFAULT_TIMEOUT)
    }
}

impl JleCmdParser {
    pub fn new(locator: CollaboratorLocator, timeout: Duration) -> Self {
        Self { locator, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ArtifactParser for JleCmdParser {
    fn parse_directory(&self, directory: &Path) -> Result<RawTable> {
        if !directory.is_dir() {
            return Err(JumpListError::DirectoryNotFound(directory.to_path_buf()));
        }
        let program = self.locator.resolve()?;

        // Removed on drop, whichever way this function returns.
        let workspace = tempfile::Builder::new()
            .prefix("jumplist-")
            .tempdir()
            .map_err(|err| collaborator_io("failed to create working directory", err))?;
        let csv_dir = workspace.path().join("csv");
        fs::create_dir(&csv_dir)
            .map_err(|err| collaborator_io("failed to create output directory", err))?;
        let log_path = workspace.path().join("collaborator.log");

        run_collaborator(&program, directory, &csv_dir, &log_path, self.timeout)?;

        let csv_files = collect_csv_files(&csv_dir)?;
        if csv_files.is_empty() {
            return Err(JumpListError::Collaborator(format!(
                "{JLECMD_EXECUTABLE} did not generate any CSV files"
            )));
        }
        log_debug!("{} CSV file(s) produced for {}", csv_files.len(), directory.display());

        let table = merge_csv_files(&csv_files)?;
        log_info!(
            "Parsed {} rows from {}",
            table.len(),
            directory.display()
        );
        Ok(table)
    }
}

fn run_collaborator(
    program: &Path,
    directory: &Path,
    csv_dir: &Path,
    log_path: &Path,
    timeout: Duration,
) -> Result<()> {
    let stderr_log = File::create(log_path)
        .map_err(|err| collaborator_io("failed to create collaborator log", err))?;

    let mut child = Command::new(program)
        .arg("-d")
        .arg(directory)
        .arg("--csv")
        .arg(csv_dir)
        .arg("-q")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_log))
        .spawn()
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => JumpListError::Input(format!(
                "{JLECMD_EXECUTABLE} not found at: {}",
                program.display()
            )),
            _ => collaborator_io("failed to start collaborator", err),
        })?;

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(JumpListError::Collaborator(format!(
                "{JLECMD_EXECUTABLE} execution timed out after {} seconds",
                timeout.as_secs()
            )));
        }
        Err(err) => return Err(collaborator_io("failed to wait for collaborator", err)),
    };

    if !status.success() {
        let stderr = fs::read_to_string(log_path).unwrap_or_default();
        let code = status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(JumpListError::Collaborator(format!(
            "{JLECMD_EXECUTABLE} failed with code {code}\nSTDERR: {}",
            stderr.trim()
        )));
    }

    Ok(())
}

fn collect_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).map_err(|err| collaborator_io("failed to list CSV output", err))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|err| collaborator_io("failed to list CSV output", err))?
            .path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Concatenate CSV files into one table. The header comes from the first
/// file; every other file must carry the same set of columns.
pub fn merge_csv_files(files: &[PathBuf]) -> Result<RawTable> {
    let mut table = RawTable::default();
    let mut expected: Option<HashSet<String>> = None;

    for path in files {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|err| csv_error(path, err))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| csv_error(path, err))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let columns: HashSet<String> = headers.iter().cloned().collect();
        match &expected {
            None => {
                table.headers = headers.clone();
                expected = Some(columns);
            }
            Some(first) if *first != columns => {
                return Err(JumpListError::Collaborator(format!(
                    "CSV output {} has a different column set than {}",
                    path.display(),
                    files[0].display()
                )));
            }
            Some(_) => {}
        }

        for record in reader.records() {
            let record = record.map_err(|err| csv_error(path, err))?;
            table.rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(name, value)| (name.clone(), value.to_string()))
                    .collect::<RawRow>(),
            );
        }
    }

    Ok(table)
}

fn collaborator_io(what: &str, err: io::Error) -> JumpListError {
    JumpListError::Collaborator(format!("{what}: {err}"))
}

fn csv_error(path: &Path, err: csv::Error) -> JumpListError {
    JumpListError::Collaborator(format!("failed to read {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn merge_takes_header_from_first_file() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a_AutomaticDestinations.csv");
        let b = dir.path().join("b_CustomDestinations.csv");
        fs::write(&a, "Path,AppId,TargetModified\nC:\\a.txt,app1,2024-01-01 00:00:00\n").unwrap();
        fs::write(&b, "AppId,TargetModified,Path\napp2,2024-01-02 00:00:00,C:\\b.txt\n").unwrap();

        let table = merge_csv_files(&[a, b]).unwrap();
        assert_eq!(table.headers, vec!["Path", "AppId", "TargetModified"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].get("Path"), Some("C:\\b.txt"));
        assert_eq!(table.rows[1].get("AppId"), Some("app2"));
    }

    #[test]
    fn merge_rejects_mismatched_columns() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        fs::write(&a, "Path,AppId\nC:\\a.txt,app1\n").unwrap();
        fs::write(&b, "Path,MachineID\nC:\\b.txt,host\n").unwrap();

        let err = merge_csv_files(&[a, b]).unwrap_err();
        assert!(matches!(err, JumpListError::Collaborator(_)));
    }

    #[test]
    fn missing_directory_is_reported_before_locating_tool() {
        let dir = tempdir().unwrap();
        let parser = JleCmdParser::new(CollaboratorLocator::new(Vec::new()), DEFAULT_TIMEOUT);
        let err = parser.parse_directory(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, JumpListError::DirectoryNotFound(_)));
    }

    #[test]
    fn unlocatable_tool_is_an_input_error() {
        let dir = tempdir().unwrap();
        let parser = JleCmdParser::new(CollaboratorLocator::new(Vec::new()), DEFAULT_TIMEOUT);
        assert!(parser.parse_directory(dir.path()).unwrap_err().is_input());
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use crate::collaborator::locator::LocatorStep;
        use std::os::unix::fs::PermissionsExt;

        const WORKSPACE_RECORD: &str = "workspace.txt";

        /// Shell collaborator that records its `--csv` directory in `dir`
        /// before running `body`.
        fn stub(dir: &Path, body: &str, timeout: Duration) -> JleCmdParser {
            let script = dir.join("jlecmd-stub.sh");
            let record = dir.join(WORKSPACE_RECORD);
            let source = format!(
                "#!/bin/sh\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  \
                 if [ \"$1\" = \"--csv\" ]; then out=\"$2\"; fi\n  shift\ndone\n\
                 printf '%s' \"$out\" > '{}'\n{body}\n",
                record.display()
            );
            fs::write(&script, source).unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            JleCmdParser::new(
                CollaboratorLocator::new(vec![LocatorStep::Explicit(script)]),
                timeout,
            )
        }

        /// The scoped workspace the collaborator ran in (parent of its CSV dir).
        fn recorded_workspace(dir: &Path) -> PathBuf {
            let out = PathBuf::from(fs::read_to_string(dir.join(WORKSPACE_RECORD)).unwrap());
            out.parent().unwrap().to_path_buf()
        }

        #[test]
        fn reads_csv_written_by_collaborator() {
            let tools = tempdir().unwrap();
            let source = tempdir().unwrap();
            let parser = stub(
                tools.path(),
                "printf 'Path,AppId,TargetModified\\nC:\\\\x.txt,abc,2024-01-01 00:00:00\\n' \
                 > \"$out/out.csv\"",
                Duration::from_secs(10),
            );

            let table = parser.parse_directory(source.path()).unwrap();
            assert_eq!(table.len(), 1);
            assert_eq!(table.rows[0].get("AppId"), Some("abc"));

            let workspace = recorded_workspace(tools.path());
            assert!(workspace.starts_with(std::env::temp_dir()));
            assert!(!workspace.exists());
        }

        #[test]
        fn non_zero_exit_carries_stderr() {
            let tools = tempdir().unwrap();
            let source = tempdir().unwrap();
            let parser = stub(
                tools.path(),
                "echo 'bad container' >&2\nexit 3",
                Duration::from_secs(10),
            );

            match parser.parse_directory(source.path()).unwrap_err() {
                JumpListError::Collaborator(message) => {
                    assert!(message.contains("code 3"));
                    assert!(message.contains("bad container"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert!(!recorded_workspace(tools.path()).exists());
        }

        #[test]
        fn no_output_is_a_collaborator_error() {
            let tools = tempdir().unwrap();
            let source = tempdir().unwrap();
            let parser = stub(tools.path(), "exit 0", Duration::from_secs(10));
            assert!(matches!(
                parser.parse_directory(source.path()).unwrap_err(),
                JumpListError::Collaborator(_)
            ));
        }

        #[test]
        fn timeout_is_a_hard_failure() {
            let tools = tempdir().unwrap();
            let source = tempdir().unwrap();
            let parser = stub(tools.path(), "sleep 5", Duration::from_millis(200));

            match parser.parse_directory(source.path()).unwrap_err() {
                JumpListError::Collaborator(message) => assert!(message.contains("timed out")),
                other => panic!("unexpected error: {other:?}"),
            }
            assert!(!recorded_workspace(tools.path()).exists());
        }
    }
}

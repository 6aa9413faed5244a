use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {msg}")]
    Configuration { msg: String },

    #[error(
        "Tool '{}'{} failed ({}) on execute '{}'{}",
        tool,
        Error::format_unit(unit),
        status,
        cmd,
        Error::format_msg_as_detail(stderr)
    )]
    ExternalToolFailure {
        tool: String,
        unit: Option<String>,
        cmd: String,
        status: String,
        stderr: Option<String>,
    },

    #[error("Splitter wrote {found} files to {dir:?}, but {expected} work units are configured")]
    OutputCountMismatch {
        dir: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error(
        "Stage '{}' is missing {} upstream file(s): {}",
        stage,
        paths.len(),
        paths.iter().map(|p| p.display()).join(", ")
    )]
    MissingUpstreamOutput { stage: String, paths: Vec<PathBuf> },

    #[error(
        "Failed trying to execute utility '{utility}'. Make sure it is in your $PATH and you have execution permissions."
    )]
    UtilityNotExecutable { utility: String },

    #[error("Cancelled before all jobs finished")]
    Cancelled,

    #[error("{context} {path:?}: {source}")]
    Io {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    #[cold]
    pub fn configuration<M: Into<String>>(msg: M) -> Self {
        Error::Configuration { msg: msg.into() }
    }

    #[cold]
    pub fn external_tool_failure<T: Into<String>, C: Into<String>, S: ToString>(
        tool: T,
        unit: Option<String>,
        cmd: C,
        status: S,
        stderr: Option<String>,
    ) -> Self {
        Error::ExternalToolFailure {
            tool: tool.into(),
            unit,
            cmd: cmd.into(),
            status: status.to_string(),
            stderr,
        }
    }

    #[cold]
    pub fn output_count_mismatch<P: Into<PathBuf>>(dir: P, expected: usize, found: usize) -> Self {
        Error::OutputCountMismatch {
            dir: dir.into(),
            expected,
            found,
        }
    }

    #[cold]
    pub fn missing_upstream_output<S: Into<String>>(stage: S, paths: Vec<PathBuf>) -> Self {
        Error::MissingUpstreamOutput {
            stage: stage.into(),
            paths,
        }
    }

    #[cold]
    pub fn utility_not_executable<U: Into<String>>(utility: U) -> Self {
        Error::UtilityNotExecutable {
            utility: utility.into(),
        }
    }

    #[cold]
    pub fn io<C: Into<String>, P: AsRef<std::path::Path>>(
        context: C,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Error::Io {
            context: context.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Aborts the whole pipeline rather than a single unit's branch
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ExternalToolFailure { unit: Some(_), .. })
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) if !m.is_empty() => format!(" ({})", m),
            _ => String::new(),
        }
    }

    fn format_unit(unit: &Option<String>) -> String {
        match unit {
            Some(u) => format!(" for unit {}", u),
            None => String::new(),
        }
    }
}

/// Attach the offending path to an io error
pub trait IoContext<T> {
    fn with_path<C: Into<String>, P: AsRef<std::path::Path>>(
        self,
        context: C,
        path: P,
    ) -> Result<T, Error>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn with_path<C: Into<String>, P: AsRef<std::path::Path>>(
        self,
        context: C,
        path: P,
    ) -> Result<T, Error> {
        self.map_err(|e| Error::io(context, path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_failure_is_not_fatal() {
        let e = Error::external_tool_failure(
            "colormap",
            Some("sample.004".to_string()),
            "runCorr.sh a b c",
            "exit status: 1",
            Some("out of memory".to_string()),
        );
        assert!(!e.is_fatal());
        let msg = e.to_string();
        assert!(msg.contains("for unit sample.004"));
        assert!(msg.contains("(out of memory)"));

        let e = Error::output_count_mismatch("sample_trim", 101, 100);
        assert!(e.is_fatal());
    }

    #[test]
    fn test_missing_upstream_lists_paths() {
        let e = Error::missing_upstream_output(
            "merge",
            vec![PathBuf::from("a_iter2.fasta"), PathBuf::from("b_iter2.fasta")],
        );
        assert_eq!(
            e.to_string(),
            "Stage 'merge' is missing 2 upstream file(s): a_iter2.fasta, b_iter2.fasta"
        );
    }
}

//! On-disk layout of the replayable payload pairs.
//!
//! ```text
//! <payload_dir>/
//!   setup-global-test.txt  global-middle.txt  global-last.txt
//!   setup/000001/<name>.txt  testing/000001/<name>.txt  cleanup/000001/<name>.txt
//! ```
//!
//! Every file holds `engine_newPayloadV4` / `engine_forkchoiceUpdatedV3` request lines in pairs.

use std::path::{Path, PathBuf};

use color_eyre::eyre;
use gasbench_execution::transport::JsonRpcRequest;
use gasbench_types::{
    Phase,
    constants::{GLOBAL_LAST_FILE, GLOBAL_MIDDLE_FILE, GLOBAL_PRE_TEST_FILE, INDEX_WIDTH},
};

use crate::{error::ProxyError, fs};

/// Minified `newPayload` and `forkchoiceUpdated` request bodies of one production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPair {
    pub new_payload: String,
    pub forkchoice: String,
}

impl PayloadPair {
    pub fn from_requests(new_payload: &JsonRpcRequest, forkchoice: &JsonRpcRequest) -> eyre::Result<Self> {
        Ok(Self { new_payload: new_payload.to_line()?, forkchoice: forkchoice.to_line()? })
    }

    pub fn lines(&self) -> [&str; 2] {
        [&self.new_payload, &self.forkchoice]
    }

    /// Both lines, newline terminated.
    pub fn content(&self) -> String {
        format!("{}\n{}\n", self.new_payload, self.forkchoice)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<phase>/<index>/<name>.txt`. Only phased keys have phase files.
    pub fn phase_file(&self, phase: Phase, index: u32, name: &str) -> PathBuf {
        self.root
            .join(phase.as_str())
            .join(format!("{index:0width$}", width = INDEX_WIDTH))
            .join(format!("{name}.txt"))
    }

    pub fn global_file(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn append(&self, path: &Path, pair: &PayloadPair) -> Result<(), ProxyError> {
        fs::append_lines(path, &pair.lines())
    }

    /// Replaces the testing file of a scenario with `pair`. When a previous testing pair exists
    /// it is appended to the setup file afterwards, so only the latest production is measured.
    /// The previous pair is migrated only once the new one is in place.
    pub fn replace_testing(&self, index: u32, name: &str, pair: &PayloadPair) -> Result<(), ProxyError> {
        let testing = self.phase_file(Phase::Testing, index, name);
        let previous = fs::read_optional(&testing)?;
        self.write_testing(index, name, pair)?;
        self.migrate(previous, &self.phase_file(Phase::Setup, index, name))
    }

    /// Overwrites the testing file without migrating anything.
    pub fn write_testing(&self, index: u32, name: &str, pair: &PayloadPair) -> Result<(), ProxyError> {
        fs::write_atomic(&self.phase_file(Phase::Testing, index, name), pair.content().as_bytes())
    }

    pub fn append_global_pre_test(&self, pair: &PayloadPair) -> Result<(), ProxyError> {
        self.append(&self.global_file(GLOBAL_PRE_TEST_FILE), pair)
    }

    /// Moves the current `global-last.txt` content into `global-middle.txt` and makes `pair` the
    /// new tail.
    pub fn rotate_global_last(&self, pair: &PayloadPair) -> Result<(), ProxyError> {
        let last = self.global_file(GLOBAL_LAST_FILE);
        let previous = fs::read_optional(&last)?;
        fs::write_atomic(&last, pair.content().as_bytes())?;
        self.migrate(previous, &self.global_file(GLOBAL_MIDDLE_FILE))
    }

    fn migrate(&self, previous: Option<String>, to: &Path) -> Result<(), ProxyError> {
        let Some(previous) = previous else { return Ok(()) };
        let lines: Vec<&str> = previous.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return Ok(());
        }
        fs::append_lines(to, &lines)
    }
}

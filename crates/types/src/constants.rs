//! Names and markers shared by the proxy, the CLI and the orchestrator-facing files.

/// Reserved component used for both the file base and the test name of traffic that carries no
/// test metadata.
pub const GLOBAL_NOPHASE: &str = "global-nophase";

/// Header carrying test metadata when the JSON-RPC `id` does not.
pub const TEST_METADATA_HEADER: &str = "x-eest-id";

/// Recipient marker passed to `engine_getPayloadV4` when the batch has no fee recipient.
pub const EMPTY_RECIPIENT: &str = "EMPTY";

/// Order in which scenarios were first seen, as `[{index, name}]`.
pub const SCENARIO_ORDER_FILE: &str = "scenario_order.json";

/// Everything produced for the global bucket before the first phased test.
pub const GLOBAL_PRE_TEST_FILE: &str = "setup-global-test.txt";
/// All global productions after the first phased test except the newest one.
pub const GLOBAL_MIDDLE_FILE: &str = "global-middle.txt";
/// Newest global production after the first phased test.
pub const GLOBAL_LAST_FILE: &str = "global-last.txt";

/// Preparation payloads that raise the gas limit before any test runs.
pub const GAS_BUMP_FILE: &str = "gas-bump.txt";
/// Preparation payload that funds the seed account.
pub const FUNDING_FILE: &str = "funding.txt";

/// Control directory shared with the orchestrator, relative to the payload directory.
pub const CONTROL_DIR: &str = "_control";
pub const PAUSE_FILE: &str = "pause.json";
pub const RESUME_FILE: &str = "resume.json";

/// Width of the zero-padded scenario index directories (`000001`).
pub const INDEX_WIDTH: usize = 6;

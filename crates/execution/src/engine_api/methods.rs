// crates/execution/src/engine_api/methods.rs

use std::time::Duration;

// The node under benchmark exposes a modified `engine_getPayloadV4` that builds a block from an
// explicit list of raw transactions and a fee recipient, instead of a payload id.
pub const ENGINE_GET_PAYLOAD_V4: &str = "engine_getPayloadV4";
pub const ENGINE_NEW_PAYLOAD_V4: &str = "engine_newPayloadV4";
pub const ENGINE_FORKCHOICE_UPDATED_V3: &str = "engine_forkchoiceUpdatedV3";

/// Large blocks of benchmark transactions can take well over the usual Engine API budgets to
/// build and import.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(90);

pub const ETH_SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";
pub const ETH_GET_TRANSACTION_BY_HASH: &str = "eth_getTransactionByHash";

pub type B256 = alloy_primitives::B256;
pub type BlockHash = alloy_primitives::BlockHash;

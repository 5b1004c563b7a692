pub mod miner;

pub use miner::{
    combine_patterns, mine_activity_patterns, mine_artifact_patterns, mine_coding_patterns,
    normalize_time, WorkPattern,
};

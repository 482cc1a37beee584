pub mod claims;
pub mod encode;
pub mod qid;
pub mod score;
pub mod threshold;

pub use claims::{ClaimSet, ClaimValue, Entity};
pub use encode::{EncodeError, EncoderConfig, TokenSequence, encode};
pub use qid::{Qid, QidParseError};
pub use score::{ScoreError, TopicScorer};
pub use threshold::{
    LabelScoreMap, ScoredTopic, ThresholdError, ThresholdMode, rank_all, select_topics,
    validate_threshold,
};

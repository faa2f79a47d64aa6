pub mod evaluator;
pub mod notify;

pub use evaluator::{
    AlertConfig, AlertEvaluator, AlertTier, QuietHours, ThresholdLadder, TierConfig,
};
pub use notify::{Channel, DispatchOutcome, LoggingDispatcher, NotificationDispatcher, Recipient};

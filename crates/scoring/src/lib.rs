pub mod generator;
pub mod rules;
pub mod weights;

pub use generator::{generate_signals, ProbeResults};
pub use rules::{hybrid_score, rule_score};
pub use weights::SignalWeights;

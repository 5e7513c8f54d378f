// Evaluation orchestration: cache lookup, matching, quality gating and suggestions.
// Handlers stay thin; everything testable lives in `service`.

pub mod handlers;
pub mod service;

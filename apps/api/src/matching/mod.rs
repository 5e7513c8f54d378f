// Concept matching engine.
// Registry of weighted, tiered concepts matched against resume text (exact + semantic),
// with tier inference, level-sensitive weights and recency/impact boosts.

pub mod concepts;
pub mod levels;
pub mod matcher;
pub mod normalize;

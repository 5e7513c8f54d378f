// Quality Gate: formatting lint, contact/location presence and low-confidence match flags.
// Runs after the matcher and never changes the fit score.

pub mod gate;
pub mod lint;
pub mod pii;

pub mod dedupe;
pub mod transform;
pub mod validate;

pub use dedupe::dedupe;
pub use transform::transform;
pub use validate::{validate, InvalidRecord, ValidationOutcome};

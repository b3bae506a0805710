pub mod extract;
pub mod score;

pub use extract::extract;
pub use score::{compare, effective_profile, score};

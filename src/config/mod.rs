//! Engine defaults every fresh policy starts from.

pub mod default;

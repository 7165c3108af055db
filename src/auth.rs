//! Auth-domain models: token claims, raw and decoded token records, clock-skew correction, and
//! derived authentication status.

pub mod claims;
pub mod skew;
pub mod status;
pub mod token;

pub use claims::*;
pub use skew::*;
pub use status::*;
pub use token::{record::*, secret::*};

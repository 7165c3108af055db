//! Raw token pairs as persisted, and their decoded in-memory view.

pub mod record;
pub mod secret;

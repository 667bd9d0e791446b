//! Local checks on signed model responses.

pub mod binding;
pub mod signature;

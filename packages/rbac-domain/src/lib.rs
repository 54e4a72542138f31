pub mod catalog;
pub mod containment;
pub mod entity;
pub mod fields;
pub mod ids;
pub mod kinds;
pub mod policy;
pub mod predicate;
pub mod tags;
pub mod tenant;

mod error;

pub use error::{Error, Result};

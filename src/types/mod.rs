//! Column and parameter values.

mod value;

pub use value::{FromValue, Value};

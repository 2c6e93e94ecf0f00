pub mod error;
pub mod value;

pub use error::{ConversionError, ConversionResult, MigrateError, Result};
pub use value::FieldValue;

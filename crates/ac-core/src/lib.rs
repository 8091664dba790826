pub mod error;
pub mod object;
pub mod text;
pub mod types;
pub mod value;

pub use error::{AdminError, AdminResult, ErrorKind};
pub use object::*;
pub use types::*;
pub use value::*;

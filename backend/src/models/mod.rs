pub mod defaults;
pub mod entities;
pub mod macros;
pub mod time;
pub mod validation;

pub use entities::*;
pub use time::*;
pub use validation::{Validate, ValidationErrors};

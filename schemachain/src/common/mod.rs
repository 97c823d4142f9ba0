mod constants;
mod sql;
mod value;

pub use constants::*;
pub use sql::*;
pub use value::*;

pub mod address;
pub mod coord;
pub mod ident;
pub mod value;

pub use address::*;
pub use coord::*;
pub use ident::*;
pub use value::*;

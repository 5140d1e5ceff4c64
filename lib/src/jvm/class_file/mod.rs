mod attribute;
mod class;
mod constants;
mod deserialize;
mod field;
mod method;
mod version;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use deserialize::*;
pub use field::*;
pub use method::*;
pub use version::*;

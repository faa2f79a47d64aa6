pub mod alert;
pub mod forecast;
pub mod types;

pub use alert::*;
pub use forecast::*;
pub use types::*;

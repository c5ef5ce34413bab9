pub use server::*;
pub use train::*;

pub mod server;
pub mod train;

mod guard;
mod logger;
mod reporter;

pub use guard::*;
pub use logger::*;
pub use reporter::*;

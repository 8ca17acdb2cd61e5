pub mod draft;
pub mod enums;
pub mod ledger;
pub mod package;
pub mod patient;
pub mod session;

pub use draft::*;
pub use ledger::*;
pub use package::*;
pub use patient::*;
pub use session::*;

pub mod event;
pub mod market;
pub mod order;
pub mod position;
pub mod transaction;
pub mod user;
pub mod wallet;

pub use event::*;
pub use market::*;
pub use order::*;
pub use position::*;
pub use transaction::*;
pub use user::*;
pub use wallet::*;

mod calendar;
mod ledger;
mod money;
mod owner;
mod transaction;

pub use calendar::*;
pub use ledger::*;
pub use money::*;
pub use owner::*;
pub use transaction::*;

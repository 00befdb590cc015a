pub mod event;
pub mod ledger;

pub use event::{EventKind, Split, SplitType, TransactionEvent, TransactionGroup};
pub use ledger::{DerivedTransaction, SplitPatch, TransactionAttributes, TransactionRecord};

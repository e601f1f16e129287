//! Transaction submission module with gas estimation and inclusion polling

mod builder;
mod gas;
mod sender;

pub use sender::TransactionSubmitter;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod marker_ticker;
pub mod priorities;
pub mod save_queue;
pub mod schedule_store;

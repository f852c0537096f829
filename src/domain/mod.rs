pub mod interaction;
pub mod interval_math;
pub mod models;
pub mod schedule;
pub mod time_marker;

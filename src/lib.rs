// Library for tests to access modules

pub mod aggregation;
pub mod config;
pub mod driver;
pub mod error;
pub mod models;
pub mod output;
pub mod probe;
pub mod recorder;
pub mod report;
pub mod run;
pub mod scheduler;
pub mod targets;

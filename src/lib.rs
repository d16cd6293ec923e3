pub mod cli;
pub mod ec2;
pub mod error;
pub mod flatten;
pub mod logging;
pub mod output;
pub mod pricing;
pub mod report;

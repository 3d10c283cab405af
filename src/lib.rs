pub mod backtest;
pub mod categories;
pub mod config;
pub mod fake_feed;
pub mod gaps;
pub mod logging;
pub mod parser;
pub mod predictor;
pub mod request;
pub mod round;

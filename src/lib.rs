pub mod app;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod logging;

pub use dispatch::{
    DeliveryError, DeliveryResponse, DispatchError, Dispatcher, DispatcherConfig, ResultHandle,
};

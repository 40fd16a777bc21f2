//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{
    load_configuration,
    configure_logging,
    build_dispatcher_config,
};
pub use execution::{
    collect_messages,
    run_dispatch,
    DispatchSummary,
};

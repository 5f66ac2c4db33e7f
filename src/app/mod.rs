//! Application orchestration module

pub mod initialization;
pub mod execution;
pub mod output;

pub use initialization::{
    build_registries,
    configure_logging,
    create_option_store,
    load_configuration,
    Registries,
};
pub use execution::execute;

//! Configuration for the remotepad daemon.

mod settings;

pub use settings::{
    ControlConfig, DescriptorConfig, LoggingConfig, Settings, SocketConfig,
};

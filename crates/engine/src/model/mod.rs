//! Domain entities persisted through the store.

pub mod auth;
pub mod container;
pub mod device;
pub mod task;

pub use auth::{
    CertKind, DeviceAuth, DeviceAuthInput, DeviceAuthView, RuntimeAuthInput, RuntimeAuthOverride,
    SshAuthType, SshConnection,
};
pub use container::{
    Container, ContainerAction, ContainerImage, ContainerNetwork, ContainerStat, ContainerVolume,
    RuntimeObject,
};
pub use device::{Capability, CapabilityFlags, Device, DeviceFacts, DeviceStatus, WatchFlag};
pub use task::{
    AutomationTask, ExecutionLog, ExecutionMode, ExecutionStatus, ExtraVar, Playbook, TaskStatus,
    User,
};

//! # magikspec
//!
//! **Container Specification → OCI Runtime Config Translation**
//!
//! This crate turns an abstract [`ContainerSpec`] (limits, namespace
//! policy, mounts, devices, security attributes, environment) into a
//! platform-exact [`OciSpec`] that youki, runc or crun can consume as
//! `config.json`. It never launches anything; the config is the product.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           magikspec                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │   ContainerSpec ──┐                                                 │
//! │                   ├─► ExecutionContext (rootless, userns, sysfs,    │
//! │   Host::detect ───┘        gid 5)                                   │
//! │                              │                                      │
//! │  ┌───────────────────────────┼───────────────────────────────┐      │
//! │  │                     Translator                            │      │
//! │  │  mount plan │ rlimits │ devices │ security │ namespaces   │      │
//! │  └───────────────────────────┼───────────────────────────────┘      │
//! │                              │                                      │
//! │  ┌───────────────────────────┼───────────────────────────────┐      │
//! │  │                      Finalize                             │      │
//! │  │  user mounts win │ option normalization │ annotations     │      │
//! │  └───────────────────────────┼───────────────────────────────┘      │
//! │                              ▼                                      │
//! │                     OciSpec (config.json)                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Policy Axes
//!
//! Rootless execution, user namespace mode, privilege and namespace sharing
//! each change which kernel filesystems can be mounted:
//!
//! | Situation                                  | Consequence                      |
//! |--------------------------------------------|----------------------------------|
//! | user namespace + host network              | `/sys` bind-mounted, no cgroup   |
//! | privileged, sysfs mountable                | `/sys` sysfs `rw`, cgroup `rw`   |
//! | rootless without GID 5 mapped              | devpts without `gid=5`           |
//! | user namespace + host IPC                  | host `/dev/mqueue` bind-mounted  |
//! | user namespace + host PID                  | host `/proc` bind-mounted        |
//!
//! ## Key Properties
//!
//! - **One mount per destination**: mounts are keyed by destination at every
//!   stage and user mounts always win (see [`mounts::supersede_user_mounts`]).
//! - **All or nothing**: the first failing stage aborts translation and no
//!   config is returned.
//! - **No shared state**: each call builds its own [`SpecGenerator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use magikspec::{ContainerSpec, ProcResolver, Translator, TranslatorConfig};
//!
//! fn main() -> magikspec::Result<()> {
//!     let translator = Translator::new(TranslatorConfig::load()?);
//!     let spec = ContainerSpec::from_json(r#"{"command": ["/bin/sh"]}"#)?;
//!     let config = translator.translate(&spec, &ProcResolver::new())?;
//!     config.save("bundle/config.json")?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod devices;
pub mod error;
pub mod generator;
pub mod mounts;
pub mod namespaces;
pub mod oci;
pub mod platform;
pub mod rlimits;
pub mod security;
pub mod specgen;
pub mod translate;

// Re-exports
pub use config::TranslatorConfig;
pub use constants::*;
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use generator::SpecGenerator;
pub use mounts::{MountPlan, MountTable};
pub use namespaces::{NamespaceKind, NamespaceResolver, ProcResolver};
pub use oci::{OciMount, OciSpec};
pub use platform::Host;
pub use specgen::{ContainerSpec, DeviceSpec, IdMap, IdMappings, NamespaceMode, RlimitSpec};
pub use translate::Translator;

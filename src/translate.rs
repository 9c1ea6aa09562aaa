//! Container specification to OCI runtime config translation.
//!
//! ```text
//!  ContainerSpec ─┬─► ExecutionContext ─► MountPlan
//!      Host ──────┘            │
//!                              ▼
//!   SpecGenerator: process ─► annotations ─► resources ─► devices
//!               ─► security ─► environment ─► rlimits ─► namespaces
//!                              │
//!                              ▼
//!         finalize: user mounts ─► option normalization ─► annotations
//!                              │
//!                              ▼
//!                           OciSpec
//! ```
//!
//! Every stage returns on the first error. A failed translation yields no
//! config at all; the partially built generator is dropped.

use crate::config::TranslatorConfig;
use crate::constants::{
    ANNOTATION_AUTOREMOVE, ANNOTATION_FALSE, ANNOTATION_PRIVILEGED, ANNOTATION_TRUE,
    ANNOTATION_VOLUMES_FROM,
};
use crate::context::ExecutionContext;
use crate::devices::{add_privileged_devices, devices_from_path};
use crate::error::Result;
use crate::generator::SpecGenerator;
use crate::mounts::{init_fs_mounts, plan_mounts, supersede_user_mounts};
use crate::namespaces::{NamespaceResolver, configure_namespaces};
use crate::oci::OciSpec;
use crate::platform::Host;
use crate::rlimits::add_rlimits;
use crate::security::{add_annotations, add_environment, configure_security};
use crate::specgen::ContainerSpec;
use tracing::{debug, info};

fn annotation_bool(value: bool) -> &'static str {
    if value { ANNOTATION_TRUE } else { ANNOTATION_FALSE }
}

/// Translates container specifications into OCI runtime configs.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Probes the host, then translates `spec`.
    pub fn translate(&self, spec: &ContainerSpec, resolver: &dyn NamespaceResolver) -> Result<OciSpec> {
        let host = Host::detect(&self.config)?;
        self.translate_on(spec, &host, resolver)
    }

    /// Translates `spec` for an already detected host.
    pub fn translate_on(
        &self,
        spec: &ContainerSpec,
        host: &Host,
        resolver: &dyn NamespaceResolver,
    ) -> Result<OciSpec> {
        spec.validate()?;

        let ctx = ExecutionContext::new(spec, host);
        debug!(?ctx, privileged = spec.privileged, "Classified execution context");

        let mut generator = SpecGenerator::new();
        plan_mounts(&ctx, spec).apply(&mut generator);

        generator.set_process_cwd(&spec.work_dir);
        generator.set_process_args(&spec.command);
        generator.set_process_terminal(spec.terminal);

        add_annotations(&spec.annotations, &mut generator);
        generator.linux_mut().resources = spec.resource_limits.clone();

        if spec.privileged {
            // Every host device is added, which already covers declared ones.
            add_privileged_devices(&mut generator, &self.config.dev_root, ctx.rootless)?;
        } else {
            for device in &spec.devices {
                devices_from_path(&mut generator, &device.path, ctx.rootless)?;
            }
        }

        configure_security(spec, &ctx, &mut generator)?;
        add_environment(&spec.env, &self.config, &mut generator);
        add_rlimits(spec.rlimits.as_deref(), ctx.rootless, &mut generator);
        configure_namespaces(spec, &mut generator, resolver)?;

        let oci = finalize(spec, generator)?;
        info!(
            mounts = oci.mounts.len(),
            privileged = spec.privileged,
            rootless = ctx.rootless,
            "Generated OCI runtime config"
        );
        Ok(oci)
    }
}

/// Merges user mounts, normalizes options and stamps standard annotations.
pub fn finalize(spec: &ContainerSpec, mut generator: SpecGenerator) -> Result<OciSpec> {
    let merged = supersede_user_mounts(&spec.mounts, generator.mounts());
    generator.set_mounts(merged);

    let mut oci = generator.into_spec();
    init_fs_mounts(&mut oci.mounts)?;

    let annotations = oci.annotations.get_or_insert_with(Default::default);
    annotations.insert(
        ANNOTATION_AUTOREMOVE.to_string(),
        annotation_bool(spec.remove).to_string(),
    );
    if !spec.volumes_from.is_empty() {
        annotations.insert(
            ANNOTATION_VOLUMES_FROM.to_string(),
            spec.volumes_from.join(","),
        );
    }
    annotations.insert(
        ANNOTATION_PRIVILEGED.to_string(),
        annotation_bool(spec.privileged).to_string(),
    );

    Ok(oci)
}

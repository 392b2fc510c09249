// SPDX-License-Identifier: GPL-3.0-only

use chrono::Local;
use snaps_sys::{
    Executor, MountEntry, ScratchMounts, list_btrfs_devices, list_subvolumes, read_proc_mounts,
    snapshot_usage, space_summary,
};
use snaps_types::Device;

use crate::error::{ModelError, Result};
use crate::model::Model;

/// Process-wide session: the cached read model behind its dirty flag,
/// plus the scratch mounts that back discovery.
///
/// Scratch mounts are acquired on first use and released whenever the
/// session drops, on every exit path. The device list and mount table
/// are read once per process; only the subvolume forests are reloaded
/// on a dirty rebuild.
pub struct Session {
    executor: Executor,
    scratch: ScratchMounts,
    model: Option<Model>,
    devices_cache: Option<Vec<String>>,
    mounts_cache: Option<Vec<MountEntry>>,
}

impl Session {
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            scratch: ScratchMounts::new(),
            model: None,
            devices_cache: None,
            mounts_cache: None,
        }
    }

    pub fn executor(&self) -> Executor {
        self.executor
    }

    /// Rebuild the model when it is missing or dirty, carrying cached
    /// sizes over by `(device, path)`.
    pub fn refresh_if_dirty(&mut self) -> Result<()> {
        if matches!(self.model, Some(ref model) if !model.dirty) {
            return Ok(());
        }
        let sizes = self
            .model
            .take()
            .map(|model| model.sizes())
            .unwrap_or_default();
        let mut model = self.load()?;
        model.restore_sizes(&sizes);
        self.model = Some(model);
        Ok(())
    }

    pub fn model(&mut self) -> Result<&Model> {
        self.refresh_if_dirty()?;
        self.model.as_ref().ok_or_else(unavailable)
    }

    pub fn model_mut(&mut self) -> Result<&mut Model> {
        self.refresh_if_dirty()?;
        self.model.as_mut().ok_or_else(unavailable)
    }

    fn load(&mut self) -> Result<Model> {
        let devices = match &self.devices_cache {
            Some(devices) => devices.clone(),
            None => {
                let devices = list_btrfs_devices()?;
                self.devices_cache = Some(devices.clone());
                devices
            }
        };
        let mounts = match &self.mounts_cache {
            Some(mounts) => mounts.clone(),
            None => {
                let mounts = read_proc_mounts()?;
                self.mounts_cache = Some(mounts.clone());
                mounts
            }
        };

        let now = Local::now();
        let mut inputs = Vec::new();
        for name in devices {
            let scratch = self.scratch.ensure(&name)?;
            let space = match space_summary(&scratch) {
                Ok(space) => Some(space),
                Err(error) => {
                    tracing::warn!(device = %name, %error, "statvfs failed");
                    None
                }
            };
            let records = list_subvolumes(&scratch)?;
            inputs.push((
                Device {
                    name,
                    scratch,
                    space,
                },
                records,
            ));
        }
        Model::build(inputs, &mounts, now)
    }

    /// Run the (slow) usage query over the snapshots root and fold the
    /// results into the model.
    pub fn refresh_usage(&mut self) -> Result<()> {
        self.refresh_if_dirty()?;
        let Some(model) = self.model.as_mut() else {
            return Err(unavailable());
        };
        let device = model.snaproot.0.clone();
        let scratch = model.tree(&device).device.scratch.clone();
        let relative = model
            .snaproot_subvol()
            .path
            .trim_start_matches('/')
            .to_string();
        let entries = snapshot_usage(&scratch, &relative)?;
        model.apply_usage(&device, &entries);
        Ok(())
    }
}

fn unavailable() -> ModelError {
    ModelError::Precondition("model unavailable".to_string())
}

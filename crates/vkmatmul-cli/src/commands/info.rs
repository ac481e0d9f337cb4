//! `info`: Vulkan devices and their queue families.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use serde::Serialize;
use vkmatmul_vulkan::{DeviceCandidate, select_device};

use crate::config::CliConfig;
use crate::output::{OutputFormat, emit_result};

/// Show the Vulkan devices the compute context can choose from
#[derive(Debug, Parser)]
pub struct InfoCommand {
    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub queue_count: u32,
    pub flags: String,
    pub compute: bool,
}

#[derive(Debug, Serialize)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub device_type: String,
    pub selected: bool,
    pub queue_families: Vec<QueueFamilyInfo>,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub kernel_path: String,
    pub kernel_present: bool,
    pub devices: Vec<DeviceInfo>,
}

/// Summaries of `candidates`, marking the one the context would pick.
pub fn describe(candidates: &[DeviceCandidate]) -> Vec<DeviceInfo> {
    let selected = select_device(candidates).ok().map(|d| d.physical_device);
    candidates
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let compute: Vec<u32> = c.compute_families().collect();
            DeviceInfo {
                index,
                name: c.name.clone(),
                device_type: format!("{:?}", c.device_type),
                selected: selected == Some(c.physical_device),
                queue_families: c
                    .queue_families
                    .iter()
                    .enumerate()
                    .map(|(i, family)| QueueFamilyInfo {
                        index: i as u32,
                        queue_count: family.queue_count,
                        flags: format!("{:?}", family.queue_flags),
                        compute: compute.contains(&(i as u32)),
                    })
                    .collect(),
            }
        })
        .collect()
}

impl InfoCommand {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let candidates =
            vkmatmul_vulkan::list_devices(&config.compute).context("failed to enumerate Vulkan devices")?;
        let kernel_path = &config.compute.kernel_path;
        let info = SystemInfo {
            kernel_path: kernel_path.display().to_string(),
            kernel_present: kernel_path.exists(),
            devices: describe(&candidates),
        };

        emit_result(self.format, &info, |info| {
            println!("{}", style("Vulkan devices").bold());
            if info.devices.is_empty() {
                println!("  {}", style("none found").yellow());
            }
            for d in &info.devices {
                let marker = if d.selected { style("*").green().bold() } else { style(" ") };
                println!("{marker} [{}] {} ({})", d.index, d.name, d.device_type);
                for q in &d.queue_families {
                    let flags = if q.compute { style(q.flags.clone()).cyan() } else { style(q.flags.clone()).dim() };
                    println!("      family {}: {} queue(s), {}", q.index, q.queue_count, flags);
                }
            }
            let kernel_state = if info.kernel_present { style("found").green() } else { style("missing").red() };
            println!("\n  Kernel: {} ({kernel_state})", info.kernel_path);
        })
    }
}

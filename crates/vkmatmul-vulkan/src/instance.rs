//! Vulkan loader and instance ownership.

use std::ffi::{CStr, CString, c_char};
use std::sync::Arc;

use ash::ext::debug_utils;
use ash::vk;
use tracing::{debug, warn};

use crate::config::ComputeConfig;
use crate::error::{ComputeError, Result};
use crate::validation::{ValidationLog, messenger_info};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// The loaded Vulkan library and the instance created from it.
///
/// Must outlive every device-level object; [`crate::ComputeContext`]
/// declares it after the logical context so it is dropped last.
pub struct VulkanInstance {
    instance: ash::Instance,
    messenger: Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    // Messenger callbacks hold a raw pointer into this; outlives `instance`.
    validation_log: Arc<ValidationLog>,
    // Keeps the loader library mapped until the instance is destroyed.
    _entry: ash::Entry,
}

impl VulkanInstance {
    /// Load the Vulkan loader and create an instance.
    pub fn new(config: &ComputeConfig) -> Result<Self> {
        Self::with_validation_log(config, Arc::new(ValidationLog::new()))
    }

    /// Like [`VulkanInstance::new`], counting validation messages into `log`.
    pub fn with_validation_log(config: &ComputeConfig, log: Arc<ValidationLog>) -> Result<Self> {
        debug!("Creating Vulkan instance");

        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| ComputeError::LoaderUnavailable(e.to_string()))?;

        let app_name = CString::new(config.application_name.as_str())
            .map_err(|e| ComputeError::DeviceCreation(format!("invalid application name: {e}")))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_1);

        let validation_enabled = config.enable_validation && validation_layer_present(&entry);
        if config.enable_validation && !validation_enabled {
            warn!("validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }
        let capture = validation_enabled && debug_utils_present(&entry);
        if validation_enabled && !capture {
            warn!("validation layer does not expose VK_EXT_debug_utils; messages will not be counted");
        }

        let layers: Vec<*const c_char> =
            if validation_enabled { vec![VALIDATION_LAYER.as_ptr()] } else { Vec::new() };
        let extensions: Vec<*const c_char> = if capture { vec![debug_utils::NAME.as_ptr()] } else { Vec::new() };

        let mut create_messenger = messenger_info(&log);
        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions);
        if capture {
            create_info = create_info.push_next(&mut create_messenger);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(|e| ComputeError::DeviceCreation(format!("vkCreateInstance: {e}")))?;

        let messenger = if capture {
            let loader = debug_utils::Instance::new(&entry, &instance);
            match unsafe { loader.create_debug_utils_messenger(&messenger_info(&log), None) } {
                Ok(messenger) => Some((loader, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(ComputeError::DeviceCreation(format!("vkCreateDebugUtilsMessengerEXT: {e}")));
                }
            }
        } else {
            None
        };

        debug!(validation = validation_enabled, messenger = messenger.is_some(), "Vulkan instance created");
        Ok(Self { instance, messenger, validation_log: log, _entry: entry })
    }

    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Validation messages are being captured into [`VulkanInstance::validation_log`].
    pub fn validation_enabled(&self) -> bool {
        self.messenger.is_some()
    }

    pub fn validation_log(&self) -> &Arc<ValidationLog> {
        &self.validation_log
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.messenger.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        debug!(
            validation_errors = self.validation_log.errors(),
            validation_warnings = self.validation_log.warnings(),
            "Vulkan instance destroyed"
        );
    }
}

fn debug_utils_present(entry: &ash::Entry) -> bool {
    let Ok(extensions) = (unsafe { entry.enumerate_instance_extension_properties(Some(VALIDATION_LAYER)) }) else {
        return false;
    };
    extensions.iter().any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == debug_utils::NAME))
}

fn validation_layer_present(entry: &ash::Entry) -> bool {
    let Ok(layers) = (unsafe { entry.enumerate_instance_layer_properties() }) else {
        return false;
    };
    layers.iter().any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER))
}

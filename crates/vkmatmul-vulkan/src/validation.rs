//! Validation-layer message capture.
//!
//! When validation is enabled the instance installs a `VK_EXT_debug_utils`
//! messenger whose callback forwards each message to `tracing` and counts it
//! in a shared [`ValidationLog`]. The same messenger info is chained into
//! instance creation so messages from `vkCreateInstance` and
//! `vkDestroyInstance` are counted too.

use std::ffi::{CStr, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};

use ash::vk;
use tracing::{debug, error, warn};

/// Counts of validation messages received, by severity.
///
/// Shared through an `Arc` so callers can inspect it after the context that
/// reported into it has been dropped.
#[derive(Debug, Default)]
pub struct ValidationLog {
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

impl ValidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            self.errors.fetch_add(1, Ordering::Relaxed);
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            self.warnings.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn warnings(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    /// No errors and no warnings so far.
    pub fn is_clean(&self) -> bool {
        self.errors() == 0 && self.warnings() == 0
    }
}

/// Messenger settings reporting warnings and errors into `log`.
///
/// `log` must stay alive for as long as any messenger created from the
/// returned info exists.
pub(crate) fn messenger_info(log: &ValidationLog) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(validation_callback))
        .user_data(log as *const ValidationLog as *mut c_void)
}

pub(crate) unsafe extern "system" fn validation_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    let message = unsafe {
        p_callback_data
            .as_ref()
            .filter(|data| !data.p_message.is_null())
            .map(|data| CStr::from_ptr(data.p_message).to_string_lossy())
            .unwrap_or_default()
    };

    if let Some(log) = unsafe { (p_user_data as *const ValidationLog).as_ref() } {
        log.record(message_severity);
    }

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!(kind = ?message_type, "{message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!(kind = ?message_type, "{message}");
    } else {
        debug!(kind = ?message_type, "{message}");
    }
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliver(log: &ValidationLog, severity: vk::DebugUtilsMessageSeverityFlagsEXT, text: &CStr) {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default().message(text);
        let ret = unsafe {
            validation_callback(
                severity,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                log as *const ValidationLog as *mut c_void,
            )
        };
        assert_eq!(ret, vk::FALSE);
    }

    #[test]
    fn counts_by_severity() {
        let log = ValidationLog::new();
        assert!(log.is_clean());

        deliver(&log, vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, c"VUID-vkDestroyDevice-device-05137");
        deliver(&log, vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, c"slow path");
        deliver(&log, vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, c"leaked VkBuffer");
        deliver(&log, vk::DebugUtilsMessageSeverityFlagsEXT::INFO, c"informational");

        assert_eq!(log.errors(), 2);
        assert_eq!(log.warnings(), 1);
        assert!(!log.is_clean());
    }

    #[test]
    fn null_message_and_user_data_tolerated() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default();
        let ret = unsafe {
            validation_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(ret, vk::FALSE);
    }

    #[test]
    fn messenger_info_points_at_log() {
        let log = ValidationLog::new();
        let info = messenger_info(&log);
        assert_eq!(info.p_user_data, &log as *const ValidationLog as *mut c_void);
        assert!(info.pfn_user_callback.is_some());
        assert!(info.message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
        assert!(!info.message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
    }
}

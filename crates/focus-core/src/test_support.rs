use chrono::{DateTime, Local, TimeZone};
use focus_api::NotificationConfig;
use focus_config::EngineConfig;
use focus_host_api::MockHost;
use std::sync::Arc;
use std::time::Duration;

use crate::{Collaborators, EngineContext};

pub(crate) fn context(host: Arc<MockHost>, daily_target: u32) -> Arc<EngineContext> {
    let config = EngineConfig {
        daily_target,
        collaborator_timeout: Duration::from_secs(2),
        ..EngineConfig::default()
    };
    Arc::new(EngineContext::new(
        config,
        NotificationConfig::default(),
        Collaborators::from_host(host, config.collaborator_timeout),
    ))
}

/// 2025-12-29 is a Monday
pub(crate) fn monday_at(hour: u32, minute: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 12, 29, hour, minute, 0).unwrap()
}

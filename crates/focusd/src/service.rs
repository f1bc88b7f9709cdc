//! Daemon service: wires the engine to the store and the IPC protocol

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use focus_api::{
    API_VERSION, Command, ErrorCode, ErrorInfo, Event, EventPayload, Request, Response,
    ResponsePayload, WeekSchedule,
};
use focus_config::{Policy, RestrictionsConfig};
use focus_core::{Collaborators, EngineError, EngineEvent, FocusEngine};
use focus_store::{AuditEvent, AuditEventType, Store};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Main service state
///
/// The engine's in-memory planner is authoritative. The store is written
/// after every change and read once at startup; a failed write is logged
/// and never rolls back the change.
pub struct Service {
    engine: FocusEngine,
    store: Arc<dyn Store>,
    restrictions: RestrictionsConfig,
    initial_schedule: WeekSchedule,
    events: broadcast::Sender<Event>,
}

impl Service {
    pub fn new(policy: &Policy, host: Collaborators, store: Arc<dyn Store>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine: FocusEngine::new(policy.engine, policy.notification.clone(), host),
            store,
            restrictions: policy.restrictions.clone(),
            initial_schedule: policy.initial_schedule.clone(),
            events,
        }
    }

    pub fn engine(&self) -> &FocusEngine {
        &self.engine
    }

    /// Client-facing events: translated engine events plus planner edits
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn subscribe_engine(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe()
    }

    /// Restore persisted state, seed what is missing and check permission
    ///
    /// Must run before [`start`](Self::start).
    pub async fn initialize(&self, now: DateTime<Local>) -> Result<()> {
        self.store
            .append_audit(AuditEvent::new(AuditEventType::DaemonStarted))
            .context("Failed to write startup audit record")?;

        match self
            .store
            .load_planner()
            .context("Failed to load persisted planner")?
        {
            Some(planner) => {
                info!(
                    slots = planner.schedule.slot_count(),
                    restricted = planner.restricted.len(),
                    "Restored persisted planner"
                );
                self.engine.planner().replace(planner);
            }
            None => {
                info!(
                    slots = self.initial_schedule.slot_count(),
                    "No persisted planner, using configured schedule"
                );
                self.engine
                    .planner()
                    .replace_schedule(self.initial_schedule.clone());
            }
        }

        // The inventory is always fetched for ListApps; seeding only
        // happens when nothing was restored above
        if let Some(restricted) = self.engine.load_inventory(&self.restrictions).await {
            let inventory = self.engine.installed_apps().len();
            self.audit(AuditEventType::RestrictionsSeeded {
                restricted,
                inventory,
            });
            self.persist_planner();
        }

        let today = now.date_naive();
        let minutes = self
            .store
            .get_focus_minutes(today)
            .context("Failed to load focus minutes")?;
        if minutes > 0 {
            info!(day = %today, minutes, "Restored focus minutes");
        }
        self.engine.restore_focus_minutes(today, minutes);

        self.engine.check_permission().await;
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        self.engine.start().context("Failed to start engine")
    }

    /// Stop the loops, release the overlay and notifier, save state
    pub async fn shutdown(&self) {
        self.engine.stop().await;
        self.engine.release_host().await;
        self.persist_planner();
        self.audit(AuditEventType::DaemonStopped);
    }

    pub async fn handle_request(&self, request: Request) -> Response {
        if request.api_version != API_VERSION {
            return Response::error(
                request.request_id,
                ErrorInfo::new(
                    ErrorCode::InvalidRequest,
                    format!(
                        "unsupported api_version {} (expected {})",
                        request.api_version, API_VERSION
                    ),
                ),
            );
        }
        self.handle_command(request.request_id, request.command)
            .await
    }

    pub async fn handle_command(&self, request_id: u64, command: Command) -> Response {
        match command {
            Command::GetState => {
                let status = self.engine.status(focus_util::now());
                Response::success(request_id, ResponsePayload::State(status))
            }

            Command::ListApps => Response::success(
                request_id,
                ResponsePayload::Apps {
                    apps: self.engine.installed_apps(),
                },
            ),

            Command::ToggleSlot { day, hour } => match self.engine.toggle_slot(day, hour) {
                Ok(scheduled) => {
                    self.audit(AuditEventType::SlotToggled {
                        day,
                        hour,
                        scheduled,
                    });
                    self.planner_changed();
                    Response::success(
                        request_id,
                        ResponsePayload::SlotToggled {
                            day,
                            hour,
                            scheduled,
                        },
                    )
                }
                Err(EngineError::Planner(e)) => Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::InvalidSlot, e.to_string()),
                ),
                Err(e) => Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::InternalError, e.to_string()),
                ),
            },

            Command::ToggleRestriction { app_id } => {
                if app_id.is_empty() {
                    return Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::InvalidRequest, "app_id must not be empty"),
                    );
                }
                let restricted = self.engine.toggle_restriction(app_id.clone());
                self.audit(AuditEventType::RestrictionToggled {
                    app_id: app_id.clone(),
                    restricted,
                });
                self.planner_changed();
                Response::success(
                    request_id,
                    ResponsePayload::RestrictionToggled { app_id, restricted },
                )
            }

            Command::ToggleDebug => {
                let enabled = self.engine.toggle_debug().await;
                self.audit(AuditEventType::DebugOverrideChanged { enabled });
                Response::success(request_id, ResponsePayload::DebugToggled { enabled })
            }

            Command::RequestPermission => {
                let granted = self.engine.request_permission().await;
                if !granted {
                    self.audit(AuditEventType::PermissionRequested);
                }
                Response::success(request_id, ResponsePayload::PermissionStatus { granted })
            }

            Command::SubscribeEvents => Response::success(request_id, ResponsePayload::Subscribed),

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }

    /// Persist what needs persisting and republish to clients
    pub fn handle_engine_event(&self, event: EngineEvent) {
        let payload = match event {
            EngineEvent::SessionChanged { active } => EventPayload::SessionChanged { active },
            EngineEvent::OverlayChanged { visibility } => {
                EventPayload::OverlayChanged { visibility }
            }
            EngineEvent::FocusMinute { day, minutes } => {
                if let Err(e) = self.store.set_focus_minutes(day, minutes) {
                    warn!(error = %e, day = %day, minutes, "Failed to persist focus minutes");
                }
                EventPayload::FocusMinute { day, minutes }
            }
            EngineEvent::DebugOverrideChanged { enabled } => {
                EventPayload::DebugOverrideChanged { enabled }
            }
            EngineEvent::PermissionChanged { granted } => {
                EventPayload::PermissionChanged { granted }
            }
            EngineEvent::TerminationSweep { attempted, failed } => {
                EventPayload::TerminationSweep { attempted, failed }
            }
        };
        self.publish(payload);
    }

    fn planner_changed(&self) {
        self.persist_planner();
        self.publish(EventPayload::PlannerChanged);
    }

    fn persist_planner(&self) {
        let snapshot = self.engine.snapshot();
        if let Err(e) = self.store.save_planner(&snapshot) {
            warn!(error = %e, "Failed to persist planner");
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to write audit record");
        }
    }

    fn publish(&self, payload: EventPayload) {
        debug!(?payload, "Publishing event");
        // No subscribers is fine
        let _ = self.events.send(Event::new(payload));
    }
}

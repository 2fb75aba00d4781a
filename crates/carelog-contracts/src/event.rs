//! Producer-side audit event types.
//!
//! An `AuditEvent` is what application code enqueues when a security- or
//! PHI-relevant action happens.  It carries everything the append worker
//! needs to mint a durable `AuditEntry` — except the chain fields, which
//! only the worker may assign.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::TenantId;

/// The kind of action being audited.
///
/// This is a closed enumeration: new kinds require a schema-reviewed change,
/// because downstream compliance reports group on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A protected-health-information record was read.
    PhiAccess,
    /// A protected-health-information record was created or changed.
    PhiModification,
    /// A login, logout, or credential event.
    Authentication,
    /// An action was attempted and denied by access control.
    PermissionDenied,
    /// A privileged administrative action (user management, configuration).
    AdminAction,
    /// A system-generated event (scheduled jobs, migrations).
    SystemEvent,
}

/// The compliance category an event is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    /// PHI handling — the category HIPAA reviews care about most.
    Privacy,
    /// Authentication, authorization, and access-control events.
    Security,
    /// Clinical workflow events (orders, prescriptions, results).
    Clinical,
    /// Scheduling, billing, and administrative changes.
    Administrative,
    /// Internal system activity with no direct user principal.
    System,
}

/// The principal who triggered the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier from the identity system.
    pub user_id: String,
    /// Display name at the time of the event, denormalized for reports.
    pub user_name: String,
}

/// What was acted upon, when the event targets a specific resource.
///
/// Example: `ResourceRef { resource_type: "patient", resource_id: "p-8812" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_type: String,
    pub resource_id: String,
}

/// Request-scoped context captured at the call site, when available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

/// One queued audit event, as produced by application code.
///
/// `timestamp` is when the underlying event *occurred*, supplied by the
/// producer.  It is distinct from the append time the worker stamps on the
/// durable entry — producers may enqueue out of event-time order (retries,
/// clock skew), and the chain orders by append, not by this field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// The tenant whose chain this event extends.
    pub tenant_id: TenantId,
    /// What kind of action this is.
    pub event_type: AuditEventType,
    /// Which compliance category it files under.
    pub category: AuditCategory,
    /// Who did it.
    pub actor: Actor,
    /// Free-form verb describing the action (e.g. "view_chart").
    pub action: Option<String>,
    /// What was acted upon, if the event targets a resource.
    pub resource: Option<ResourceRef>,
    /// Request context from the call site.
    pub context: Option<RequestContext>,
    /// Free-form structured payload.
    pub details: Option<Value>,
    /// Snapshot of the resource before a change, for change auditing.
    pub before: Option<Value>,
    /// Snapshot of the resource after a change.
    pub after: Option<Value>,
    /// When the underlying event occurred (producer-supplied, UTC).
    pub timestamp: DateTime<Utc>,
}

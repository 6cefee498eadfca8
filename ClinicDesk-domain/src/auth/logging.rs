//! Audit trail for authentication and authorization decisions.
//!
//! Every event is a single `tracing` record on the `clinic_desk::audit`
//! target so it can be routed to its own sink with an `EnvFilter` directive.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

pub const AUDIT_TARGET: &str = "clinic_desk::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Login,
    LoginRejected,
    Logout,
    Refresh,
    Revocation,
    BearerCheck,
    RoleCheck,
    AccountCreated,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditKind::Login => "login",
            AuditKind::LoginRejected => "login_rejected",
            AuditKind::Logout => "logout",
            AuditKind::Refresh => "refresh",
            AuditKind::Revocation => "revocation",
            AuditKind::BearerCheck => "bearer_check",
            AuditKind::RoleCheck => "role_check",
            AuditKind::AccountCreated => "account_created",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the caller proved (or failed to prove) who they are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    None,
    Password,
    AccessToken,
    RefreshToken,
}

impl Credential {
    fn as_str(self) -> &'static str {
        match self {
            Credential::None => "none",
            Credential::Password => "password",
            Credential::AccessToken => "access_token",
            Credential::RefreshToken => "refresh_token",
        }
    }
}

/// One audit record. Build with [`AuditEvent::allowed`] or [`AuditEvent::denied`].
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub allowed: bool,
    pub actor: Option<String>,
    pub credential: Credential,
    pub path: Option<String>,
    pub client: Option<String>,
    pub note: Option<String>,
    pub elapsed_ms: Option<u64>,
}

impl AuditEvent {
    fn base(kind: AuditKind, allowed: bool, actor: Option<&str>) -> Self {
        Self {
            kind,
            allowed,
            actor: actor.map(str::to_owned),
            credential: Credential::None,
            path: None,
            client: None,
            note: None,
            elapsed_ms: None,
        }
    }

    pub fn allowed(kind: AuditKind, actor: Option<&str>) -> Self {
        Self::base(kind, true, actor)
    }

    pub fn denied(kind: AuditKind, actor: Option<&str>) -> Self {
        Self::base(kind, false, actor)
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn client(mut self, client: Option<&str>) -> Self {
        self.client = client.map(str::to_owned);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn took(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(elapsed.as_millis() as u64);
        self
    }

    /// Write the event. Denials are warnings, everything else is info.
    pub fn emit(self) {
        let actor = self.actor.as_deref().unwrap_or("-");
        let path = self.path.as_deref().unwrap_or("-");
        let client = self.client.as_deref().unwrap_or("-");
        let note = self.note.as_deref().unwrap_or("");
        let credential = self.credential.as_str();

        if self.allowed {
            info!(
                target: AUDIT_TARGET,
                kind = %self.kind,
                actor,
                credential,
                path,
                client,
                elapsed_ms = self.elapsed_ms,
                "{} allowed {}",
                self.kind,
                note
            );
        } else {
            warn!(
                target: AUDIT_TARGET,
                kind = %self.kind,
                actor,
                credential,
                path,
                client,
                elapsed_ms = self.elapsed_ms,
                "{} denied {}",
                self.kind,
                note
            );
        }
    }
}

pub fn log_successful_login(user_id: &str, client: Option<&str>, elapsed: Duration) {
    AuditEvent::allowed(AuditKind::Login, Some(user_id))
        .credential(Credential::Password)
        .client(client)
        .took(elapsed)
        .emit();
}

pub fn log_failed_login(username: &str, client: Option<&str>, reason: &str) {
    AuditEvent::denied(AuditKind::LoginRejected, Some(username))
        .credential(Credential::Password)
        .client(client)
        .note(reason)
        .emit();
}

pub fn log_token_refresh(user_id: &str, allowed: bool, note: Option<&str>) {
    let event = if allowed {
        AuditEvent::allowed(AuditKind::Refresh, Some(user_id))
    } else {
        AuditEvent::denied(AuditKind::Refresh, Some(user_id))
    };
    let event = event.credential(Credential::RefreshToken);
    match note {
        Some(note) => event.note(note).emit(),
        None => event.emit(),
    }
}

pub fn log_logout(user_id: &str) {
    AuditEvent::allowed(AuditKind::Logout, Some(user_id))
        .credential(Credential::AccessToken)
        .emit();
}

/// `which` names the token kind that was revoked ("access" or "refresh")
pub fn log_token_revocation(user_id: &str, which: &str) {
    AuditEvent::allowed(AuditKind::Revocation, Some(user_id))
        .note(format!("{} token revoked", which))
        .emit();
}

pub fn log_user_created(created_by: Option<&str>, username: &str, role: &str) {
    AuditEvent::allowed(AuditKind::AccountCreated, created_by.or(Some("bootstrap")))
        .note(format!("{} ({})", username, role))
        .emit();
}

pub fn log_access_denied(user_id: &str, path: &str, required_roles: &[String]) {
    AuditEvent::denied(AuditKind::RoleCheck, Some(user_id))
        .credential(Credential::AccessToken)
        .path(path)
        .note(format!("needs one of [{}]", required_roles.join(", ")))
        .emit();
}

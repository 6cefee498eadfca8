//! Domain layer health check functionality

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use clinic_desk_data::database::DatabasePool;

/// Set the first time anything asks for uptime; the binary touches it at startup
static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

/// A database round trip slower than this marks the database degraded
const SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(500);

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync {
    async fn get_system_health(&self) -> SystemHealth;
}

/// Record the process start time
pub fn mark_started() {
    Lazy::force(&STARTED_AT);
}

pub fn uptime() -> Duration {
    STARTED_AT.elapsed()
}

/// Overall status is the worst component status
pub fn overall_status<'a>(components: impl IntoIterator<Item = &'a HealthComponent>) -> SystemStatus {
    let mut status = SystemStatus::Healthy;
    for component in components {
        match component.status {
            ComponentStatus::Unhealthy => return SystemStatus::Unhealthy,
            ComponentStatus::Degraded => status = SystemStatus::Degraded,
            ComponentStatus::Healthy => {}
        }
    }
    status
}

/// Health checks backed by the live database pool
#[derive(Debug, Clone)]
pub struct HealthService {
    pool: DatabasePool,
}

impl HealthService {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn check_database(&self) -> HealthComponent {
        let pool = self.pool.clone();
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || pool.connection_info()).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(info)) if elapsed > SLOW_QUERY_THRESHOLD => {
                warn!("Database health check took {:?}", elapsed);
                HealthComponent {
                    status: ComponentStatus::Degraded,
                    details: Some(format!("{} (slow: {}ms)", info, elapsed.as_millis())),
                }
            }
            Ok(Ok(info)) => {
                debug!("Database healthy: {}", info);
                HealthComponent {
                    status: ComponentStatus::Healthy,
                    details: Some(info),
                }
            }
            Ok(Err(e)) => {
                warn!("Database health check failed: {}", e);
                HealthComponent {
                    status: ComponentStatus::Unhealthy,
                    details: Some(format!("Database connection error: {}", e)),
                }
            }
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(format!("Health check task failed: {}", e)),
            },
        }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = HashMap::new();
        components.insert("database".to_string(), self.check_database().await);

        SystemHealth {
            status: overall_status(components.values()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime().as_secs(),
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_healthy() {
        mark_started();
        let service = HealthService::new(DatabasePool::in_memory().unwrap());

        let health = service.get_system_health().await;
        let database = &health.components["database"];
        assert_eq!(database.status, ComponentStatus::Healthy);
        assert!(database.details.as_deref().unwrap_or_default().contains(":memory:"));
        assert_eq!(health.status, SystemStatus::Healthy);
        assert!(!health.version.is_empty());
    }

    #[test]
    fn test_overall_status_takes_the_worst() {
        let healthy = HealthComponent {
            status: ComponentStatus::Healthy,
            details: None,
        };
        let degraded = HealthComponent {
            status: ComponentStatus::Degraded,
            details: None,
        };
        let down = HealthComponent {
            status: ComponentStatus::Unhealthy,
            details: None,
        };

        assert_eq!(overall_status([&healthy]), SystemStatus::Healthy);
        assert_eq!(overall_status([&healthy, &degraded]), SystemStatus::Degraded);
        assert_eq!(overall_status([&degraded, &down, &healthy]), SystemStatus::Unhealthy);
    }
}

//! Admission control state
//!
//! Three independent registries, one per risk profile. A client has a
//! separate budget in each.

pub mod bucket;
pub mod registry;

pub use self::bucket::{ClientLimiter, RateLimitResult, RatePolicy};
pub use self::registry::LimiterRegistry;

use crate::config::RateLimitSettings;

/// Admission tier a route is guarded by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    General,
    Sensitive,
    Upload,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::General, Tier::Sensitive, Tier::Upload];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::General => "general",
            Tier::Sensitive => "sensitive",
            Tier::Upload => "upload",
        }
    }
}

/// The registries for every tier
pub struct AdmissionRegistries {
    general: LimiterRegistry,
    sensitive: LimiterRegistry,
    upload: LimiterRegistry,
}

impl AdmissionRegistries {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            general: LimiterRegistry::new(Tier::General.as_str(), settings.general, settings.max_clients),
            sensitive: LimiterRegistry::new(
                Tier::Sensitive.as_str(),
                settings.sensitive,
                settings.max_clients,
            ),
            upload: LimiterRegistry::new(Tier::Upload.as_str(), settings.upload, settings.max_clients),
        }
    }

    pub fn get(&self, tier: Tier) -> &LimiterRegistry {
        match tier {
            Tier::General => &self.general,
            Tier::Sensitive => &self.sensitive,
            Tier::Upload => &self.upload,
        }
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::profile::dto::UserInfoPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Business,
}

impl Tier {
    /// Checks included per billing period.
    pub fn quota(self) -> u32 {
        match self {
            Tier::Free => 3,
            Tier::Pro => 20,
            Tier::Business => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Business => "business",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "business" => Ok(Tier::Business),
            other => Err(ClientError::Validation(format!("unknown plan {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub subscription_tier: Tier,
    pub checks_remaining: u32,
    pub total_checks_count: u32,
}

/// Remaining checks against the tier quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub remaining: u32,
    pub quota: u32,
    pub percent: u8,
}

impl Usage {
    pub fn is_low(&self) -> bool {
        self.percent < 20
    }
}

impl UserProfile {
    pub fn usage(&self) -> Usage {
        let quota = self.subscription_tier.quota();
        let percent = (u64::from(self.checks_remaining) * 100 / u64::from(quota)).min(100) as u8;
        Usage {
            remaining: self.checks_remaining,
            quota,
            percent,
        }
    }
}

impl From<UserInfoPayload> for UserProfile {
    fn from(p: UserInfoPayload) -> Self {
        let email = p
            .email
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| p.username.clone());
        Self {
            username: p.username,
            email,
            subscription_tier: p.profile.subscription_tier,
            checks_remaining: p.profile.checks_remaining.max(0) as u32,
            total_checks_count: p.profile.total_checks_count.max(0) as u32,
        }
    }
}

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;

/// Order status as reported by the logistics API.
///
/// The customer portal sees `PENDING`, `IN_WAREHOUSE`, `IN_TRANSIT`,
/// `DELIVERED` and `FAILED`; the driver app sees `ASSIGNED`, `IN_TRANSIT`,
/// `COMPLETED` and `FAILED`. Anything else is kept verbatim in `Unknown` so a
/// new server-side status never breaks deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    InWarehouse,
    InTransit,
    Delivered,
    Failed,
    Assigned,
    Completed,
    Unknown(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::InWarehouse => "IN_WAREHOUSE",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
            Self::Assigned => "ASSIGNED",
            Self::Completed => "COMPLETED",
            Self::Unknown(raw) => raw,
        }
    }

    /// Human readable label, `Unknown` for anything unrecognised.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InWarehouse => "In Warehouse",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
            Self::Failed => "Failed",
            Self::Assigned => "Assigned",
            Self::Completed => "Completed",
            Self::Unknown(_) => "Unknown",
        }
    }

    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Counted as pending work: not yet picked up by anyone.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending | Self::Assigned)
    }

    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Delivered | Self::Completed)
    }

    /// No further client-visible progress is expected without a new snapshot.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Completed | Self::Failed)
    }

    fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "IN_WAREHOUSE" => Self::InWarehouse,
            "IN_TRANSIT" => Self::InTransit,
            "DELIVERED" => Self::Delivered,
            "FAILED" => Self::Failed,
            "ASSIGNED" => Self::Assigned,
            "COMPLETED" => Self::Completed,
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_raw(s))
    }
}

impl Serialize for OrderStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

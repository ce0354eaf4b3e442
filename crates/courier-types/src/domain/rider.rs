use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiderStatus {
    Pending,
    Approved,
    Rejected,
}

impl RiderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiderStatus::Pending => "pending",
            RiderStatus::Approved => "approved",
            RiderStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RiderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RiderStatus::Pending),
            "approved" => Ok(RiderStatus::Approved),
            "rejected" => Ok(RiderStatus::Rejected),
            other => anyhow::bail!("unknown rider status {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkStatus {
    Available,
    #[serde(rename = "In Delivery")]
    InDelivery,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Available => "Available",
            WorkStatus::InDelivery => "In Delivery",
        }
    }
}

impl FromStr for WorkStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(WorkStatus::Available),
            "In Delivery" => Ok(WorkStatus::InDelivery),
            other => anyhow::bail!("unknown work status {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub rider_district: String,
    pub status: RiderStatus,
    pub work_status: WorkStatus,
    pub created_at: DateTime<Utc>,
}

impl Rider {
    pub fn new(name: String, email: String, rider_district: String) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            anyhow::bail!("name empty");
        }
        if !email.contains('@') {
            anyhow::bail!("invalid email");
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            email,
            rider_district,
            status: RiderStatus::Pending,
            work_status: WorkStatus::Available,
            created_at: Utc::now(),
        })
    }

    /// Only approved riders with no delivery in hand can take a parcel.
    pub fn can_take_parcel(&self) -> bool {
        self.status == RiderStatus::Approved && self.work_status == WorkStatus::Available
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiderQuery {
    pub status: Option<RiderStatus>,
    pub work_status: Option<WorkStatus>,
    pub district: Option<String>,
}

impl RiderQuery {
    pub fn matches(&self, rider: &Rider) -> bool {
        self.status.map_or(true, |s| rider.status == s)
            && self.work_status.map_or(true, |w| rider.work_status == w)
            && self
                .district
                .as_deref()
                .map_or(true, |d| rider.rider_district == d)
    }
}

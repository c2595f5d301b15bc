// ABOUTME: Wearable data models returned by the vendor data client
// ABOUTME: Daily activity summary, resting heart rate, device sync status, and profile

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Vendor account profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WearableProfile {
    /// Vendor-side user id
    pub encoded_id: String,
    /// Name shown in the vendor app
    pub display_name: String,
}

/// Latest device sync information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Vendor device id
    pub device_id: Option<String>,
    /// Device model name
    pub device_version: Option<String>,
    /// Battery level in percent
    pub battery_level: Option<u32>,
    /// Last time the device synced
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Minutes since the last sync
    pub sync_age_minutes: Option<i64>,
    /// Synced within the recent window
    pub is_recent_sync: bool,
}

/// One day of wearable activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Day the summary covers
    pub date: NaiveDate,
    /// Step count
    pub steps: u64,
    /// Calories burned
    pub calories_out: u64,
    /// Total distance in the account's unit
    pub distance: f64,
    /// Fairly plus very active minutes
    pub active_minutes: u64,
    /// Resting heart rate, if the heart endpoint answered
    pub resting_heart_rate: Option<u32>,
    /// Device status, if the devices endpoint answered
    pub device: Option<DeviceStatus>,
}

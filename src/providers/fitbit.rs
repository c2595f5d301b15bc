// ABOUTME: Fitbit Web API data client for profile, daily activity, heart rate, and device sync status
// ABOUTME: All requests go through the resilient client so token refresh and backoff apply uniformly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::providers::resilient::ResilientApiClient;
use crate::utils::clock::Clock;
use vitalsync_core::constants::vendor::RECENT_SYNC_MINUTES;
use vitalsync_core::errors::VendorApiError;
use vitalsync_core::models::{DailySummary, DeviceStatus, WearableProfile};

/// Fitbit user profile API response wrapper
#[derive(Debug, Deserialize)]
struct FitbitUserResponse {
    user: FitbitUserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FitbitUserProfile {
    encoded_id: String,
    #[serde(default)]
    display_name: String,
}

/// Daily activity API response
#[derive(Debug, Deserialize)]
struct FitbitActivityResponse {
    #[serde(default)]
    summary: FitbitActivitySummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FitbitActivitySummary {
    #[serde(default)]
    steps: u64,
    #[serde(default)]
    calories_out: u64,
    #[serde(default)]
    fairly_active_minutes: u64,
    #[serde(default)]
    very_active_minutes: u64,
    #[serde(default)]
    distances: Vec<FitbitDistance>,
}

#[derive(Debug, Deserialize)]
struct FitbitDistance {
    activity: String,
    #[serde(default)]
    distance: f64,
}

/// Heart rate time series response
#[derive(Debug, Deserialize)]
struct FitbitHeartResponse {
    #[serde(rename = "activities-heart", default)]
    activities_heart: Vec<FitbitHeartDay>,
}

#[derive(Debug, Deserialize)]
struct FitbitHeartDay {
    value: FitbitHeartValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FitbitHeartValue {
    resting_heart_rate: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FitbitDevice {
    id: Option<String>,
    device_version: Option<String>,
    battery_level: Option<u32>,
    last_sync_time: Option<String>,
}

/// Typed access to the Fitbit endpoints the dashboard reads
#[derive(Clone)]
pub struct FitbitDataClient {
    api: ResilientApiClient,
    clock: Arc<dyn Clock>,
}

impl FitbitDataClient {
    /// Create a data client
    #[must_use]
    pub fn new(api: ResilientApiClient, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    /// Profile of the connected account
    ///
    /// # Errors
    ///
    /// Any [`VendorApiError`] from the underlying call.
    pub async fn profile(&self, user_id: &str) -> Result<WearableProfile, VendorApiError> {
        let response: FitbitUserResponse = self.api.call(user_id, "/1/user/-/profile.json").await?;
        Ok(WearableProfile {
            encoded_id: response.user.encoded_id,
            display_name: response.user.display_name,
        })
    }

    /// Activity summary for `date`, with heart rate and device status when available
    ///
    /// The activity summary is required. Heart rate and devices are best-effort:
    /// their failures are dropped, except a lost connection which always propagates.
    ///
    /// # Errors
    ///
    /// Any [`VendorApiError`] from the activity call, or
    /// [`VendorApiError::NeedsReconnect`] from any call.
    pub async fn daily_summary(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<DailySummary, VendorApiError> {
        let day = date.format("%Y-%m-%d").to_string();
        let activity_path = format!("/1/user/-/activities/date/{day}.json");
        let heart_path = format!("/1/user/-/activities/heart/date/{day}/1d.json");

        let (activity, heart, devices) = tokio::join!(
            self.api.call::<FitbitActivityResponse>(user_id, &activity_path),
            self.api.call::<FitbitHeartResponse>(user_id, &heart_path),
            self.api
                .call::<Vec<FitbitDevice>>(user_id, "/1/user/-/devices.json"),
        );

        let summary = activity?.summary;
        let resting_heart_rate = optional(user_id, "heart rate", heart)?
            .and_then(|heart| heart.activities_heart.into_iter().next())
            .and_then(|day| day.value.resting_heart_rate);
        let device = optional(user_id, "devices", devices)?
            .and_then(|devices| devices.into_iter().next())
            .map(|device| self.device_status(device));

        let daily = DailySummary {
            date,
            steps: summary.steps,
            calories_out: summary.calories_out,
            distance: total_distance(&summary.distances),
            active_minutes: summary.fairly_active_minutes + summary.very_active_minutes,
            resting_heart_rate,
            device,
        };

        info!(
            user_id = %user_id,
            date = %date,
            steps = daily.steps,
            has_heart_rate = daily.resting_heart_rate.is_some(),
            has_device = daily.device.is_some(),
            "Fetched daily summary"
        );
        Ok(daily)
    }

    fn device_status(&self, device: FitbitDevice) -> DeviceStatus {
        let last_sync_time = device.last_sync_time.as_deref().and_then(parse_sync_time);
        let sync_age_minutes =
            last_sync_time.map(|synced| (self.clock.now() - synced).num_minutes());

        DeviceStatus {
            device_id: device.id,
            device_version: device.device_version,
            battery_level: device.battery_level,
            last_sync_time,
            sync_age_minutes,
            is_recent_sync: sync_age_minutes.is_some_and(|age| age < RECENT_SYNC_MINUTES),
        }
    }
}

/// Keep a best-effort result, but never swallow a lost connection
fn optional<T>(
    user_id: &str,
    what: &str,
    result: Result<T, VendorApiError>,
) -> Result<Option<T>, VendorApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(VendorApiError::NeedsReconnect) => Err(VendorApiError::NeedsReconnect),
        Err(error) => {
            debug!(user_id = %user_id, error = %error, "{what} data not available");
            Ok(None)
        }
    }
}

/// The "total" distance entry, else the first entry, else zero
fn total_distance(distances: &[FitbitDistance]) -> f64 {
    distances
        .iter()
        .find(|d| d.activity == "total")
        .or_else(|| distances.first())
        .map_or(0.0, |d| d.distance)
}

/// Device sync times carry no offset; they are read as UTC
fn parse_sync_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

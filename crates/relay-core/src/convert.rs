// ── API-to-domain type conversions ──
//
// Bridges raw `relay_api` REST types into canonical `relay_core::model`
// types, and request payloads back into wire bodies. Wire vocabulary
// (enablement, source, tak) stops here.

use chrono::{DateTime, NaiveDateTime, Utc};

use relay_api::models::{
    EnablementCreate, EnablementResponse, EnablementTypeInfo, EnablementUpdate, KnownSource,
    SourceCreate, SourceEndpoint, SourceResponse, SourceUpdate, TakConfigResponse,
    TakConfigUpdate, TakStatusResponse,
};

use crate::command::{
    CreateFeedRequest, CreateJobRequest, UpdateBrokerRequest, UpdateFeedRequest, UpdateJobRequest,
};

use crate::model::{
    BrokerSettings, BrokerStatus, Feed, FeedEndpoint, FeedId, FeedTemplate, GeoBounds, Job, JobId,
    JobType,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive ISO-8601 date-time which
/// the backend emits for UTC values.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_optional(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_timestamp)
}

// ── Job ────────────────────────────────────────────────────────────

impl From<EnablementResponse> for Job {
    fn from(e: EnablementResponse) -> Self {
        let geo_bounds = match (
            e.geo_filter_min_lat,
            e.geo_filter_max_lat,
            e.geo_filter_min_lon,
            e.geo_filter_max_lon,
        ) {
            (Some(min_lat), Some(max_lat), Some(min_lon), Some(max_lon)) => Some(GeoBounds {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            }),
            _ => None,
        };

        Job {
            id: JobId(e.id),
            kind: e.type_id,
            name: e.name,
            enabled: e.enabled,
            running: e.running,
            stale_after_secs: e.cot_stale,
            altitude_ceiling: e.alt_upper,
            altitude_floor: e.alt_lower,
            uid_key: e.uid_key,
            geo_bounds,
            created_at: parse_timestamp(&e.created_at),
            updated_at: parse_timestamp(&e.updated_at),
            feeds: e.sources.into_iter().map(Feed::from).collect(),
        }
    }
}

impl From<EnablementTypeInfo> for JobType {
    fn from(t: EnablementTypeInfo) -> Self {
        JobType {
            kind: t.type_id,
            display_name: t.display_name,
            description: t.description,
        }
    }
}

// ── Feed ───────────────────────────────────────────────────────────

impl From<SourceEndpoint> for FeedEndpoint {
    fn from(e: SourceEndpoint) -> Self {
        match e {
            SourceEndpoint::Geo => Self::Geo,
            SourceEndpoint::Point => Self::Point,
            SourceEndpoint::Mil => Self::Mil,
        }
    }
}

impl From<FeedEndpoint> for SourceEndpoint {
    fn from(e: FeedEndpoint) -> Self {
        match e {
            FeedEndpoint::Geo => Self::Geo,
            FeedEndpoint::Point => Self::Point,
            FeedEndpoint::Mil => Self::Mil,
        }
    }
}

impl From<SourceResponse> for Feed {
    fn from(s: SourceResponse) -> Self {
        Feed {
            id: FeedId(s.id),
            job_id: JobId(s.enablement_id),
            name: s.name,
            base_url: s.base_url,
            endpoint: s.endpoint.into(),
            poll_interval_secs: s.sleep_interval,
            lat: s.lat,
            lon: s.lon,
            distance: s.distance,
            enabled: s.enabled,
            created_at: parse_timestamp(&s.created_at),
        }
    }
}

impl From<KnownSource> for FeedTemplate {
    fn from(k: KnownSource) -> Self {
        FeedTemplate {
            name: k.name,
            base_url: k.base_url,
            endpoint: k.endpoint.into(),
            poll_interval_secs: k.sleep_interval,
            lat: k.lat,
            lon: k.lon,
            distance: k.distance,
        }
    }
}

// ── Broker ─────────────────────────────────────────────────────────

impl From<TakConfigResponse> for BrokerSettings {
    fn from(c: TakConfigResponse) -> Self {
        BrokerSettings {
            endpoint: c.cot_url,
            client_cert_path: c.cert_path,
            host_id: c.cot_host_id,
            skip_hostname_check: c.dont_check_hostname,
            skip_verify: c.dont_verify,
            max_out_queue: c.max_out_queue,
            max_in_queue: c.max_in_queue,
            updated_at: parse_optional(c.updated_at.as_deref()),
        }
    }
}

// ── Requests ───────────────────────────────────────────────────────

/// Split optional bounds into the four nullable wire columns.
fn geo_columns(bounds: Option<GeoBounds>) -> [Option<f64>; 4] {
    match bounds {
        Some(b) => [Some(b.min_lat), Some(b.max_lat), Some(b.min_lon), Some(b.max_lon)],
        None => [None; 4],
    }
}

impl From<CreateJobRequest> for EnablementCreate {
    fn from(r: CreateJobRequest) -> Self {
        let [min_lat, max_lat, min_lon, max_lon] = geo_columns(r.geo_bounds);
        EnablementCreate {
            type_id: r.kind,
            name: r.name,
            enabled: r.enabled,
            cot_stale: r.stale_after_secs,
            alt_upper: r.altitude_ceiling,
            alt_lower: r.altitude_floor,
            uid_key: r.uid_key,
            geo_filter_min_lat: min_lat,
            geo_filter_max_lat: max_lat,
            geo_filter_min_lon: min_lon,
            geo_filter_max_lon: max_lon,
        }
    }
}

impl From<UpdateJobRequest> for EnablementUpdate {
    fn from(r: UpdateJobRequest) -> Self {
        let [min_lat, max_lat, min_lon, max_lon] = geo_columns(r.geo_bounds);
        EnablementUpdate {
            name: r.name,
            enabled: r.enabled,
            cot_stale: r.stale_after_secs,
            alt_upper: r.altitude_ceiling,
            alt_lower: r.altitude_floor,
            uid_key: r.uid_key,
            geo_filter_min_lat: min_lat,
            geo_filter_max_lat: max_lat,
            geo_filter_min_lon: min_lon,
            geo_filter_max_lon: max_lon,
        }
    }
}

impl From<CreateFeedRequest> for SourceCreate {
    fn from(r: CreateFeedRequest) -> Self {
        SourceCreate {
            name: r.name,
            base_url: r.base_url,
            endpoint: r.endpoint.map(SourceEndpoint::from),
            sleep_interval: r.poll_interval_secs,
            lat: r.lat,
            lon: r.lon,
            distance: r.distance,
            enabled: r.enabled,
        }
    }
}

impl From<UpdateFeedRequest> for SourceUpdate {
    fn from(r: UpdateFeedRequest) -> Self {
        SourceUpdate {
            name: r.name,
            base_url: r.base_url,
            endpoint: r.endpoint.map(SourceEndpoint::from),
            sleep_interval: r.poll_interval_secs,
            lat: r.lat,
            lon: r.lon,
            distance: r.distance,
            enabled: r.enabled,
        }
    }
}

impl From<UpdateBrokerRequest> for TakConfigUpdate {
    fn from(r: UpdateBrokerRequest) -> Self {
        TakConfigUpdate {
            cot_url: r.endpoint,
            cert_path: r.client_cert_path,
            cot_host_id: r.host_id,
            dont_check_hostname: r.skip_hostname_check,
            dont_verify: r.skip_verify,
            max_out_queue: r.max_out_queue,
            max_in_queue: r.max_in_queue,
        }
    }
}

impl From<TakStatusResponse> for BrokerStatus {
    fn from(s: TakStatusResponse) -> Self {
        BrokerStatus {
            connected: s.connected,
            endpoint: s.url,
            queue_depth: s.queue_size,
        }
    }
}

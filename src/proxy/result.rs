use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Geolocation payload, named after the provider's wire fields.
///
/// Every field is optional: the provider omits whatever it does not know,
/// and failure results carry whatever it echoed back (usually `query`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoRecord {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// UTC offset in seconds.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(rename = "as", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub autonomous_system: Option<String>,
    /// The address the provider looked up.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Reads an optional field, treating a value of the wrong type as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Normalized outcome of one lookup.
///
/// On the wire both variants collapse into one flat object whose `status`
/// field is either `"success"` or `"fail"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResult", from = "WireResult")]
pub enum LookupResult {
    Success(GeoRecord),
    Fail {
        message: Option<String>,
        record: GeoRecord,
    },
}

impl LookupResult {
    /// Success without any payload, used to answer keepalive pings.
    pub fn empty_success() -> Self {
        LookupResult::Success(GeoRecord::default())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        LookupResult::Fail {
            message: Some(message.into()),
            record: GeoRecord::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LookupResult::Success(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            LookupResult::Success(_) => None,
            LookupResult::Fail { message, .. } => message.as_deref(),
        }
    }

    pub fn record(&self) -> &GeoRecord {
        match self {
            LookupResult::Success(record) | LookupResult::Fail { record, .. } => record,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Fail,
}

#[derive(Serialize, Deserialize)]
struct WireResult {
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    record: GeoRecord,
}

impl From<LookupResult> for WireResult {
    fn from(result: LookupResult) -> Self {
        match result {
            LookupResult::Success(record) => WireResult {
                status: Status::Success,
                message: None,
                record,
            },
            LookupResult::Fail { message, record } => WireResult {
                status: Status::Fail,
                message,
                record,
            },
        }
    }
}

impl From<WireResult> for LookupResult {
    fn from(wire: WireResult) -> Self {
        match wire.status {
            Status::Success => LookupResult::Success(wire.record),
            Status::Fail => LookupResult::Fail {
                message: wire.message,
                record: wire.record,
            },
        }
    }
}

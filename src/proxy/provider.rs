use std::net::IpAddr;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, config::Provider};

use super::{
    http_client::{FetchError, Fetched, HttpClient},
    result::{GeoRecord, LookupResult, lenient},
};

const SUCCESS: &str = "success";

/// Client for an ip-api.com compatible `/json/{ip}` endpoint.
#[derive(Clone)]
pub struct IpApi {
    client: HttpClient,
    name: String,
    base_url: String,
    fields: String,
}

impl IpApi {
    pub fn new(config: &Provider) -> Result<Self, Error> {
        Ok(Self {
            client: HttpClient::new(config.timeout())?,
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fields: config.fields.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn url(&self, ip: IpAddr) -> String {
        format!(
            "{base}/{ip}?fields={fields}",
            base = self.base_url,
            fields = self.fields
        )
    }

    pub async fn lookup(&self, ip: IpAddr) -> Result<Fetched, Error> {
        let url = self.url(ip);
        debug!("GET {}", url);
        self.client.get_text(&url).await.map_err(|err| match err {
            FetchError::Timeout => Error::UpstreamTimeout {
                provider: self.name.clone(),
                ip,
            },
            FetchError::Transport(source) => Error::UpstreamUnreachable {
                provider: self.name.clone(),
                ip,
                source,
            },
            FetchError::Body(source) => Error::UpstreamRead {
                provider: self.name.clone(),
                ip,
                source,
            },
        })
    }

    /// Any JSON object decodes; payload fields of the wrong type are dropped.
    pub fn decode(&self, ip: IpAddr, body: &str) -> Result<ProviderReply, Error> {
        serde_json::from_str::<Map<String, Value>>(body)
            .and_then(|object| ProviderReply::deserialize(Value::Object(object)))
            .map_err(|source| Error::UpstreamBody {
                provider: self.name.clone(),
                ip,
                source,
            })
    }
}

/// A 2xx reply body as the provider sends it.
#[derive(Debug, Deserialize)]
pub struct ProviderReply {
    /// Kept loose: anything other than the string `"success"` is a failure.
    #[serde(default)]
    status: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    message: Option<String>,
    #[serde(flatten)]
    record: GeoRecord,
}

impl ProviderReply {
    pub fn is_success(&self) -> bool {
        matches!(&self.status, Some(Value::String(s)) if s == SUCCESS)
    }

    pub fn into_result(self) -> LookupResult {
        if self.is_success() {
            LookupResult::Success(self.record)
        } else {
            LookupResult::Fail {
                message: self.message,
                record: self.record,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(9, 9, 9, 9));

    fn provider() -> IpApi {
        IpApi::new(&Provider {
            base_url: String::from("http://ip-api.com/json/"),
            ..Provider::default()
        })
        .unwrap()
    }

    #[test]
    fn url_embeds_address_and_fields() {
        let api = provider();
        assert_eq!(
            api.url("9.9.9.9".parse().unwrap()),
            "http://ip-api.com/json/9.9.9.9?fields=status,message,country,regionName,city,zip,lat,lon,timezone,offset,isp,org,as,query"
        );
        assert!(
            api.url("2001:db8::1".parse().unwrap())
                .starts_with("http://ip-api.com/json/2001:db8::1?fields=")
        );
    }

    #[test]
    fn success_reply_becomes_success() {
        let reply = provider()
            .decode(IP, r#"{"status":"success","country":"Testland","lat":1.5,"query":"9.9.9.9"}"#)
            .unwrap();
        let result = reply.into_result();
        assert!(result.is_success());
        assert_eq!(result.record().country.as_deref(), Some("Testland"));
        assert_eq!(result.record().lat, Some(1.5));
    }

    #[test]
    fn fail_reply_keeps_message() {
        let reply = provider()
            .decode(IP, r#"{"status":"fail","message":"reserved range","query":"10.0.0.1"}"#)
            .unwrap();
        let result = reply.into_result();
        assert_eq!(result.message(), Some("reserved range"));
        assert_eq!(result.record().query.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn missing_or_odd_status_is_failure() {
        let api = provider();
        assert!(!api.decode(IP, r#"{"country":"Testland"}"#).unwrap().is_success());
        assert!(!api.decode(IP, r#"{"status":1}"#).unwrap().is_success());
        assert!(!api.decode(IP, r#"{"status":"SUCCESS"}"#).unwrap().is_success());
    }

    #[test]
    fn wrong_typed_field_keeps_status_and_message() {
        let reply = provider()
            .decode(IP, r#"{"status":"fail","message":"reserved range","lat":"x","query":"10.0.0.1"}"#)
            .unwrap();
        assert!(!reply.is_success());
        let result = reply.into_result();
        assert_eq!(result.message(), Some("reserved range"));
        assert_eq!(result.record().lat, None);
        assert_eq!(result.record().query.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn wrong_typed_field_in_success_is_dropped() {
        let reply = provider()
            .decode(IP, r#"{"status":"success","country":"Testland","offset":"+1"}"#)
            .unwrap();
        let result = reply.into_result();
        assert!(result.is_success());
        assert_eq!(result.record().offset, None);
        assert_eq!(result.record().country.as_deref(), Some("Testland"));
    }

    #[test]
    fn non_object_body_is_an_error() {
        assert!(provider().decode(IP, "[1,2,3]").is_err());
        assert!(provider().decode(IP, "\"success\"").is_err());
    }

    #[test]
    fn non_json_body_is_an_error() {
        let err = provider().decode(IP, "<html>busy</html>").unwrap_err();
        assert!(matches!(err, Error::UpstreamBody { .. }));
    }
}

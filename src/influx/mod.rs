use crate::config::CONFIG;
use log::{debug, error, info};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{Receiver, Sender};

/// Custom error types for the InfluxDB sink
#[derive(Error, Debug)]
pub enum InfluxError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Write rejected with status {0}: {1}")]
    WriteRejected(u16, String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// Render the value the way the line protocol expects it:
    /// integers get an `i` suffix, strings get quoted and escaped.
    pub fn to_line_value(&self) -> String {
        return match self {
            FieldValue::Float(v) => format!("{}", v),
            FieldValue::Integer(v) => format!("{}i", v),
            FieldValue::Text(v) => format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")),
        };
    }
}

/* Measurement names escape commas and spaces, tag/field keys additionally the equals sign */
fn escape_measurement(name: &str) -> String {
    return name.replace(',', "\\,").replace(' ', "\\ ");
}

fn escape_key(name: &str) -> String {
    return name.replace(',', "\\,").replace(' ', "\\ ").replace('=', "\\=");
}

#[derive(Debug, Clone)]
pub struct DataPoint {
    pub measurement: String,
    pub field: String,
    pub value: FieldValue,
    pub tags: Vec<(String, String)>,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

impl DataPoint {
    pub fn new(measurement: &str, field: &str, value: FieldValue, tags: Vec<(String, String)>, timestamp: i64) -> Self {
        return DataPoint {
            measurement: measurement.to_string(),
            field: field.to_string(),
            value,
            tags,
            timestamp,
        };
    }

    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);
        for (key, value) in self.tags.iter() {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');
        line.push_str(&escape_key(&self.field));
        line.push('=');
        line.push_str(&self.value.to_line_value());
        line.push(' ');
        line.push_str(&self.timestamp.to_string());
        return line;
    }
}

/// Writer for the InfluxDB v2 write API, one point per call.
pub struct InfluxSender {
    client: Client,
    write_url: String,
    token: String,
}

impl InfluxSender {
    pub fn new(url: &str, token: &str, org: &str, bucket: &str) -> Result<Self, InfluxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let write_url = format!(
            "{}/api/v2/write?org={}&bucket={}&precision=s",
            url.trim_end_matches('/'),
            org,
            bucket
        );

        return Ok(InfluxSender { client, write_url, token: token.to_string() });
    }

    pub async fn send_telemetry(&self, point: &DataPoint) -> Result<(), InfluxError> {
        let line = point.to_line_protocol();
        debug!("Writing line: {line}");

        let response = self.client
            .post(&self.write_url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InfluxError::WriteRejected(status.as_u16(), body));
        }

        return Ok(());
    }
}

/// Receives data points from the metering side and writes them out.
/// Write failures are logged here and never reach the polling loop.
pub struct InfluxManager {
    rx: Receiver<DataPoint>,
    writer: InfluxSender,
    exit_thread: bool,
}

impl InfluxManager {
    pub fn new() -> Result<(Self, Sender<DataPoint>), InfluxError> {
        let (tx, rx) = tokio::sync::mpsc::channel(100);

        info!("InfluxDB sink starting up");
        let conf = CONFIG.influx.clone();
        let writer = InfluxSender::new(&conf.url, &conf.token, &conf.org, &conf.bucket)?;

        return Ok((InfluxManager {
            rx,
            writer,
            exit_thread: false,
        }, tx));
    }

    pub async fn start_thread(&mut self) {
        while !self.exit_thread {
            let option = self.rx.recv().await;

            if option.is_none() {
                debug!("Reading returned none, we exit now");
                self.exit_thread = true;
                continue;
            }

            let point = option.unwrap();
            match self.writer.send_telemetry(&point).await {
                Ok(_) => { debug!("Point {} written successfully", point.field); },
                Err(e) => { error!("Error writing point {}: {}", point.field, e); },
            }
        }

        info!("Influx thread exit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_line_protocol_float() {
        let point = DataPoint::new("EchonetLite", "MeasuredInstantaneous", FieldValue::Float(423.0), Vec::new(), 1700000000);
        assert_eq!(point.to_line_protocol(), "EchonetLite MeasuredInstantaneous=423 1700000000");
    }

    #[test]
    fn test_line_protocol_integer() {
        let point = DataPoint::new("EchonetLite", "Coefficient", FieldValue::Integer(1), Vec::new(), 1700000000);
        assert_eq!(point.to_line_protocol(), "EchonetLite Coefficient=1i 1700000000");
    }

    #[test]
    fn test_line_protocol_text() {
        let point = DataPoint::new("EchonetLite", "CumulativeElectricEnergyUnit", FieldValue::Text("01".to_string()), Vec::new(), 1700000000);
        assert_eq!(point.to_line_protocol(), "EchonetLite CumulativeElectricEnergyUnit=\"01\" 1700000000");
    }

    #[test]
    fn test_line_protocol_tags_and_escaping() {
        let point = DataPoint::new(
            "my measurement",
            "some field",
            FieldValue::Text("say \"hi\"".to_string()),
            vec![("room".to_string(), "living room".to_string())],
            1700000000,
        );
        assert_eq!(
            point.to_line_protocol(),
            "my\\ measurement,room=living\\ room some\\ field=\"say \\\"hi\\\"\" 1700000000"
        );
    }

    #[tokio::test]
    async fn test_send_telemetry_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("org".into(), "home".into()),
                Matcher::UrlEncoded("bucket".into(), "energy".into()),
                Matcher::UrlEncoded("precision".into(), "s".into()),
            ]))
            .match_header("authorization", "Token test-token")
            .match_body("EchonetLite Coefficient=1i 1700000000")
            .with_status(204)
            .create_async()
            .await;

        let writer = InfluxSender::new(&server.url(), "test-token", "home", "energy").unwrap();
        let point = DataPoint::new("EchonetLite", "Coefficient", FieldValue::Integer(1), Vec::new(), 1700000000);
        writer.send_telemetry(&point).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_telemetry_rejected() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let writer = InfluxSender::new(&server.url(), "bad-token", "home", "energy").unwrap();
        let point = DataPoint::new("EchonetLite", "Coefficient", FieldValue::Integer(1), Vec::new(), 1700000000);
        let result = writer.send_telemetry(&point).await;
        assert!(matches!(result, Err(InfluxError::WriteRejected(401, _))));
        mock.assert_async().await;
    }
}

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;
use url::form_urlencoded;

use crate::config::Settings;

const LINE_PROTOCOL_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
}

/// Why a single push did not land. Never fatal; the next cycle tries again.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("HTTP error: {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("Failed to send data: {0}")]
    Transport(String),
}

pub trait MetricsSink {
    fn push(&self, payload: &str) -> Result<(), PushError>;
}

/// InfluxDB v2 write endpoint. Each push is a single POST on a fresh
/// connection; nothing is retried or queued.
pub struct InfluxSink {
    client: Client,
    endpoint: String,
    write_url: String,
    authorization: String,
}

impl InfluxSink {
    /// Host and port are not validated here; an unusable address shows up as
    /// a transport failure on each push.
    pub fn new(settings: &Settings) -> Result<Self, SinkError> {
        let client = Client::builder().pool_max_idle_per_host(0).build()?;
        let endpoint = format!("{}:{}", settings.influx_host, settings.influx_port);
        let write_url = format!(
            "http://{endpoint}/api/v2/write?org={}&bucket={}&precision=ns",
            query_value(&settings.influx_org),
            query_value(&settings.influx_bucket),
        );
        Ok(Self {
            client,
            endpoint,
            write_url,
            authorization: format!("Token {}", settings.influx_token),
        })
    }

    /// `host:port`, for log lines.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[cfg(test)]
    fn write_url(&self) -> &str {
        &self.write_url
    }
}

impl MetricsSink for InfluxSink {
    fn push(&self, payload: &str) -> Result<(), PushError> {
        tracing::debug!(url = %self.write_url, bytes = payload.len(), "writing line protocol");
        let response = self
            .client
            .post(&self.write_url)
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, LINE_PROTOCOL_CONTENT_TYPE)
            .body(payload.to_owned())
            .send()
            .map_err(|err| PushError::Transport(err.to_string()))?;

        let status = response.status();
        tracing::debug!(status = %status, "write response");
        if !status.is_success() {
            return Err(PushError::Status {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("Unrecognized Status")
                    .to_string(),
            });
        }
        Ok(())
    }
}

fn query_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    #[derive(Debug)]
    pub(crate) struct CapturedRequest {
        pub request_line: String,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl CapturedRequest {
        pub(crate) fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Answers `responses.len()` requests with the given status codes, one
    /// connection each, and hands back what it received.
    pub(crate) fn spawn_responder(
        responses: Vec<u16>,
    ) -> (u16, mpsc::Receiver<CapturedRequest>, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            for status in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut headers = Vec::new();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((key, value)) = line.split_once(':') {
                        headers.push((key.trim().to_string(), value.trim().to_string()));
                    }
                }
                let length = headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.parse::<usize>().ok())
                    .unwrap_or(0);
                let mut body = vec![0u8; length];
                reader.read_exact(&mut body).unwrap();

                let mut stream = stream;
                write!(
                    stream,
                    "HTTP/1.1 {status} Test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                )
                .unwrap();
                stream.flush().unwrap();

                let _ = tx.send(CapturedRequest {
                    request_line: request_line.trim_end().to_string(),
                    headers,
                    body: String::from_utf8(body).unwrap(),
                });
            }
        });
        (port, rx, handle)
    }

    pub(crate) fn settings_for(port: u16) -> Settings {
        Settings {
            measurement: "vr_battery".to_string(),
            influx_host: "127.0.0.1".to_string(),
            influx_port: port,
            influx_org: "home".to_string(),
            influx_bucket: "vr".to_string(),
            influx_token: "s3cret".to_string(),
            interval_seconds: 30,
        }
    }

    #[test]
    fn builds_v2_write_url() {
        let mut settings = settings_for(8086);
        settings.influx_org = "home lab".to_string();
        let sink = InfluxSink::new(&settings).unwrap();
        assert_eq!(sink.endpoint(), "127.0.0.1:8086");
        assert_eq!(
            sink.write_url(),
            "http://127.0.0.1:8086/api/v2/write?org=home+lab&bucket=vr&precision=ns"
        );
    }

    #[test]
    fn posts_payload_with_token_and_content_type() {
        let (port, rx, handle) = spawn_responder(vec![204]);
        let sink = InfluxSink::new(&settings_for(port)).unwrap();

        let payload = "vr_battery,serial=A,type=hmd battery=50.00 1\n";
        sink.push(payload).unwrap();
        handle.join().unwrap();

        let request = rx.recv().unwrap();
        assert_eq!(
            request.request_line,
            "POST /api/v2/write?org=home&bucket=vr&precision=ns HTTP/1.1"
        );
        assert_eq!(request.header("authorization"), Some("Token s3cret"));
        assert_eq!(
            request.header("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(request.body, payload);
    }

    #[test]
    fn non_2xx_status_is_a_failure_naming_the_code() {
        let (port, _rx, handle) = spawn_responder(vec![503]);
        let sink = InfluxSink::new(&settings_for(port)).unwrap();

        let err = sink.push("m,serial=A,type=hmd battery=1.00 1\n").unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, PushError::Status { status: 503, .. }));
        assert_eq!(err.to_string(), "HTTP error: 503 Service Unavailable");
    }

    #[test]
    fn redirects_are_not_success() {
        let (port, _rx, handle) = spawn_responder(vec![304]);
        let sink = InfluxSink::new(&settings_for(port)).unwrap();

        let err = sink.push("m,serial=A,type=hmd battery=1.00 1\n").unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, PushError::Status { status: 304, .. }));
    }

    #[test]
    fn refused_connection_is_a_transport_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let sink = InfluxSink::new(&settings_for(port)).unwrap();

        let err = sink.push("m,serial=A,type=hmd battery=1.00 1\n").unwrap_err();
        assert!(matches!(err, PushError::Transport(_)));
    }

    #[test]
    fn zero_valued_settings_construct_but_fail_to_push() {
        let sink = InfluxSink::new(&Settings::default()).unwrap();
        assert_eq!(sink.endpoint(), ":0");
        assert!(matches!(
            sink.push("m,serial=A,type=hmd battery=1.00 1\n"),
            Err(PushError::Transport(_))
        ));
    }
}

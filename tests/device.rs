//! End-to-end tests against a fake device listening on loopback.
//!
//! The fake accepts one frame per connection, records it, answers with
//! whatever the test's responder builds and closes the connection.

use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tuya31::protocol::{PREFIX, SUFFIX};
use tuya31::{Device, DeviceBuilder, DeviceKind, PayloadCodec, PowerState, TuyaError};

const ID: &str = "bf0123456789abcdef";
const KEY: &str = "0123456789abcdef";

#[derive(Debug, Clone)]
struct Request {
    cmd: u8,
    payload: Vec<u8>,
}

struct FakeDevice {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FakeDevice {
    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn builder(&self) -> DeviceBuilder {
        DeviceBuilder::new(ID, KEY)
            .host("127.0.0.1")
            .port(self.addr.port())
            .retries(2)
            .retry_delay(Duration::ZERO)
            .timeout(Duration::from_secs(2))
    }

    fn device(&self) -> Device {
        self.builder().build().unwrap()
    }
}

async fn spawn_device<F>(respond: F) -> FakeDevice
where
    F: Fn(&Request) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut header = [0u8; 16];
            if socket.read_exact(&mut header).await.is_err() {
                continue;
            }
            let len = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);
            let mut body = vec![0u8; len as usize];
            if socket.read_exact(&mut body).await.is_err() {
                continue;
            }
            assert_eq!(&body[body.len() - 8..], &SUFFIX);
            body.truncate(body.len() - 8);

            let request = Request {
                cmd: header[11],
                payload: body,
            };
            let reply = respond(&request);
            recorded.lock().unwrap().push(request);

            let _ = socket.write_all(&reply).await;
            let _ = socket.shutdown().await;
        }
    });

    FakeDevice { addr, requests }
}

/// Response frame as a device sends it: a zeroed reserved word after the length
/// and a placeholder checksum in the first half of the suffix.
fn response_frame(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = PREFIX[..11].to_vec();
    data.push(cmd);
    data.extend_from_slice(&((payload.len() + 12) as u32).to_be_bytes());
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(payload);
    data.extend_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    data.extend_from_slice(&SUFFIX[4..]);
    data
}

fn status_frame(dps: Value) -> Vec<u8> {
    let body = json!({ "devId": ID, "dps": dps });
    response_frame(0x0a, body.to_string().as_bytes())
}

fn opened_dps(request: &Request) -> Value {
    let codec = PayloadCodec::new(KEY.as_bytes(), "3.1").unwrap();
    codec.open(&request.payload).unwrap()["dps"].clone()
}

#[tokio::test]
async fn get_reports_power_on() {
    let fake = spawn_device(|_| status_frame(json!({"1": true, "2": 0}))).await;
    let device = fake.device();

    assert_eq!(device.get().await.unwrap(), PowerState::On);
    assert_eq!(device.state(), PowerState::On);
    assert_eq!(device.last_error(), None);
    assert_eq!(device.error_code(), 0);

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].cmd, 0x0a);
    let query: Value = serde_json::from_slice(&requests[0].payload).unwrap();
    assert_eq!(query, json!({"gwId": ID, "devId": ID}));
}

#[tokio::test]
async fn get_reports_power_off() {
    let fake = spawn_device(|_| status_frame(json!({"1": false}))).await;
    assert_eq!(fake.device().get().await.unwrap(), PowerState::Off);
}

#[tokio::test]
async fn get_without_power_dp_is_a_parse_error() {
    let fake = spawn_device(|_| status_frame(json!({"2": 0}))).await;
    let device = fake.device();

    assert!(matches!(device.get().await, Err(TuyaError::Parse(_))));
    assert_eq!(device.error_code(), 5);
    // Parse errors are not retried.
    assert_eq!(fake.requests().len(), 1);
}

#[tokio::test]
async fn get_with_non_boolean_power_is_a_parse_error() {
    let fake = spawn_device(|_| status_frame(json!({"1": "on"}))).await;
    assert!(matches!(fake.device().get().await, Err(TuyaError::Parse(_))));
}

#[tokio::test]
async fn get_with_invalid_json_is_a_parse_error() {
    let fake = spawn_device(|_| response_frame(0x0a, b"data format error")).await;
    assert!(matches!(fake.device().get().await, Err(TuyaError::Parse(_))));
}

#[tokio::test]
async fn set_sends_signed_encrypted_control() {
    let fake = spawn_device(|_| response_frame(0x07, b"")).await;
    let device = fake.device();

    device.set(true).await.unwrap();
    assert_eq!(device.state(), PowerState::On);
    assert_eq!(device.last_error(), None);

    let requests = fake.requests();
    assert_eq!(requests[0].cmd, 0x07);
    assert!(requests[0].payload.starts_with(b"3.1"));
    assert_eq!(opened_dps(&requests[0]), json!({"1": true, "2": 0}));
}

#[tokio::test]
async fn set_with_response_body_is_a_length_mismatch() {
    let fake = spawn_device(|_| response_frame(0x07, br#"{"dps":{"1":true}}"#)).await;
    let device = fake.device();

    assert_eq!(device.set(true).await, Err(TuyaError::LengthMismatch));
    assert_eq!(device.state(), PowerState::Off);
    assert_eq!(device.error_code(), 3);
}

#[tokio::test]
async fn toggle_flips_cached_state() {
    let fake = spawn_device(|_| response_frame(0x07, b"")).await;
    let device = fake.device();

    device.toggle().await.unwrap();
    assert_eq!(device.state(), PowerState::On);
    device.toggle().await.unwrap();
    assert_eq!(device.state(), PowerState::Off);

    let requests = fake.requests();
    assert_eq!(opened_dps(&requests[0])["1"], true);
    assert_eq!(opened_dps(&requests[1])["1"], false);
}

#[tokio::test]
async fn bad_prefix_is_retried_then_reported() {
    let fake = spawn_device(|_| {
        let mut frame = status_frame(json!({"1": true}));
        frame[2] = 0x66;
        frame
    })
    .await;
    let device = fake.device();

    assert_eq!(device.get().await, Err(TuyaError::PrefixMismatch));
    assert_eq!(fake.requests().len(), 3);
    assert_eq!(device.error_code(), 2);
}

#[tokio::test]
async fn bad_suffix_tail_is_retried_then_reported() {
    let fake = spawn_device(|_| {
        let mut frame = status_frame(json!({"1": true}));
        let last = frame.len() - 1;
        frame[last] = 0;
        frame
    })
    .await;

    assert_eq!(fake.device().get().await, Err(TuyaError::SuffixMismatch));
    assert_eq!(fake.requests().len(), 3);
}

#[tokio::test]
async fn transient_failure_recovers_on_retry() {
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    let fake = spawn_device(move |_| {
        let mut n = counter.lock().unwrap();
        *n += 1;
        let mut frame = status_frame(json!({"1": true}));
        if *n == 1 {
            frame[0] = 0xFF;
        }
        frame
    })
    .await;
    let device = fake.device();

    assert_eq!(device.get().await.unwrap(), PowerState::On);
    assert_eq!(fake.requests().len(), 2);
}

#[tokio::test]
async fn trailing_bytes_are_a_length_mismatch() {
    let fake = spawn_device(|_| {
        let mut frame = status_frame(json!({"1": true}));
        frame.extend_from_slice(b"extra");
        frame
    })
    .await;
    let device = fake.builder().retries(0).build().unwrap();

    assert_eq!(device.get().await, Err(TuyaError::LengthMismatch));
}

#[tokio::test]
async fn trailing_bytes_are_retried_then_reported() {
    let fake = spawn_device(|_| {
        let mut frame = status_frame(json!({"1": true}));
        frame.extend_from_slice(b"extra");
        frame
    })
    .await;
    let device = fake.device();

    assert_eq!(device.get().await, Err(TuyaError::LengthMismatch));
    assert_eq!(fake.requests().len(), 3);
    assert_eq!(device.error_code(), 3);
}

#[tokio::test]
async fn set_dps_with_power_updates_cached_state() {
    let fake = spawn_device(|_| response_frame(0x07, b"")).await;
    let device = fake.device();
    assert_eq!(device.state(), PowerState::Off);

    let mut dps = tuya31::Dps::new();
    dps.insert("1".into(), Value::Bool(true));
    device.set_dps(dps).await.unwrap();
    assert_eq!(device.state(), PowerState::On);

    let mut dps = tuya31::Dps::new();
    dps.insert("3".into(), 200.into());
    device.set_dps(dps).await.unwrap();
    assert_eq!(device.state(), PowerState::On);

    assert_eq!(opened_dps(&fake.requests()[0]), json!({"1": true}));
}

#[tokio::test]
async fn unreachable_device_is_a_socket_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let device = DeviceBuilder::new(ID, KEY)
        .host("127.0.0.1")
        .port(port)
        .retries(1)
        .retry_delay(Duration::from_millis(10))
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    assert!(matches!(device.set(true).await, Err(TuyaError::Socket(_))));
    assert_eq!(device.state(), PowerState::Off);
    assert_eq!(device.error_code(), 1);
}

#[tokio::test]
async fn bulb_colour_and_white() {
    let fake = spawn_device(|_| response_frame(0x07, b"")).await;
    let device = fake.builder().kind(DeviceKind::Bulb).build().unwrap();
    let bulb = device.as_bulb().unwrap();

    bulb.set_color_rgb(255, 0, 0).await.unwrap();
    bulb.set_color_hsv(0x10, 0x20, 0x30).await.unwrap();
    bulb.set_white(100, 50).await.unwrap();

    let requests = fake.requests();
    assert_eq!(
        opened_dps(&requests[0]),
        json!({"5": "00ffff", "2": "colour"})
    );
    assert_eq!(
        opened_dps(&requests[1]),
        json!({"5": "102030", "2": "colour"})
    );
    assert_eq!(
        opened_dps(&requests[2]),
        json!({"2": "white", "3": 100, "4": 50})
    );
}

#[tokio::test]
async fn white_below_minimum_never_reaches_the_device() {
    let fake = spawn_device(|_| response_frame(0x07, b"")).await;
    let device = fake.builder().kind(DeviceKind::Bulb).build().unwrap();
    let bulb = device.as_bulb().unwrap();

    assert!(matches!(
        bulb.set_white(24, 0).await,
        Err(TuyaError::Argument(_))
    ));
    assert!(fake.requests().is_empty());

    bulb.set_white(25, 0).await.unwrap();
    bulb.set_white(255, 255).await.unwrap();
    assert_eq!(fake.requests().len(), 2);
}

#[tokio::test]
async fn clones_share_state() {
    let fake = spawn_device(|_| response_frame(0x07, b"")).await;
    let device = fake.device();
    let other = device.clone();

    let (a, b) = tokio::join!(device.set(true), other.set(true));
    a.unwrap();
    b.unwrap();
    assert_eq!(other.state(), PowerState::On);
    assert_eq!(fake.requests().len(), 2);
}

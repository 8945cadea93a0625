//! Shared test infrastructure for lease resolution integration tests.

use std::io;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{Catalog, MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use kea_dns::config::DnsConfig;
use kea_dns::server::DnsServer;
use kea_dns::store::{LeaseEntry, LeaseState, MemoryLeaseStore};

// --- Constants ---

pub const HOST1_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);
pub const HOST2_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 2);

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// Implements `ResponseHandler` so it can be passed to
/// `Catalog::handle_request()`. The response is serialized via
/// `MessageResponse::destructive_emit()` and stored as raw wire-format
/// bytes, which can then be parsed with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Lease builders ---

/// An expiry `secs` seconds from now.
pub fn expires_in(secs: i64) -> DateTime<Utc> {
    Utc::now() + ChronoDuration::seconds(secs)
}

/// A store with a single active lease: host1 -> 192.168.0.1, one hour left.
pub fn single_lease_store() -> Arc<MemoryLeaseStore> {
    let store = MemoryLeaseStore::new();
    store.insert(LeaseEntry::active("host1", HOST1_ADDR, expires_in(3600)));
    Arc::new(store)
}

/// Add a non-active lease row to a store.
pub fn insert_inactive(store: &MemoryLeaseStore, hostname: &str, ip: Ipv4Addr, state: LeaseState) {
    store.insert(LeaseEntry::new(hostname, ip, expires_in(3600), state));
}

// --- Catalog construction ---

/// Build a catalog through the server shell, exactly as production does.
pub fn build_catalog(authority_domain: Option<&str>, store: Arc<MemoryLeaseStore>) -> Catalog {
    let config = DnsConfig {
        listen_addr: "127.0.0.1:5353".parse().unwrap(),
        authority_domain: authority_domain.map(str::to_string),
    };
    DnsServer::new(config, store)
        .catalog()
        .expect("failed to build catalog")
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` as received over UDP.
pub fn build_request(name: &str, record_type: RecordType, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let msg = parse_message_request(&bytes);
    Request::new(msg, "127.0.0.1:12345".parse().unwrap(), Protocol::Udp)
}

// --- Response helpers ---

/// Execute a query through the catalog and return the parsed response.
pub async fn execute_query(
    catalog: &Catalog,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, id);
    let handler = TestResponseHandler::new();
    catalog.handle_request(&request, handler.clone()).await;
    handler.into_message()
}

/// Extract A record addresses from a response, in answer order.
pub fn extract_a_records(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(Ipv4Addr::from(*a)),
            _ => None,
        })
        .collect()
}

/// Extract PTR targets from a response, in answer order.
pub fn extract_ptr_targets(msg: &Message) -> Vec<Name> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::PTR(ptr) => Some(ptr.0.clone()),
            _ => None,
        })
        .collect()
}

/// Extract answer TTLs, in answer order.
pub fn extract_ttls(msg: &Message) -> Vec<u32> {
    msg.answers().iter().map(|r| r.ttl()).collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert a TTL sits within `slack` seconds below the nominal value,
/// absorbing the wall-clock time the test itself takes.
pub fn assert_ttl_near(ttl: u32, nominal: u32, slack: u32) {
    assert!(
        ttl <= nominal && ttl >= nominal.saturating_sub(slack),
        "ttl {} outside [{}, {}]",
        ttl,
        nominal.saturating_sub(slack),
        nominal
    );
}

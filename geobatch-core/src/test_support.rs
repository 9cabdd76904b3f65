use crate::activity_log::ActivityLog;
use crate::address::AddressRecord;
use crate::providers::{Provider, ReverseGeocoder};
use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Deterministic geocoder that answers from a script and counts calls
pub struct StubGeocoder {
    provider: Provider,
    answers: Vec<Option<AddressRecord>>,
    calls: RefCell<Vec<(f64, f64)>>,
    next: Cell<usize>,
}

impl StubGeocoder {
    /// Returns the same record for every call
    pub fn always(record: AddressRecord) -> Self {
        Self::scripted(vec![Some(record)])
    }

    /// Fails every call
    pub fn failing() -> Self {
        Self::scripted(vec![None])
    }

    /// Cycles through the given answers
    pub fn scripted(answers: Vec<Option<AddressRecord>>) -> Self {
        Self {
            provider: Provider::Nominatim,
            answers,
            calls: RefCell::new(Vec::new()),
            next: Cell::new(0),
        }
    }

    pub fn for_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Coordinates of every call, in order
    pub fn calls(&self) -> Vec<(f64, f64)> {
        self.calls.borrow().clone()
    }
}

impl ReverseGeocoder for StubGeocoder {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn reverse_geocode(&self, lat: f64, lon: f64, log: &mut ActivityLog) -> Option<AddressRecord> {
        self.calls.borrow_mut().push((lat, lon));
        log.push(format!("stub lookup lat={}, lon={}", lat, lon));

        if self.answers.is_empty() {
            return None;
        }
        let index = self.next.get();
        self.next.set(index + 1);
        self.answers[index % self.answers.len()].clone()
    }
}

/// Sample record returned by the stub in most tests
pub fn lagos_record() -> AddressRecord {
    AddressRecord {
        street1: "1 Broad Street".to_string(),
        street2: String::new(),
        city: "Lagos".to_string(),
        state: "Lagos State".to_string(),
        postal: "100001".to_string(),
        country: "Nigeria".to_string(),
        full_address: "1 Broad Street, Lagos, Nigeria".to_string(),
    }
}

/// Local HTTP endpoint that serves exactly one request
pub struct OneShotServer {
    pub url: String,
    handle: JoinHandle<String>,
}

impl OneShotServer {
    /// Answers the first request with the given status line and JSON body
    pub fn respond(status: &str, body: &str) -> Self {
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        Self::serve(move |stream| {
            let _ = stream.write_all(response.as_bytes());
        })
    }

    /// Accepts the request but stays silent for `delay`
    pub fn stall(delay: Duration) -> Self {
        Self::serve(move |_| thread::sleep(delay))
    }

    fn serve<F>(reply: F) -> Self
    where
        F: FnOnce(&mut std::net::TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request_head(&mut stream);
            reply(&mut stream);
            request
        });

        Self {
            url: format!("http://{}", addr),
            handle,
        }
    }

    /// Waits for the server thread and returns the raw request head
    pub fn request(self) -> String {
        self.handle.join().unwrap()
    }
}

fn read_request_head(stream: &mut std::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    String::from_utf8_lossy(&head).to_string()
}

//! Live reload channel.
//!
//! Browsers connect over a WebSocket upgrade on the listening port. Each
//! open channel gets the literal text `connected` once, then `reload`
//! whenever the watcher reports a change. Delivery is fire and forget; a
//! failed send removes that client and nobody else.

use std::io::{Read, Write};

use anyhow::{Result, bail};
use parking_lot::Mutex;
use tiny_http::{Header, Request, Response, StatusCode};
use tungstenite::handshake::derive_accept_key;
use tungstenite::protocol::{Message, Role, WebSocket};

use crate::debug;

/// Byte stream carrying one reload client.
pub trait RawStream: Read + Write + Send {}
impl<T: Read + Write + Send> RawStream for T {}

type Client = WebSocket<Box<dyn RawStream>>;

/// All currently open reload channels.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<Vec<Client>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the request asks to switch protocols to WebSocket.
    pub fn wants_upgrade(request: &Request) -> bool {
        header_value(request, "Upgrade").is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
    }

    /// Complete the upgrade handshake, greet the client, and register it.
    pub fn accept(&self, request: Request) -> Result<()> {
        let Some(key) = header_value(&request, "Sec-WebSocket-Key").map(str::to_owned) else {
            let _ = request.respond(Response::empty(StatusCode(400)));
            bail!("upgrade request without Sec-WebSocket-Key");
        };

        let accept = derive_accept_key(key.as_bytes());
        let response = Response::empty(StatusCode(101))
            .with_header(Header::from_bytes("Upgrade", "websocket").unwrap())
            .with_header(Header::from_bytes("Connection", "Upgrade").unwrap())
            .with_header(Header::from_bytes("Sec-WebSocket-Accept", accept.as_bytes()).unwrap());

        // tiny_http writes the 101 and hands back the raw socket
        let stream = request.upgrade("websocket", response);
        let stream: Box<dyn RawStream> = Box::new(stream);
        let mut ws = WebSocket::from_raw_socket(stream, Role::Server, None);

        ws.send(Message::text("connected"))?;
        self.insert(ws);
        Ok(())
    }

    /// Register an open channel for future broadcasts.
    pub fn insert(&self, client: Client) {
        let mut clients = self.clients.lock();
        clients.push(client);
        debug!("reload"; "client connected (total: {})", clients.len());
    }

    /// Send `reload` to every registered client.
    ///
    /// Clients whose send fails are removed; the rest are untouched.
    /// Channels registered after this call see nothing for this event.
    pub fn broadcast(&self) {
        let mut clients = self.clients.lock();
        if clients.is_empty() {
            debug!("reload"; "no clients connected");
            return;
        }

        let count = clients.len();
        clients.retain_mut(|client| match client.send(Message::text("reload")) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {e}");
                false
            }
        });
        debug!("reload"; "broadcast to {count} clients");
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every channel and clear the registry.
    pub fn close_all(&self) {
        let mut clients = std::mem::take(&mut *self.clients.lock());
        for client in &mut clients {
            let _ = client.close(None);
            let _ = client.flush();
        }
    }
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

//! Client dispatch: turns data units into requests for the queue and
//! resolves replies when their responses arrive.

mod reply;
pub use self::reply::{Reply, ReplyKind};

use std::time::Duration;

use tokio::sync::watch;

use crate::{
    codec::{
        build_read_request, build_read_write_request, build_write_request, decode_response,
        ResponseExtension, Unsupported,
    },
    frame::*,
    Error, Result,
};

/// Response timeout a new client starts with, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// The connection a client sends through (serial line, TCP socket, ...).
pub trait Transport {
    fn is_open(&self) -> bool;

    fn state(&self) -> ConnectionState;
}

/// A request on its way into the queue.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request: RequestPdu,
    pub server_address: ServerAddress,
    /// What was asked for; the default unit for raw requests.
    pub unit: DataUnit,
    pub kind: ReplyKind,
    /// Response timeout at submit time, `None` if disabled.
    pub timeout: Option<Duration>,
}

/// Serializes requests onto a transport and matches responses to them.
///
/// Once a response is matched, the queue calls
/// [`Client::on_response_arrived()`] with the [`QueueElement`] it kept for
/// the request, at most once per element.
pub trait RequestQueue {
    /// Accepts `pending`, returning the reply its outcome will be reported
    /// through, or `None` if the request cannot be queued.
    fn enqueue(&mut self, pending: PendingRequest) -> Option<Reply>;
}

/// Correlates an outstanding request with the reply to resolve.
#[derive(Debug, Clone)]
pub struct QueueElement {
    pub reply: Reply,
    pub unit: DataUnit,
}

impl QueueElement {
    pub fn new(reply: Reply, unit: DataUnit) -> Self {
        Self { reply, unit }
    }
}

/// The client side request/response engine.
///
/// `X` decodes responses to function codes the client does not know; see
/// [`ResponseExtension`].
#[derive(Debug)]
pub struct Client<X = Unsupported> {
    timeout: watch::Sender<i32>,
    extension: X,
}

impl Client<Unsupported> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_extension(Unsupported)
    }
}

impl Default for Client<Unsupported> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: ResponseExtension> Client<X> {
    #[must_use]
    pub fn with_extension(extension: X) -> Self {
        let (timeout, _) = watch::channel(DEFAULT_TIMEOUT_MS);
        Self { timeout, extension }
    }

    /// Same client with its response timeout set to `timeout` milliseconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout: i32) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn extension(&self) -> &X {
        &self.extension
    }

    /// Response timeout in milliseconds; negative means disabled.
    #[must_use]
    pub fn timeout(&self) -> i32 {
        *self.timeout.borrow()
    }

    #[must_use]
    pub fn timeout_duration(&self) -> Option<Duration> {
        u64::try_from(self.timeout()).ok().map(Duration::from_millis)
    }

    /// Changes the response timeout. Subscribers are notified only when the
    /// value actually changes. Requests already queued keep the timeout they
    /// were submitted with.
    pub fn set_timeout(&mut self, timeout: i32) {
        let changed = self.timeout.send_if_modified(|current| {
            if *current == timeout {
                return false;
            }
            *current = timeout;
            true
        });
        if changed {
            log::trace!("Response timeout changed to {timeout} ms");
        }
    }

    /// Watches the response timeout.
    pub fn subscribe_timeout(&self) -> watch::Receiver<i32> {
        self.timeout.subscribe()
    }

    /// Reads the contents described by `read` from the server at
    /// `server_address`.
    pub fn send_read_request<D>(
        &self,
        device: &mut D,
        read: &DataUnit,
        server_address: ServerAddress,
    ) -> Result<Reply>
    where
        D: Transport + RequestQueue,
    {
        self.send_request(device, build_read_request(read), server_address, Some(read))
    }

    /// Writes the values of `write` to the server at `server_address`.
    pub fn send_write_request<D>(
        &self,
        device: &mut D,
        write: &DataUnit,
        server_address: ServerAddress,
    ) -> Result<Reply>
    where
        D: Transport + RequestQueue,
    {
        self.send_request(device, build_write_request(write), server_address, Some(write))
    }

    /// Writes `write` and reads `read` in one transaction (function code 0x17).
    ///
    /// The server performs the write before the read. How overlapping areas
    /// behave is up to the device.
    pub fn send_read_write_request<D>(
        &self,
        device: &mut D,
        read: &DataUnit,
        write: &DataUnit,
        server_address: ServerAddress,
    ) -> Result<Reply>
    where
        D: Transport + RequestQueue,
    {
        let request = build_read_write_request(read, write);
        self.send_request(device, request, server_address, Some(read))
    }

    /// Sends `request` as is. The reply is not decoded; read the response
    /// through [`Reply::raw_result()`].
    pub fn send_raw_request<D>(
        &self,
        device: &mut D,
        request: RequestPdu,
        server_address: ServerAddress,
    ) -> Result<Reply>
    where
        D: Transport + RequestQueue,
    {
        self.send_request(device, request, server_address, None)
    }

    /// Checks the transport and the request, then hands the request to the
    /// queue. Without a template `unit` the reply is [`ReplyKind::Raw`].
    pub fn send_request<D>(
        &self,
        device: &mut D,
        request: RequestPdu,
        server_address: ServerAddress,
        unit: Option<&DataUnit>,
    ) -> Result<Reply>
    where
        D: Transport + RequestQueue,
    {
        if !device.is_open() || device.state() != ConnectionState::Connected {
            log::warn!("Device is not connected");
            return Err(Error::Connection);
        }

        if !request.is_valid() {
            log::warn!("Refuse to send invalid request: {request:?}");
            return Err(Error::Write);
        }

        let (unit, kind) = match unit {
            Some(unit) => (unit.clone(), ReplyKind::Common),
            None => (DataUnit::default(), ReplyKind::Raw),
        };
        log::debug!(
            "Sending {:?} request {} to server {server_address}",
            kind,
            request.function_code()
        );

        device
            .enqueue(PendingRequest {
                request,
                server_address,
                unit,
                kind,
                timeout: self.timeout_duration(),
            })
            .ok_or_else(|| {
                log::warn!("Request to server {server_address} was not enqueued");
                Error::Enqueue
            })
    }

    /// Decodes `response` into a copy of `template`.
    pub fn process_response(
        &self,
        response: &ResponsePdu,
        template: &DataUnit,
    ) -> std::result::Result<DataUnit, DecodeError> {
        decode_response(response, template, &self.extension)
    }

    /// Resolves the reply of `element` with `response`.
    ///
    /// The raw response is always stored on the reply. Exception responses
    /// finish it with [`Error::Protocol`], raw replies finish without
    /// decoding, and everything else is decoded against the element's unit.
    /// Decode failures finish it with [`Error::InvalidResponse`].
    pub fn on_response_arrived(&self, response: &ResponsePdu, element: &QueueElement) {
        let reply = &element.reply;
        reply.set_raw_result(response.clone());

        if response.is_exception() {
            let error = match response.exception_response() {
                Some(exception) if response.is_valid() => Error::Protocol(exception),
                _ => Error::InvalidResponse(DecodeError::InvalidPdu),
            };
            reply.set_error(error);
            return;
        }

        if reply.kind() == ReplyKind::Raw {
            reply.set_finished(true);
            return;
        }

        match self.process_response(response, &element.unit) {
            Ok(unit) => {
                reply.set_result(unit);
                reply.set_finished(true);
            }
            Err(err) => reply.set_error(err.into()),
        }
    }
}

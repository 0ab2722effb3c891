//! Background websocket subscription listener.
//!
//! One dedicated thread per subscription drives a single-threaded event
//! loop multiplexing exactly two awaited operations: "message received"
//! and "stop requested". Cancellation is cooperative — a shared flag
//! checked on a bounded polling interval — and [`WebsocketListener::stop`]
//! joins the thread, so the socket is fully closed before the caller's
//! next step runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::payload::SubscriptionRequest;

/// How often the event loop re-checks the stop flag while idle.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Errors raised by the subscription listener.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Websocket handshake or transport failure.
    #[error("websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The listener thread or its runtime could not be created.
    #[error("listener setup failed: {0}")]
    Setup(#[from] std::io::Error),

    /// The subscription payload could not be encoded.
    #[error("failed to encode subscription payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The listener thread panicked.
    #[error("listener thread panicked")]
    ThreadPanicked,
}

/// Convenient result alias for listener operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Handle to one running subscription.
///
/// Received text frames accumulate in a shared buffer; [`Self::stop`]
/// returns them after the thread has been joined.
#[derive(Debug)]
pub struct WebsocketListener {
    handle: Option<JoinHandle<ClientResult<()>>>,
    stop: Arc<AtomicBool>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl WebsocketListener {
    /// Connects, sends the subscription payload once, and starts
    /// collecting pushed frames on a background thread.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` when the payload cannot be encoded or the
    /// thread cannot be spawned; connection failures surface from
    /// [`Self::stop`].
    pub fn subscribe(url: &str, request: &SubscriptionRequest) -> ClientResult<Self> {
        let payload = serde_json::to_string(request)?;
        let stop = Arc::new(AtomicBool::new(false));
        let messages = Arc::new(Mutex::new(Vec::new()));

        let url = url.to_string();
        let thread_stop = Arc::clone(&stop);
        let thread_messages = Arc::clone(&messages);
        let handle = thread::Builder::new()
            .name("loadlane-ws".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(listen(&url, payload, &thread_stop, &thread_messages))
            })?;

        Ok(Self {
            handle: Some(handle),
            stop,
            messages,
        })
    }

    /// Snapshot of the frames received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Requests shutdown, joins the listener thread, and returns every
    /// collected frame. The socket is closed once this returns.
    ///
    /// # Errors
    ///
    /// Returns the connection error the listener died with, if any.
    pub fn stop(mut self) -> ClientResult<Vec<String>> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| ClientError::ThreadPanicked)??;
        }
        Ok(std::mem::take(&mut *self.messages.lock()))
    }
}

impl Drop for WebsocketListener {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.store(true, Ordering::Relaxed);
            if handle.join().is_err() {
                warn!("websocket listener thread panicked during drop");
            }
        }
    }
}

async fn listen(
    url: &str,
    payload: String,
    stop: &AtomicBool,
    messages: &Mutex<Vec<String>>,
) -> ClientResult<()> {
    let (mut socket, _response) = connect_async(url).await?;
    debug!(url, "websocket connected, sending subscription");
    socket.send(Message::Text(payload)).await?;

    loop {
        tokio::select! {
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        debug!(bytes = text.len(), "websocket frame received");
                        messages.lock().push(text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("server closed the subscription");
                        break;
                    }
                    // Pings and pongs are handled by the transport.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                }
            }
            () = tokio::time::sleep(STOP_POLL_INTERVAL) => {
                if stop.load(Ordering::Relaxed) {
                    debug!("stop requested, closing subscription");
                    break;
                }
            }
        }
    }

    // Best effort: the peer may already have closed.
    if let Err(err) = socket.close(None).await {
        debug!(error = %err, "close frame not delivered");
    }

    Ok(())
}

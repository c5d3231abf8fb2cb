//! CDP connection layer: request/response correlation over one WebSocket.
//!
//! One [`CdpConnection`] owns the socket to a browser. Commands get a
//! client-generated id and a oneshot callback; the reader task correlates
//! responses by id and fans unsolicited events out on a broadcast channel.
//! Every command wait is bounded by the connection's command timeout so a
//! wedged browser fails the caller instead of hanging it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ak_protocol::{CdpEvent, CdpMessage, CdpRequest};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Default per-command deadline.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Event broadcast capacity; slow subscribers lag rather than block the reader.
const EVENT_CHANNEL_CAPACITY: usize = 256;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// An established CDP connection to a browser.
pub struct CdpConnection {
	next_id: AtomicU64,
	pending: PendingMap,
	outbound: mpsc::UnboundedSender<Message>,
	events: broadcast::Sender<CdpEvent>,
	command_timeout: Duration,
	reader: JoinHandle<()>,
	writer: JoinHandle<()>,
}

impl CdpConnection {
	/// Connects to a browser-level WebSocket debugger URL.
	pub async fn connect(ws_url: &str) -> Result<Self> {
		let (stream, _) = connect_async(ws_url)
			.await
			.map_err(|e| Error::ConnectionFailed(format!("{ws_url}: {e}")))?;
		debug!(target = "ak.cdp", url = %ws_url, "connected");

		let (mut sink, mut source) = stream.split();
		let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
		let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
		let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

		let writer = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sink.send(message).await {
					warn!(target = "ak.cdp", error = %e, "write failed; stopping writer");
					break;
				}
			}
		});

		let reader = {
			let pending = Arc::clone(&pending);
			let events = events.clone();
			tokio::spawn(async move {
				while let Some(item) = source.next().await {
					match item {
						Ok(Message::Text(text)) => dispatch(&pending, &events, &text),
						Ok(Message::Close(_)) => break,
						Ok(_) => {}
						Err(e) => {
							warn!(target = "ak.cdp", error = %e, "read failed; closing connection");
							break;
						}
					}
				}
				fail_all_pending(&pending);
			})
		};

		Ok(Self {
			next_id: AtomicU64::new(1),
			pending,
			outbound,
			events,
			command_timeout: DEFAULT_COMMAND_TIMEOUT,
			reader,
			writer,
		})
	}

	/// Overrides the per-command deadline.
	pub fn set_command_timeout(&mut self, timeout: Duration) {
		self.command_timeout = timeout;
	}

	/// Sends a browser-level command and awaits its result.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		self.send_scoped(None, method, params).await
	}

	/// Sends a command scoped to an attached target session.
	pub async fn send_on(&self, session_id: &str, method: &str, params: Value) -> Result<Value> {
		self.send_scoped(Some(session_id.to_string()), method, params).await
	}

	async fn send_scoped(&self, session_id: Option<String>, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);

		let request = CdpRequest { id, method: method.to_string(), params, session_id };
		let text = serde_json::to_string(&request)?;
		if self.outbound.send(Message::Text(text)).is_err() {
			self.pending.lock().remove(&id);
			return Err(Error::ChannelClosed);
		}
		trace!(target = "ak.cdp", id, method, "command sent");

		match tokio::time::timeout(self.command_timeout, rx).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(Error::ChannelClosed),
			Err(_) => {
				self.pending.lock().remove(&id);
				Err(Error::Timeout(format!(
					"no response to {method} within {}ms",
					self.command_timeout.as_millis()
				)))
			}
		}
	}

	/// Subscribes to the event stream.
	///
	/// Subscribe before issuing the command whose events you need; events
	/// published earlier are not replayed.
	pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
		self.events.subscribe()
	}

	/// Requests a clean close of the underlying socket.
	pub fn close(&self) {
		let _ = self.outbound.send(Message::Close(None));
	}
}

impl Drop for CdpConnection {
	fn drop(&mut self) {
		self.reader.abort();
		self.writer.abort();
	}
}

/// Waits on `rx` for the first event matching `pred`, bounded by `timeout`.
///
/// Lagged receivers skip ahead rather than erroring; a closed channel maps
/// to [`Error::ChannelClosed`].
pub async fn wait_for_event<F>(
	rx: &mut broadcast::Receiver<CdpEvent>,
	timeout: Duration,
	pred: F,
) -> Result<CdpEvent>
where
	F: Fn(&CdpEvent) -> bool,
{
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
		if remaining.is_zero() {
			return Err(Error::Timeout("event wait deadline expired".to_string()));
		}
		match tokio::time::timeout(remaining, rx.recv()).await {
			Ok(Ok(event)) => {
				if pred(&event) {
					return Ok(event);
				}
			}
			Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
				debug!(target = "ak.cdp", skipped, "event subscriber lagged");
			}
			Ok(Err(broadcast::error::RecvError::Closed)) => return Err(Error::ChannelClosed),
			Err(_) => return Err(Error::Timeout("event wait deadline expired".to_string())),
		}
	}
}

fn dispatch(pending: &PendingMap, events: &broadcast::Sender<CdpEvent>, text: &str) {
	match serde_json::from_str::<CdpMessage>(text) {
		Ok(CdpMessage::Response(response)) => {
			let Some(tx) = pending.lock().remove(&response.id) else {
				debug!(target = "ak.cdp", id = response.id, "response for unknown request");
				return;
			};
			let result = match response.error {
				Some(err) => Err(Error::Remote { code: err.code, message: err.message }),
				None => Ok(response.result.unwrap_or(Value::Null)),
			};
			let _ = tx.send(result);
		}
		Ok(CdpMessage::Event(event)) => {
			// No subscribers is fine; events are advisory.
			let _ = events.send(event);
		}
		Ok(CdpMessage::Unknown(value)) => {
			trace!(target = "ak.cdp", payload = %value, "unrecognized message");
		}
		Err(e) => {
			warn!(target = "ak.cdp", error = %e, "failed to parse incoming message");
		}
	}
}

fn fail_all_pending(pending: &PendingMap) {
	let drained: Vec<_> = {
		let mut map = pending.lock();
		map.drain().collect()
	};
	for (_, tx) in drained {
		let _ = tx.send(Err(Error::ChannelClosed));
	}
}

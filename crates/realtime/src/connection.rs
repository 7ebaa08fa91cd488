use std::collections::HashSet;

use {
    axum::{
        body::Bytes,
        extract::ws::{Message, WebSocket},
    },
    chrono::{DateTime, Utc},
    futures::{
        SinkExt,
        stream::{SplitSink, SplitStream, StreamExt},
    },
    tokio::{
        sync::mpsc,
        time::{Instant, timeout},
    },
    tracing::{debug, error, info, warn},
    uuid::Uuid,
};

use confab_protocol::Envelope;

use crate::{
    event::{ControlEvent, DataEvent},
    tuning::Tuning,
};

// ── Hub-side record ──────────────────────────────────────────────────────────

/// What the hub keeps for each live connection. The socket itself lives in
/// the reader and writer tasks; the hub holds the outgoing queue handle and
/// the set of joined rooms. Dropping the record closes the outgoing queue,
/// which is the writer's signal to send a close frame and exit.
pub(crate) struct ConnectionHandle {
    pub outgoing: mpsc::Sender<Envelope>,
    pub joined: HashSet<Uuid>,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    /// Create the record and the receiving half of its outgoing queue.
    pub fn new(outgoing_capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (outgoing, outgoing_rx) = mpsc::channel(outgoing_capacity);
        (
            Self {
                outgoing,
                joined: HashSet::new(),
                connected_at: Utc::now(),
            },
            outgoing_rx,
        )
    }
}

// ── I/O tasks ────────────────────────────────────────────────────────────────

/// Launch the reader and writer tasks for a freshly registered connection.
///
/// The two tasks share nothing but the split socket halves; each signals
/// `connection-unregistered` on its own failure, and unregister processing
/// in the hub is idempotent.
pub(crate) fn spawn_io(
    id: Uuid,
    socket: WebSocket,
    outgoing_rx: mpsc::Receiver<Envelope>,
    events: mpsc::Sender<DataEvent>,
    control: mpsc::Sender<ControlEvent>,
    tuning: Tuning,
) {
    let (sink, stream) = socket.split();
    tokio::spawn(read_loop(id, stream, events, control.clone(), tuning));
    tokio::spawn(write_loop(id, sink, outgoing_rx, control, tuning));
}

/// Reads frames from the peer and forwards them to the hub's events channel.
///
/// The pong deadline is absolute: it only moves forward when the peer
/// answers a ping. Inbound data does not extend it. If the events channel
/// is full, the frame is dropped and the peer is expected to retransmit.
async fn read_loop(
    id: Uuid,
    mut stream: SplitStream<WebSocket>,
    events: mpsc::Sender<DataEvent>,
    control: mpsc::Sender<ControlEvent>,
    tuning: Tuning,
) {
    let mut deadline = Instant::now() + tuning.pong_wait;

    loop {
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => {
                warn!(conn_id = %id, "pong deadline expired");
                break;
            }
            msg = stream.next() => match msg {
                None => {
                    debug!(conn_id = %id, "socket closed by peer");
                    break;
                },
                Some(Err(e)) => {
                    error!(conn_id = %id, error = %e, "websocket read failed");
                    break;
                },
                Some(Ok(Message::Text(text))) => {
                    let frame = match Envelope::parse(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(conn_id = %id, error = %e, "dropping malformed frame");
                            continue;
                        },
                    };
                    match events.try_send(DataEvent { sender: id, frame }) {
                        Ok(()) => {
                            debug!(conn_id = %id, size = text.len(), "frame enqueued to hub");
                        },
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!(conn_id = %id, size = text.len(), "hub events channel full, dropping frame");
                        },
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            warn!(conn_id = %id, "hub events channel closed");
                            break;
                        },
                    }
                },
                Some(Ok(Message::Pong(_))) => {
                    deadline = Instant::now() + tuning.pong_wait;
                },
                Some(Ok(Message::Close(_))) => {
                    debug!(conn_id = %id, "close frame received");
                    break;
                },
                // Binary frames are not part of the protocol; pings are
                // answered at the library layer.
                Some(Ok(_)) => {},
            }
        }
    }

    // Unregister is a coordination signal, so a blocking send is fine here.
    if control
        .send(ControlEvent::ConnectionUnregistered { id })
        .await
        .is_err()
    {
        debug!(conn_id = %id, "hub already stopped");
    }
    info!(conn_id = %id, "reader closed");
}

/// Drains the outgoing queue to the socket and keeps the peer alive with
/// periodic pings. Every write is bounded by the write timeout; any failure
/// terminates the writer immediately without re-enqueueing.
async fn write_loop(
    id: Uuid,
    mut sink: SplitSink<WebSocket, Message>,
    mut outgoing: mpsc::Receiver<Envelope>,
    control: mpsc::Sender<ControlEvent>,
    tuning: Tuning,
) {
    let interval = tuning.ping_interval();
    let mut ping = tokio::time::interval_at(Instant::now() + interval, interval);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut failed = false;

    loop {
        tokio::select! {
            maybe = outgoing.recv() => match maybe {
                Some(frame) => {
                    let json = match frame.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(conn_id = %id, error = %e, "dropping unserializable frame");
                            continue;
                        },
                    };
                    match timeout(tuning.write_timeout, sink.send(Message::Text(json.into()))).await {
                        Ok(Ok(())) => debug!(conn_id = %id, "frame written"),
                        Ok(Err(e)) => {
                            error!(conn_id = %id, error = %e, "websocket write failed");
                            failed = true;
                            break;
                        },
                        Err(_) => {
                            error!(conn_id = %id, "websocket write timed out");
                            failed = true;
                            break;
                        },
                    }
                },
                None => {
                    // The hub closed the queue during unregister. Buffered
                    // frames have all been drained at this point: say goodbye
                    // and exit.
                    let _ = timeout(tuning.write_timeout, sink.send(Message::Close(None))).await;
                    debug!(conn_id = %id, "outgoing queue closed");
                    break;
                },
            },
            _ = ping.tick() => {
                match timeout(tuning.write_timeout, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => debug!(conn_id = %id, "ping sent"),
                    _ => {
                        error!(conn_id = %id, "ping failed");
                        failed = true;
                        break;
                    },
                }
            }
        }
    }

    if failed
        && control
            .send(ControlEvent::ConnectionUnregistered { id })
            .await
            .is_err()
    {
        debug!(conn_id = %id, "hub already stopped");
    }
    info!(conn_id = %id, "writer closed");
}

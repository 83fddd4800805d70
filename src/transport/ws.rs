//! WebSocket connector backed by `tokio-tungstenite`.

use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::error::TransportError;

use super::{
    Connector, LinkSender, OutboundFrame, SocketEndpoint, SocketHandle, SocketId,
    TransportEvent, socket_pair,
};

/// Opens `ws://` and `wss://` sockets, one task per socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn open(&self, url: &str, socket: SocketId, events: LinkSender) -> SocketHandle {
        let (handle, endpoint) = socket_pair(socket, events);
        tokio::spawn(run_socket(url.to_owned(), endpoint));
        handle
    }
}

/// Drives one socket until it closes, then reports `Closed`.
async fn run_socket(url: String, mut endpoint: SocketEndpoint) {
    let reason = drive(&url, &mut endpoint).await;
    debug!(socket_id = %endpoint.id(), ?reason, "socket task finished");
    endpoint.emit(TransportEvent::Closed { reason });
}

/// Returns the close reason, if any.
async fn drive(url: &str, endpoint: &mut SocketEndpoint) -> Option<String> {
    let connected = tokio::select! {
        biased;
        () = endpoint.cancel.cancelled() => return Some("closed locally".to_owned()),
        result = tokio_tungstenite::connect_async(url) => result,
    };
    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(err) => {
            endpoint.emit(TransportEvent::Error(TransportError::ConnectionFailed(
                err.to_string(),
            )));
            return None;
        }
    };
    endpoint.emit(TransportEvent::Opened);

    let (mut sink, mut source) = stream.split();
    // Set between an inbound ping and the owner's pong. Nothing is read or
    // written meanwhile, so the owner's pong replaces tungstenite's echo.
    let mut awaiting_pong = false;
    let mut held = VecDeque::new();
    loop {
        tokio::select! {
            biased;
            () = endpoint.cancel.cancelled() => {
                let _ = sink.close().await;
                return Some("closed locally".to_owned());
            }
            frame = endpoint.outbound.recv() => {
                let batch = match frame {
                    Some(OutboundFrame::Text(text)) if awaiting_pong => {
                        held.push_back(text);
                        Vec::new()
                    }
                    Some(OutboundFrame::Text(text)) => vec![Message::Text(text.into())],
                    Some(OutboundFrame::Pong(payload)) => {
                        awaiting_pong = false;
                        std::iter::once(Message::Pong(payload.into()))
                            .chain(held.drain(..).map(|text| Message::Text(text.into())))
                            .collect()
                    }
                    Some(OutboundFrame::Close) | None => {
                        let _ = sink.close().await;
                        return Some("closed locally".to_owned());
                    }
                };
                for message in batch {
                    if let Err(err) = sink.send(message).await {
                        endpoint.emit(TransportEvent::Error(err.into()));
                        return None;
                    }
                }
            }
            message = source.next(), if !awaiting_pong => match message {
                Some(Ok(Message::Text(text))) => {
                    endpoint.emit(TransportEvent::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    endpoint.emit(TransportEvent::Binary(bytes.to_vec()));
                }
                Some(Ok(Message::Ping(payload))) => {
                    awaiting_pong = true;
                    endpoint.emit(TransportEvent::Ping(payload.to_vec()));
                }
                Some(Ok(Message::Close(frame))) => {
                    return frame.map(|f| f.reason.as_str().to_owned());
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {
                    trace!(socket_id = %endpoint.id(), "control frame ignored");
                }
                Some(Err(err)) => {
                    endpoint.emit(TransportEvent::Error(err.into()));
                    return None;
                }
                None => return None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LinkEvent;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn unreachable_endpoint_reports_error_then_closed() {
        // Bind and drop a listener so the port is known to be closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = WsConnector::new().open(&format!("ws://{addr}/ws"), SocketId::new(1), tx);

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            LinkEvent::Socket {
                event: TransportEvent::Error(TransportError::ConnectionFailed(_)),
                ..
            }
        ));
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            LinkEvent::Socket {
                event: TransportEvent::Closed { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn dropped_handle_before_connect_closes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = WsConnector::new().open("ws://127.0.0.1:9/ws", SocketId::new(4), tx);
        drop(handle);

        loop {
            match rx.recv().await {
                Some(LinkEvent::Socket {
                    socket,
                    event: TransportEvent::Closed { .. },
                }) => {
                    assert_eq!(socket, SocketId::new(4));
                    break;
                }
                Some(_) => {}
                None => panic!("socket task ended without Closed"),
            }
        }
    }

    #[tokio::test]
    async fn ping_gets_single_owner_pong_before_held_text() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Ping(b"hb".to_vec().into())).await.unwrap();
            let mut received = Vec::new();
            while received.len() < 2 {
                match ws.next().await {
                    Some(Ok(message)) => received.push(message),
                    other => panic!("client went away: {other:?}"),
                }
            }
            received
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = WsConnector::new().open(&format!("ws://{addr}/ws"), SocketId::new(2), tx);
        loop {
            match rx.recv().await.unwrap() {
                LinkEvent::Socket {
                    event: TransportEvent::Ping(payload),
                    ..
                } => {
                    assert_eq!(payload, b"hb");
                    break;
                }
                LinkEvent::Socket {
                    event: TransportEvent::Opened,
                    ..
                } => {}
                other => panic!("unexpected event {other:?}"),
            }
        }

        // A text queued ahead of the pong goes out after it.
        assert!(handle.send(OutboundFrame::Text("queued".to_owned())));
        assert!(handle.send(OutboundFrame::Pong(b"pong".to_vec())));

        let received = server.await.unwrap();
        assert_eq!(received[0], Message::Pong(b"pong".to_vec().into()));
        assert_eq!(received[1], Message::Text("queued".into()));
    }
}

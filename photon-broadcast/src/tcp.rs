//! Exposes a [`BroadcastChannel`] to external GUI subscribers over TCP, default
//! endpoint `tcp://127.0.0.1:12321` (spec §6). Each accepted connection gets its
//! own unfiltered [`Subscription`](crate::subject::Subscription): tag filtering
//! is left to the remote peer, matching the publish-everything discipline of a
//! PUB socket.

use crate::subject::BroadcastChannel;
use futures::SinkExt;
use photon_core::{CancellationToken, PhotonError, Tag};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};

/// Default BroadcastChannel endpoint named in the external interface section.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:12321";

#[derive(Serialize)]
struct WireFrame<'a> {
    tag: &'a str,
    payload: &'a photon_core::RecordMap,
}

/// Serves `channel` over TCP at `addr` until `cancel` fires. Each connection
/// receives every message published after it connects, length-prefixed and
/// MessagePack-encoded as `{tag, payload}`.
///
/// # Errors
/// [`PhotonError::Transport`] if `addr` cannot be bound.
pub async fn serve(
    channel: BroadcastChannel,
    addr: SocketAddr,
    cancel: CancellationToken,
) -> Result<(), PhotonError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| PhotonError::transport(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "broadcast channel listening");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("broadcast listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted
                    .map_err(|e| PhotonError::transport(format!("accept: {e}")))?;
                tracing::debug!(%peer, "broadcast subscriber connected");
                let subscription = channel.subscribe::<String>(None);
                tokio::spawn(serve_one(stream, subscription));
            }
        }
    }
}

async fn serve_one(stream: tokio::net::TcpStream, mut subscription: crate::subject::Subscription) {
    let mut framed = FramedWrite::new(stream, LengthDelimitedCodec::new());
    while let Some((tag, payload)) = subscription.recv().await {
        let Ok(bytes) = encode(&tag, &payload) else {
            continue;
        };
        if framed.send(bytes).await.is_err() {
            break;
        }
    }
}

fn encode(tag: &Tag, payload: &photon_core::RecordMap) -> Result<bytes::Bytes, PhotonError> {
    let frame = WireFrame {
        tag: tag.as_str(),
        payload,
    };
    rmp_serde::to_vec(&frame)
        .map(bytes::Bytes::from)
        .map_err(|e| PhotonError::transport(format!("encode failure: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use photon_core::RecordMap;
    use tokio_util::codec::FramedRead;

    #[tokio::test]
    async fn connected_subscriber_receives_published_messages() {
        let channel = BroadcastChannel::new();
        let addr = {
            let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
            probe.local_addr().unwrap()
        };
        let cancel = CancellationToken::new();

        let serve_channel = channel.clone();
        let serve_cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = serve(serve_channel, addr, serve_cancel).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        channel.publish(Tag::new("view:omdata"), RecordMap::new());

        let mut framed = FramedRead::new(stream, LengthDelimitedCodec::new());
        let frame = framed.next().await.unwrap().unwrap();
        let decoded: serde_json::Value = rmp_serde::from_slice(&frame).unwrap();
        assert_eq!(decoded["tag"], "view:omdata");

        cancel.cancel();
    }
}

//! TCP transport for the bridge channel.
//!
//! Frames are newline-delimited `tag json` pairs: outgoing frames carry
//! the action kind as their tag, inbound frames are tagged `result`.
//! The transport owns two background tasks, a writer draining the
//! client's outbound queue and a reader feeding result payloads back to
//! the router, and otherwise stays out of the protocol's way.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use livegraph_core::LiveClient;

/// Channel tag of inbound result frames.
const RESULT_TAG: &str = "result";

/// Connect an action client to a bridge over TCP.
///
/// Returns once the connection is up; the pump tasks run until the peer
/// goes away. A lost connection settles nothing: pending actions stay
/// pending, exactly as they would on a silent host.
pub async fn connect(addr: &str) -> Result<LiveClient> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("connecting to host bridge at {}", addr))?;
    let (reader, mut writer) = stream.into_split();
    let (client, mut outbound) = LiveClient::new();

    // Writer: outbound queue onto the wire.
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let line = format!("{} {}\n", frame.kind.as_str(), frame.payload);
            if let Err(err) = writer.write_all(line.as_bytes()).await {
                log::error!("bridge connection lost while sending: {}", err);
                break;
            }
        }
    });

    // Reader: result frames back to the router.
    let router = client.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some((tag, json)) = line.split_once(' ') else {
                        log::warn!("inbound frame without a tag skipped");
                        continue;
                    };
                    if tag == RESULT_TAG {
                        router.handle_result(json);
                    } else {
                        log::warn!("unknown inbound tag '{}' skipped", tag);
                    }
                }
                Ok(None) => {
                    log::info!("bridge closed the connection");
                    break;
                }
                Err(err) => {
                    log::error!("bridge read failed: {}", err);
                    break;
                }
            }
        }
    });

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use livegraph_bridge::{server, Bridge, MemoryModel};
    use livegraph_graph::GraphClient;

    #[tokio::test]
    async fn test_full_stack_over_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server::serve(Bridge::new(MemoryModel::demo_song()), listener).await;
        });

        let client = connect(&addr).await.unwrap();
        let graph = GraphClient::new(client);

        let song = graph.song().await.unwrap();
        assert_eq!(song.tracks.len(), 2);

        let playing = graph.song_start_playing(song.id).await.unwrap();
        assert_eq!(playing.is_playing, 1);

        let dict = graph.clip_get_notes_extended(17, 0, 128, 0.0, 4.0).await.unwrap();
        assert_eq!(dict.notes.len(), 3);
    }
}

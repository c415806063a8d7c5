use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

/// 分区保存/重置事件推送，编辑器页面据此提示其他窗口的修改
pub async fn section_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let mut rx = state.store.subscribe();
    loop {
        let event = tokio::select! {
            received = rx.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("事件推送落后，跳过 {skipped} 条");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            // 客户端只会发送关闭帧；断开后立即释放订阅
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        };
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("事件序列化失败：{e}");
                continue;
            }
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
    tracing::debug!("事件推送连接已关闭");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::state::AppState;
    use crate::store::ContentStore;

    async fn wait_for_listeners(store: &ContentStore, expected: usize) {
        for _ in 0..200 {
            if store.listeners() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("listeners = {}, expected {expected}", store.listeners());
    }

    #[tokio::test]
    async fn disconnect_releases_subscription_without_events() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::admin::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                format!(
                    "GET /admin/ws/events HTTP/1.1\r\nHost: {addr}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        let mut buf = [0u8; 512];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 101"));

        wait_for_listeners(&state.store, 1).await;
        drop(stream);
        wait_for_listeners(&state.store, 0).await;
    }
}

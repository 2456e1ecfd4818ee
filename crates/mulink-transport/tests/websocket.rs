//! Integration tests for the WebSocket connector.
//!
//! Each test binds a real `tokio-tungstenite` server on an OS-assigned port
//! and points a `WebSocketConnector` at it.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use mulink_transport::{Connection, Connector, TransportError, WebSocketConnector};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on `127.0.0.1:0` and returns it with its `ws://` URL.
    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("bound address");
        (listener, format!("ws://{addr}"))
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed")
    }

    #[tokio::test]
    async fn test_text_frames_flow_both_ways() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let conn = WebSocketConnector::new(url).connect().await.expect("should connect");
        let mut server_ws = server.await.expect("task should complete");

        // --- Client sends text ---
        conn.send(r#"{"type":1,"opcode":0,"event":"x"}"#.to_string())
            .await
            .expect("send should succeed");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"type":1,"opcode":0,"event":"x"}"#);

        // --- Server sends text and binary; both arrive as bytes ---
        server_ws.send(Message::Text("hello".into())).await.unwrap();
        server_ws
            .send(Message::Binary(vec![1u8, 2, 3].into()))
            .await
            .unwrap();

        assert_eq!(conn.recv().await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(conn.recv().await.unwrap(), Some(vec![1, 2, 3]));

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_server_close() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let conn = WebSocketConnector::new(url).connect().await.unwrap();
        let mut server_ws = server.await.unwrap();

        server_ws.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let (listener, url) = bind().await;
        drop(listener);

        let err = WebSocketConnector::new(url.clone()).connect().await.unwrap_err();
        match err {
            TransportError::ConnectFailed { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move {
            let a = accept(&listener).await;
            let b = accept(&listener).await;
            (a, b)
        });

        let connector = WebSocketConnector::new(url);
        let first = connector.connect().await.unwrap();
        let second = connector.connect().await.unwrap();
        let _keep = server.await.unwrap();

        assert_ne!(first.id(), second.id());
        assert!(connector.endpoint().starts_with("ws://127.0.0.1:"));
    }
}

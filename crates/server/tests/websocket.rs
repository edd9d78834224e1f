mod common;

use std::time::Duration;

use chatmux::ServerConfig;
use chatmux::websocket::Message;
use common::Fixture;
use futures::{SinkExt, StreamExt};
use http::StatusCode;
use indoc::indoc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::Role;

#[tokio::test]
async fn upgrade_on_im_then_websocket_frames() {
    let fixture = Fixture::new(&ServerConfig::default());
    let (client, task) = fixture.connect();

    let (mut socket, response) = tokio_tungstenite::client_async("ws://localhost/im", client).await.unwrap();
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);

    socket.send(Message::text("hello")).await.unwrap();
    assert_eq!(socket.next().await.unwrap().unwrap(), Message::text("hello"));
    socket.send(Message::binary(vec![1, 2, 3])).await.unwrap();
    assert_eq!(socket.next().await.unwrap().unwrap(), Message::binary(vec![1, 2, 3]));

    socket.close(None).await.unwrap();
    while socket.next().await.is_some() {}

    task.await.unwrap().unwrap();
    assert_eq!(fixture.messages(), 2);
    assert!(fixture.dispatcher.sessions().is_empty());
}

#[tokio::test]
async fn upgrade_headers_on_other_path_stay_http() {
    let fixture = Fixture::new(&ServerConfig::default());
    let (mut client, task) = fixture.connect();

    let request = indoc! {"
        GET /chat HTTP/1.1\r
        Host: localhost\r
        Connection: Upgrade, close\r
        Upgrade: websocket\r
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r
        Sec-WebSocket-Version: 13\r
        \r
    "};
    client.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    client.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("GET /chat 0"));
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_handshake_keeps_connection_on_http() {
    let fixture = Fixture::new(&ServerConfig::default());
    let (mut client, task) = fixture.connect();

    let request = indoc! {"
        GET /im HTTP/1.1\r
        Host: localhost\r
        Connection: Upgrade\r
        Upgrade: websocket\r
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r
        Sec-WebSocket-Version: 8\r
        \r
        GET /after HTTP/1.1\r
        Connection: close\r
        \r
    "};
    client.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    client.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 426 Upgrade Required\r\n"));
    assert!(response.contains("sec-websocket-version: 13\r\n"));
    assert!(response.ends_with("GET /after 0"));
    task.await.unwrap().unwrap();
    assert!(fixture.dispatcher.sessions().is_empty());
}

#[tokio::test]
async fn frame_sent_with_handshake_is_not_lost() {
    let fixture = Fixture::new(&ServerConfig::default());
    let (mut client, task) = fixture.connect();

    let mut wire = indoc! {"
        GET /im HTTP/1.1\r
        Host: localhost\r
        Connection: Upgrade\r
        Upgrade: websocket\r
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r
        Sec-WebSocket-Version: 13\r
        \r
    "}
    .as_bytes()
    .to_vec();
    // masked text frame "hi", mask 01 02 03 04
    wire.extend_from_slice(&[0x81, 0x82, 0x01, 0x02, 0x03, 0x04, 0x69, 0x6B]);
    client.write_all(&wire).await.unwrap();

    let expected = "HTTP/1.1 101 Switching Protocols\r\n";
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        head.push(client.read_u8().await.unwrap());
    }
    let head = String::from_utf8(head).unwrap();
    assert!(head.starts_with(expected));
    assert!(head.contains("sec-websocket-accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));

    let mut socket = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
    let echoed = tokio::time::timeout(Duration::from_secs(5), socket.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(echoed, Message::text("hi"));

    socket.close(None).await.unwrap();
    while socket.next().await.is_some() {}
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn broadcast_reaches_open_sessions() {
    let fixture = Fixture::new(&ServerConfig::default());
    let (first, first_task) = fixture.connect();
    let (second, second_task) = fixture.connect();

    let (mut first, _) = tokio_tungstenite::client_async("ws://localhost/im", first).await.unwrap();
    let (mut second, _) = tokio_tungstenite::client_async("ws://localhost/im", second).await.unwrap();

    // a round trip on each socket proves both sessions are registered
    for socket in [&mut first, &mut second] {
        socket.send(Message::text("sync")).await.unwrap();
        assert_eq!(socket.next().await.unwrap().unwrap(), Message::text("sync"));
    }

    assert_eq!(fixture.dispatcher.sessions().broadcast(&Message::text("news")), 2);
    assert_eq!(first.next().await.unwrap().unwrap(), Message::text("news"));
    assert_eq!(second.next().await.unwrap().unwrap(), Message::text("news"));

    for (mut socket, task) in [(first, first_task), (second, second_task)] {
        socket.close(None).await.unwrap();
        while socket.next().await.is_some() {}
        task.await.unwrap().unwrap();
    }
    assert!(fixture.dispatcher.sessions().is_empty());
}

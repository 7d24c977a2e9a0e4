//! Integration tests for TcpGpioCodec with Tokio streams.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio_util::codec::Framed;
use tollgate_core::{Error, Pin, PinValue};
use tollgate_protocol::{Message, MessageType, TcpGpioCodec};

fn create_framed_duplex() -> (
    Framed<DuplexStream, TcpGpioCodec>,
    Framed<DuplexStream, TcpGpioCodec>,
) {
    let (client, server) = tokio::io::duplex(1024);
    (
        Framed::new(client, TcpGpioCodec::new()),
        Framed::new(server, TcpGpioCodec::new()),
    )
}

#[tokio::test]
async fn test_codec_request_reply_exchange() {
    let (mut client, mut server) = create_framed_duplex();
    let msg = Message::exclusive_write("dev1", Pin::new(18).unwrap(), PinValue::High).unwrap();

    client.send(msg.clone()).await.unwrap();
    let received = server.next().await.unwrap().unwrap().unwrap();
    assert_eq!(received, msg);

    server.send(received.reply()).await.unwrap();
    let reply = client.next().await.unwrap().unwrap().unwrap();
    assert_eq!(reply.message_type(), MessageType::Reply);
    assert_eq!(reply.value(), PinValue::Unset);
}

#[tokio::test]
async fn test_codec_malformed_then_valid() {
    let (client, server) = tokio::io::duplex(1024);
    let mut raw = client;
    let mut server = Framed::new(server, TcpGpioCodec::new());

    raw.write_all(b"dev1:4:99:1").await.unwrap();
    let first = server.next().await.unwrap().unwrap();
    assert!(matches!(first, Err(Error::InvalidPin(_))));

    raw.write_all(b"dev1:0:18:0").await.unwrap();
    let second = server.next().await.unwrap().unwrap().unwrap();
    assert_eq!(second.value(), PinValue::Low);
}

#[tokio::test]
async fn test_codec_stream_ends_on_close() {
    let (client, mut server) = create_framed_duplex();
    drop(client);
    assert!(server.next().await.is_none());
}

//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Client behaviour against a scripted server

use cmdwire_client::{ClientConfig, ClientError, CommandClient, Frame, is_server_shutdown};
use cmdwire_codec::FrameCodec;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

const WAIT: Duration = Duration::from_secs(5);

async fn listen() -> (TcpListener, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, ClientConfig::new("127.0.0.1", port))
}

async fn accept(listener: &TcpListener) -> Framed<TcpStream, FrameCodec> {
    let (socket, _) = listener.accept().await.unwrap();
    Framed::new(socket, FrameCodec::new())
}

async fn read(server: &mut Framed<TcpStream, FrameCodec>) -> Option<Frame> {
    let payload = tokio::time::timeout(WAIT, server.next()).await.unwrap()?;
    Some(FrameCodec::new().parse(&payload.unwrap()).unwrap())
}

#[tokio::test]
async fn announces_host_details_on_connect() {
    let (listener, config) = listen().await;
    let (client, mut server) = tokio::join!(CommandClient::connect(config), accept(&listener));
    let _client = client.unwrap();

    let frame = read(&mut server).await.unwrap();
    assert_eq!(frame.code(), "_INFO_ABOUT_NEW_CLIENT");
    assert_eq!(frame.args().len(), 4);
    assert_eq!(frame.args()[0], std::env::consts::OS);
}

#[tokio::test]
async fn wait_for_id_keeps_earlier_frames() {
    let (listener, config) = listen().await;
    let (client, mut server) = tokio::join!(
        CommandClient::connect(config.with_announce(false)),
        accept(&listener)
    );
    let mut client = client.unwrap();

    server.send(Frame::command("HELLO", ["world"])).await.unwrap();
    server
        .send(Frame::command("_NEW_CLIENT_ID_NOTIFY_MESSAGE", ["7"]))
        .await
        .unwrap();

    assert_eq!(client.wait_for_id().await.unwrap(), 7);
    assert_eq!(client.id(), Some(7));

    let frame = client.recv_timeout(WAIT).await.unwrap().unwrap();
    assert_eq!(frame, Frame::command("HELLO", ["world"]));
}

#[tokio::test]
async fn recv_timeout_expires() {
    let (listener, config) = listen().await;
    let (client, _server) = tokio::join!(
        CommandClient::connect(config.with_announce(false)),
        accept(&listener)
    );
    let mut client = client.unwrap();

    let err = client.recv_timeout(Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, ClientError::ReadTimeout));
}

#[tokio::test]
async fn next_frame_reports_server_close() {
    let (listener, config) = listen().await;
    let (client, mut server) = tokio::join!(
        CommandClient::connect(config.with_announce(false)),
        accept(&listener)
    );
    let mut client = client.unwrap();

    server.send(Frame::new(["_DC_NOTIFY_MESSAGE"])).await.unwrap();
    drop(server);

    let frame = client.next_frame().await.unwrap().unwrap();
    assert!(is_server_shutdown(&frame));
    assert!(client.next_frame().await.unwrap().is_none());
}

#[tokio::test]
async fn report_time_and_close_send_reserved_frames() {
    let (listener, config) = listen().await;
    let (client, mut server) = tokio::join!(
        CommandClient::connect(config.with_announce(false)),
        accept(&listener)
    );
    let mut client = client.unwrap();

    let sent = client.report_time().await.unwrap();
    client.close().await.unwrap();

    let report = read(&mut server).await.unwrap();
    assert_eq!(report.code(), "_CLIENT_TIME_REPORT");
    assert_eq!(report.arg(0), Some(sent.to_string().as_str()));

    let goodbye = read(&mut server).await.unwrap();
    assert_eq!(goodbye.code(), "_CLIENT_DISCONNECTS_NOTIFY_MESSAGE");
    assert!(read(&mut server).await.is_none());
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let (listener, config) = listen().await;
    drop(listener);

    let err = CommandClient::connect(config).await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
}

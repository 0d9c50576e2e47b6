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


use cmdwire_client::{ClientConfig, CommandClient};
use cmdwire_service::{CommandContext, CommandServer, Frame, ServerConfig, handler_fn};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::net::Ipv4Addr;
use tokio::runtime::Runtime;

async fn echo_server() -> (CommandServer, u16) {
    let server = CommandServer::new(ServerConfig::new(Ipv4Addr::LOCALHOST.into()));
    server
        .register_command(
            "ECHO",
            handler_fn(|ctx: CommandContext| async move {
                ctx.reply(ctx.frame()).await?;
                Ok(())
            }),
        )
        .unwrap();
    let port = server.start(0).await.unwrap().port();
    (server, port)
}

async fn client(port: u16) -> CommandClient {
    let mut client = CommandClient::connect(ClientConfig::new("127.0.0.1", port).with_announce(false))
        .await
        .unwrap();
    client.wait_for_id().await.unwrap();
    client
}

fn bench_echo(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (server, port) = rt.block_on(echo_server());
    let mut client = rt.block_on(client(port));
    let frame = Frame::command("ECHO", ["hello world"]);

    c.bench_function("echo_round_trip", |b| {
        b.iter(|| {
            rt.block_on(async {
                client.send(black_box(&frame)).await.unwrap();
                client.next_frame().await.unwrap().unwrap()
            })
        })
    });

    rt.block_on(server.stop());
}

fn bench_broadcast(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (server, port) = rt.block_on(echo_server());
    let mut clients = Vec::new();
    for _ in 0..10 {
        clients.push(rt.block_on(client(port)));
    }
    let frame = Frame::command("NEWS", ["tick"]);

    c.bench_function("broadcast_10_sessions", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = server.broadcast(black_box(&frame)).await;
                for client in clients.iter_mut() {
                    client.next_frame().await.unwrap().unwrap();
                }
                result
            })
        })
    });

    rt.block_on(server.stop());
}

criterion_group!(benches, bench_echo, bench_broadcast);
criterion_main!(benches);

use std::net::SocketAddr;

use hexlink::OneClientServer;
use tokio::{io::AsyncReadExt, net::TcpStream};

fn any_port() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

#[tokio::test]
async fn bind_uses_ephemeral_port() -> anyhow::Result<()> {
    let server = OneClientServer::bind("Test", any_port()).await?;
    assert_ne!(0, server.local_addr().port());
    assert!(!server.connected());
    Ok(())
}

#[tokio::test]
async fn bind_fails_on_busy_port() -> anyhow::Result<()> {
    let first = OneClientServer::bind("Test", any_port()).await?;
    assert!(OneClientServer::bind("Test", first.local_addr())
        .await
        .is_err());
    Ok(())
}

#[tokio::test]
async fn accepts_one_client() -> anyhow::Result<()> {
    let mut server = OneClientServer::bind("Test", any_port()).await?;
    let client = TcpStream::connect(server.local_addr()).await?;
    let adopted = server.accept().await.expect("server closed");
    assert!(server.connected());
    assert_eq!(client.local_addr()?, adopted.peer_addr()?);
    Ok(())
}

#[tokio::test]
async fn rejects_second_client() -> anyhow::Result<()> {
    let mut server = OneClientServer::bind("Test", any_port()).await?;
    let _first = TcpStream::connect(server.local_addr()).await?;
    let first_adopted = server.accept().await.expect("server closed");

    // The second connection is closed immediately; it reads EOF.
    let mut second = TcpStream::connect(server.local_addr()).await?;
    let mut buffer = [0u8; 1];
    assert_eq!(0, second.read(&mut buffer).await?);

    // The first peer is undisturbed.
    assert!(server.connected());
    drop(first_adopted);
    Ok(())
}

#[tokio::test]
async fn close_client_notifies_once_per_transition() -> anyhow::Result<()> {
    let mut server = OneClientServer::bind("Test", any_port()).await?;
    let mut transitions = server.subscribe();

    let _client = TcpStream::connect(server.local_addr()).await?;
    let adopted = server.accept().await.expect("server closed");
    transitions.changed().await?;
    assert!(*transitions.borrow_and_update());

    drop(adopted);
    server.close_client();
    transitions.changed().await?;
    assert!(!*transitions.borrow_and_update());

    // No transition happened, so no notification is pending.
    server.close_client();
    assert!(!transitions.has_changed()?);
    Ok(())
}

#[tokio::test]
async fn accepts_new_client_after_close_client() -> anyhow::Result<()> {
    let mut server = OneClientServer::bind("Test", any_port()).await?;
    let _first = TcpStream::connect(server.local_addr()).await?;
    let adopted = server.accept().await.expect("server closed");
    drop(adopted);
    server.close_client();

    let _second = TcpStream::connect(server.local_addr()).await?;
    assert!(server.accept().await.is_some());
    assert!(server.connected());
    Ok(())
}

#[tokio::test]
async fn close_is_idempotent() -> anyhow::Result<()> {
    let mut server = OneClientServer::bind("Test", any_port()).await?;
    server.close();
    server.close();
    assert!(server.accept().await.is_none());
    assert!(TcpStream::connect(server.local_addr()).await.is_err());
    Ok(())
}

use std::time::Duration;

use scpi_equipment::{
    Error, Result,
    commands::ElectricalQuantity,
    odp3122::Odp3122,
    transport::{ConnectionConfig, TcpTransport, Transport},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
};

async fn local_config(listener: &TcpListener) -> Result<ConnectionConfig> {
    let port = listener.local_addr()?.port();
    Ok(ConnectionConfig::new("127.0.0.1", port)
        .with_timeout(Duration::from_millis(200))
        .with_settle_delay(Duration::ZERO))
}

/// Answers each received line with the reply `respond` gives for it.
fn serve(listener: TcpListener, respond: fn(&str) -> Option<&'static str>) {
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(reply) = respond(&line) {
                write_half.write_all(reply.as_bytes()).await?;
            }
        }
        std::io::Result::Ok(())
    });
}

#[tokio::test]
async fn test_query_over_tcp() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let config = local_config(&listener).await?;
    serve(listener, |line| match line {
        "APP:VOLT?" => Some("5.000,3.300\n"),
        _ => None,
    });

    let mut odp = Odp3122::<TcpTransport>::open(&config).await;
    assert!(odp.is_connected());
    assert_eq!(
        odp.get_level_multiple(ElectricalQuantity::Voltage).await?,
        Some(vec![5.0, 3.3])
    );
    odp.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_receive_timeout() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let config = local_config(&listener).await?;
    serve(listener, |line| match line {
        "INST?" => Some("CH2"),
        _ => None,
    });

    let mut transport = TcpTransport::connect(&config).await?;

    transport.send("APP:CURR?\n").await?;
    assert_eq!(transport.receive().await?, None);

    // Unterminated replies are handed over once the timeout expires
    transport.send("INST?\n").await?;
    assert_eq!(transport.receive().await?, Some("CH2".to_string()));

    transport.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_late_reply_discarded() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let config = local_config(&listener).await?;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        while let Some(line) = lines.next_line().await? {
            let reply = match line.as_str() {
                "APP:VOLT?" => {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    "5.000,3.300\n"
                }
                "APP:CURR?" => "0.500,0.250\n",
                _ => continue,
            };
            write_half.write_all(reply.as_bytes()).await?;
        }
        std::io::Result::Ok(())
    });

    let mut odp = Odp3122::<TcpTransport>::open(&config).await;
    assert_eq!(
        odp.get_level_multiple(ElectricalQuantity::Voltage).await?,
        None
    );
    assert_eq!(
        odp.get_level_multiple(ElectricalQuantity::Current).await?,
        Some(vec![0.5, 0.25])
    );
    Ok(())
}

#[tokio::test]
async fn test_degraded_session() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let config = local_config(&listener).await?;
    drop(listener);

    let mut odp = Odp3122::<TcpTransport>::open(&config).await;
    assert!(!odp.is_connected());
    assert_eq!(odp.name(), "ODP3122 Power Supply");
    assert!(!odp.ping().await?);
    assert!(matches!(
        odp.get_level_multiple(ElectricalQuantity::Voltage).await,
        Err(Error::NotConnected(_))
    ));
    // Validation still comes first
    assert!(matches!(
        odp.select_channel(5).await,
        Err(Error::InvalidChannel { .. })
    ));
    Ok(())
}

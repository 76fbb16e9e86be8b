use scpi_equipment::{
    Error, Result,
    commands::{ConfigBool, ElectricalQuantity, Mode},
    odp3122::Odp3122,
};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let host = std::env::var("SCPI_INSTRUMENT")
        .map_err(|e| Error::Other(format!("Environment variable SCPI_INSTRUMENT not set! `{e}`")))?;

    let mut power_supply = Odp3122::connect(host.as_str()).await;
    if !power_supply.ping().await? {
        return Err(Error::Other(format!(
            "`{}` at `{host}` does not respond",
            power_supply.name()
        )));
    }

    if let Some(identity) = power_supply.get_identity().await? {
        info!(model = %identity.model, serial = %identity.serial_number, "identified");
    }

    power_supply.change_mode(Mode::Remote).await?;

    let applied = power_supply
        .set_limit_multiple(ElectricalQuantity::Voltage, &[Some(6.0), None])
        .await?;
    info!(applied, "CH1 over-voltage limit");

    let applied = power_supply
        .set_level_multiple(ElectricalQuantity::Voltage, &[Some(5.0), Some(3.3)])
        .await?;
    info!(applied, "voltage levels");

    power_supply.change_mode(Mode::Local).await?;

    let (ch1, _ch2) = power_supply.into_channels();

    ch1.set_output(ConfigBool::Enable).await?;
    let voltage = ch1.measure(ElectricalQuantity::Voltage).await?;
    info!(?voltage, "CH1 measured");
    ch1.set_output(ConfigBool::Disable).await?;

    Ok(())
}

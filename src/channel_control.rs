use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    Result,
    commands::{ConfigBool, ElectricalQuantity},
    odp3122::{self, Odp3122},
    transport::{TcpTransport, Transport},
};

/// Handle to one channel of a shared power supply.
///
/// Every call goes through the multi-channel verified operations with only
/// this channel's slot present, so the other channels are left untouched.
pub struct ChannelControl<T: Transport = TcpTransport> {
    channel: u8,
    odp: Arc<Mutex<Odp3122<T>>>,
}

impl<T: Transport> ChannelControl<T> {
    /// Fails with [`Error::InvalidChannel`](crate::Error::InvalidChannel) for channels
    /// the supply does not have.
    pub fn new(odp: Arc<Mutex<Odp3122<T>>>, channel: u8) -> Result<Self> {
        odp3122::profile().check_channel(channel)?;
        Ok(Self::bind(odp, channel))
    }

    pub(crate) fn bind(odp: Arc<Mutex<Odp3122<T>>>, channel: u8) -> Self {
        ChannelControl { odp, channel }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    fn slots(&self, channel_count: u8, value: f64) -> Vec<Option<f64>> {
        (1..=channel_count)
            .map(|channel| (channel == self.channel).then_some(value))
            .collect()
    }

    fn pick<V: Copy>(&self, values: Option<Vec<V>>) -> Option<V> {
        let index = usize::from(self.channel.checked_sub(1)?);
        values.and_then(|values| values.get(index).copied())
    }

    pub async fn set_level(&self, quantity: ElectricalQuantity, value: f64) -> Result<bool> {
        let mut odp = self.odp.lock().await;
        let slots = self.slots(odp.channel_count(), value);
        odp.set_level_multiple(quantity, &slots).await
    }

    pub async fn get_level(&self, quantity: ElectricalQuantity) -> Result<Option<f64>> {
        let mut odp = self.odp.lock().await;
        let levels = odp.get_level_multiple(quantity).await?;
        Ok(self.pick(levels))
    }

    pub async fn set_limit(&self, quantity: ElectricalQuantity, value: f64) -> Result<bool> {
        let mut odp = self.odp.lock().await;
        let slots = self.slots(odp.channel_count(), value);
        odp.set_limit_multiple(quantity, &slots).await
    }

    pub async fn get_limit(&self, quantity: ElectricalQuantity) -> Result<Option<f64>> {
        let mut odp = self.odp.lock().await;
        let limits = odp.get_limit_multiple(quantity).await?;
        Ok(self.pick(limits))
    }

    pub async fn set_output(&self, state: ConfigBool) -> Result<bool> {
        let mut odp = self.odp.lock().await;
        odp.set_output_channel(self.channel, state).await
    }

    pub async fn get_output(&self) -> Result<Option<ConfigBool>> {
        let mut odp = self.odp.lock().await;
        let status = odp.get_status().await?;
        Ok(self.pick(status))
    }

    pub async fn measure(&self, quantity: ElectricalQuantity) -> Result<Option<f64>> {
        let mut odp = self.odp.lock().await;
        odp.measure_channel(quantity, self.channel).await
    }
}

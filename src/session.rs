use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    EmptyResponse, Error, Result, ScpiRequest, ScpiSerialize, codec,
    commands::{
        ChannelSelector, ConfigBool, ElectricalQuantity, GetInstrumentRequest, GetOutputsRequest,
        IdentityRequest, IdentityResponse, MeasureRequest, Namespace, ResetRequest,
        SetInstrumentRequest, SetOutputsRequest,
    },
    profile::InstrumentProfile,
    transport::{ConnectionConfig, DEFAULT_SETTLE_DELAY, TcpTransport, Transport},
};

enum Link<T> {
    Connected(T),
    Degraded(String),
}

/// One instrument behind one exclusively owned connection.
///
/// Writes are verified by reading the instrument back. Operations return
/// `Ok(None)` when the instrument did not answer in time and `Ok(false)`
/// when a write did not take effect. Invalid quantities and channels are
/// rejected before anything is sent.
pub struct InstrumentSession<T: Transport = TcpTransport> {
    profile: InstrumentProfile,
    link: Link<T>,
    channel: u8,
    settle_delay: Duration,
}

impl<T: Transport> InstrumentSession<T> {
    /// Connects to the instrument. A failed connection is logged and yields a
    /// degraded session whose I/O operations fail with [`Error::NotConnected`].
    pub async fn open(profile: InstrumentProfile, config: &ConnectionConfig) -> Self {
        let link = match T::connect(config).await {
            Ok(transport) => Link::Connected(transport),
            Err(e) => {
                warn!(
                    instrument = %profile.name,
                    host = %config.host,
                    port = config.port,
                    error = %e,
                    "socket connection could not be made"
                );
                Link::Degraded(e.to_string())
            }
        };

        InstrumentSession {
            profile,
            link,
            channel: 1,
            settle_delay: config.settle_delay,
        }
    }

    pub fn new(profile: InstrumentProfile, transport: T) -> Self {
        InstrumentSession {
            profile,
            link: Link::Connected(transport),
            channel: 1,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn set_settle_delay(&mut self, settle_delay: Duration) {
        self.settle_delay = settle_delay;
    }

    pub fn profile(&self) -> &InstrumentProfile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn channel_count(&self) -> u8 {
        self.profile.channel_count
    }

    pub fn quantities(&self) -> &[ElectricalQuantity] {
        &self.profile.quantities
    }

    /// Last channel confirmed by [`select_channel`](Self::select_channel).
    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected(_))
    }

    /// Releases the connection. Later I/O fails with [`Error::NotConnected`].
    pub async fn close(&mut self) -> Result<()> {
        let link = std::mem::replace(&mut self.link, Link::Degraded("closed".to_string()));
        match link {
            Link::Connected(mut transport) => transport.close().await,
            Link::Degraded(_) => Ok(()),
        }
    }

    fn transport(&mut self) -> Result<&mut T> {
        match &mut self.link {
            Link::Connected(transport) => Ok(transport),
            Link::Degraded(reason) => Err(Error::NotConnected(format!(
                "`{}`: {reason}",
                self.profile.name
            ))),
        }
    }

    async fn send_raw<Request>(&mut self, request: &Request) -> Result<()>
    where
        Request: ScpiSerialize,
    {
        let mut out = codec::encode(request);
        debug!(instrument = %self.profile.name, command = %out, "send");
        out.push('\n');
        self.transport()?.send(&out).await
    }

    /// Fire-and-forget, followed by the settle delay.
    async fn send<Request>(&mut self, request: Request) -> Result<()>
    where
        Request: ScpiRequest<Response = EmptyResponse>,
    {
        self.send_raw(&request).await?;
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        Ok(())
    }

    async fn execute<Request>(&mut self, request: Request) -> Result<Option<Request::Response>>
    where
        Request: ScpiRequest,
    {
        self.send_raw(&request).await?;

        let reply = self.transport()?.receive().await?;
        match reply {
            Some(data) => {
                debug!(instrument = %self.profile.name, response = %data.trim_end(), "receive");
                codec::decode(&data).map(Some)
            }
            None => {
                warn!(
                    instrument = %self.profile.name,
                    command = %codec::encode(&request),
                    "no response"
                );
                Ok(None)
            }
        }
    }

    pub async fn get_identity(&mut self) -> Result<Option<IdentityResponse>> {
        self.execute(IdentityRequest).await
    }

    /// True if `*IDN?` gets any non-blank answer in time.
    pub async fn ping(&mut self) -> Result<bool> {
        if !self.is_connected() {
            return Ok(false);
        }
        self.send_raw(&IdentityRequest).await?;
        let reply = self.transport()?.receive().await?;
        Ok(reply.is_some_and(|data| !data.trim().is_empty()))
    }

    /// Restores factory settings.
    pub async fn reset(&mut self) -> Result<()> {
        self.send(ResetRequest).await
    }

    pub async fn get_level_multiple(
        &mut self,
        quantity: ElectricalQuantity,
    ) -> Result<Option<Vec<f64>>> {
        self.read_values(Namespace::Level, quantity).await
    }

    /// Sets `quantity` on several channels in one command and reads it back.
    ///
    /// `None` slots keep the channel's current value and are not verified.
    pub async fn set_level_multiple(
        &mut self,
        quantity: ElectricalQuantity,
        requested: &[Option<f64>],
    ) -> Result<bool> {
        self.write_values(Namespace::Level, quantity, requested).await
    }

    pub async fn get_limit_multiple(
        &mut self,
        quantity: ElectricalQuantity,
    ) -> Result<Option<Vec<f64>>> {
        self.read_values(Namespace::Limit, quantity).await
    }

    pub async fn set_limit_multiple(
        &mut self,
        quantity: ElectricalQuantity,
        requested: &[Option<f64>],
    ) -> Result<bool> {
        self.write_values(Namespace::Limit, quantity, requested).await
    }

    async fn read_values(
        &mut self,
        namespace: Namespace,
        quantity: ElectricalQuantity,
    ) -> Result<Option<Vec<f64>>> {
        let request = codec::query_request(namespace, quantity, &self.profile)?;
        Ok(self.execute(request).await?.map(|response| response.0))
    }

    async fn write_values(
        &mut self,
        namespace: Namespace,
        quantity: ElectricalQuantity,
        requested: &[Option<f64>],
    ) -> Result<bool> {
        self.profile.check_queryable(quantity)?;

        let Some(current) = self.read_values(namespace, quantity).await? else {
            warn!(
                instrument = %self.profile.name,
                ?quantity,
                "current values unavailable, nothing written"
            );
            return Ok(false);
        };

        let request = codec::set_request(namespace, quantity, &self.profile, requested, &current)?;
        self.send(request).await?;

        let Some(actual) = self.read_values(namespace, quantity).await? else {
            warn!(
                instrument = %self.profile.name,
                ?quantity,
                "could not read back written values"
            );
            return Ok(false);
        };

        let verified = codec::matches_requested(requested, &actual, self.profile.channel_count);
        if !verified {
            warn!(
                instrument = %self.profile.name,
                ?quantity,
                ?namespace,
                expected = ?requested,
                ?actual,
                "values not applied"
            );
        }
        Ok(verified)
    }

    /// Output state of every channel.
    pub async fn get_status(&mut self) -> Result<Option<Vec<ConfigBool>>> {
        Ok(self
            .execute(GetOutputsRequest)
            .await?
            .map(|response| response.0))
    }

    /// Switches one channel's output. The command always carries every
    /// channel, so every channel is verified.
    pub async fn set_output_channel(&mut self, channel: u8, mode: ConfigBool) -> Result<bool> {
        self.profile.check_channel(channel)?;

        let Some(mut states) = self.get_status().await? else {
            return Ok(false);
        };
        let Some(slot) = states.get_mut(usize::from(channel - 1)) else {
            warn!(
                instrument = %self.profile.name,
                channel,
                reported = states.len(),
                "status does not cover channel"
            );
            return Ok(false);
        };
        *slot = mode;

        self.send(SetOutputsRequest {
            states: states.clone(),
        })
        .await?;

        let Some(actual) = self.get_status().await? else {
            return Ok(false);
        };

        if actual != states {
            warn!(
                instrument = %self.profile.name,
                expected = ?states,
                ?actual,
                "output states not applied"
            );
            return Ok(false);
        }
        Ok(true)
    }

    pub async fn select_channel(&mut self, channel: u8) -> Result<bool> {
        self.profile.check_channel(channel)?;

        self.send(SetInstrumentRequest {
            channel: ChannelSelector(channel),
        })
        .await?;

        let confirmed = self.get_current_channel().await? == Some(channel);
        if confirmed {
            self.channel = channel;
        } else {
            warn!(instrument = %self.profile.name, channel, "channel selection not confirmed");
        }
        Ok(confirmed)
    }

    pub async fn get_current_channel(&mut self) -> Result<Option<u8>> {
        Ok(self
            .execute(GetInstrumentRequest)
            .await?
            .map(|response| response.channel.0))
    }

    /// Selects `channel` and measures `quantity` on it.
    pub async fn measure_channel(
        &mut self,
        quantity: ElectricalQuantity,
        channel: u8,
    ) -> Result<Option<f64>> {
        self.profile.check_supported(quantity)?;
        self.profile.check_channel(channel)?;

        if !self.select_channel(channel).await? {
            return Ok(None);
        }

        Ok(self
            .execute(MeasureRequest { quantity })
            .await?
            .map(|response| response.0))
    }

    /// Single line command without verification, for device specific settings.
    pub(crate) async fn send_command<Request>(&mut self, request: Request) -> Result<()>
    where
        Request: ScpiRequest<Response = EmptyResponse>,
    {
        self.send(request).await
    }
}

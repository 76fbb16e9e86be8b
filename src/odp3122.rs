//! OWON ODP3122, a 2 channel programmable power supply.
//!
//! CH1: 0 V to 30 V (OVP up to 31 V), 0 A to 12 A (OCP up to 12.1 A).
//! CH2: 0 V to 6 V (OVP up to 6.6 V), 0 A to 3 A (OCP up to 3.1 A).

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use tokio::sync::Mutex;

use crate::{
    Result,
    channel_control::ChannelControl,
    commands::{ElectricalQuantity, Mode, SetModeRequest},
    profile::InstrumentProfile,
    session::InstrumentSession,
    transport::{ConnectionConfig, TcpTransport, Transport},
};

pub const NAME: &str = "ODP3122 Power Supply";
pub const CHANNEL_COUNT: u8 = 2;
pub const DEFAULT_PORT: u16 = 3000;

pub fn profile() -> InstrumentProfile {
    InstrumentProfile::new(
        NAME,
        CHANNEL_COUNT,
        &[
            ElectricalQuantity::Voltage,
            ElectricalQuantity::Current,
            ElectricalQuantity::Power,
        ],
    )
    .with_default_port(DEFAULT_PORT)
}

pub fn config(host: &str) -> ConnectionConfig {
    ConnectionConfig::new(host, DEFAULT_PORT)
}

pub struct Odp3122<T: Transport = TcpTransport> {
    session: InstrumentSession<T>,
}

impl Odp3122<TcpTransport> {
    /// Connects on the default port. See [`InstrumentSession::open`] for
    /// connection failures.
    pub async fn connect(host: &str) -> Self {
        Self::open(&config(host)).await
    }
}

impl<T: Transport> Odp3122<T> {
    pub async fn open(config: &ConnectionConfig) -> Self {
        Odp3122 {
            session: InstrumentSession::open(profile(), config).await,
        }
    }

    pub fn new(transport: T) -> Self {
        Odp3122 {
            session: InstrumentSession::new(profile(), transport),
        }
    }

    /// Switches between front panel (local) and SCPI-only (remote) operation.
    /// Not verified, the supply does not report its mode.
    pub async fn change_mode(&mut self, mode: Mode) -> Result<()> {
        self.session.send_command(SetModeRequest { mode }).await
    }

    pub fn into_session(self) -> InstrumentSession<T> {
        self.session
    }

    pub fn into_channels(self) -> (ChannelControl<T>, ChannelControl<T>) {
        let odp = Arc::new(Mutex::new(self));
        (ChannelControl::bind(odp.clone(), 1), ChannelControl::bind(odp, 2))
    }
}

impl<T: Transport> Deref for Odp3122<T> {
    type Target = InstrumentSession<T>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<T: Transport> DerefMut for Odp3122<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

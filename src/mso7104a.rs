//! Agilent MSO7104A, a 4 channel mixed signal oscilloscope.
//!
//! Only the generic session operations are available; it exposes no
//! multi-channel value commands.

use std::ops::{Deref, DerefMut};

use crate::{
    profile::InstrumentProfile,
    session::InstrumentSession,
    transport::{ConnectionConfig, TcpTransport, Transport},
};

pub const NAME: &str = "MSO7104A Oscilloscope";
pub const CHANNEL_COUNT: u8 = 4;
pub const DEFAULT_PORT: u16 = 5025;

pub fn profile() -> InstrumentProfile {
    InstrumentProfile::new(NAME, CHANNEL_COUNT, &[]).with_default_port(DEFAULT_PORT)
}

pub fn config(host: &str) -> ConnectionConfig {
    ConnectionConfig::new(host, DEFAULT_PORT)
}

pub struct Mso7104a<T: Transport = TcpTransport> {
    session: InstrumentSession<T>,
}

impl Mso7104a<TcpTransport> {
    pub async fn connect(host: &str) -> Self {
        Self::open(&config(host)).await
    }
}

impl<T: Transport> Mso7104a<T> {
    pub async fn open(config: &ConnectionConfig) -> Self {
        Mso7104a {
            session: InstrumentSession::open(profile(), config).await,
        }
    }

    pub fn new(transport: T) -> Self {
        Mso7104a {
            session: InstrumentSession::new(profile(), transport),
        }
    }

    pub fn into_session(self) -> InstrumentSession<T> {
        self.session
    }
}

impl<T: Transport> Deref for Mso7104a<T> {
    type Target = InstrumentSession<T>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<T: Transport> DerefMut for Mso7104a<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

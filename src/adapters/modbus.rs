//! Modbus/TCP bus adapter.
//!
//! Implements [`RegisterPort`] with the synchronous `tokio-modbus` client.
//! Measurements are input registers, actuators are coils and holding
//! registers.  A transport failure drops the connection; the next call
//! reconnects once before giving up.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use log::{info, warn};
use tokio_modbus::client::sync::{self, Context, Reader, Writer};
use tokio_modbus::Slave;

use crate::app::ports::RegisterPort;
use crate::config::BusConfig;
use crate::error::BusError;

/// Per-transaction timeout.
const IO_TIMEOUT: Duration = Duration::from_millis(500);

pub struct ModbusTcpBus {
    addr: SocketAddr,
    slave: Slave,
    ctx: Option<Context>,
}

impl ModbusTcpBus {
    /// Resolve the device address and open the connection.
    pub fn connect(config: &BusConfig) -> Result<Self, BusError> {
        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| BusError::Transport(format!("resolve {}: {e}", config.host)))?
            .next()
            .ok_or_else(|| BusError::Transport(format!("no address for {}", config.host)))?;

        let mut bus = Self {
            addr,
            slave: Slave(config.unit_id),
            ctx: None,
        };
        bus.context()?;
        Ok(bus)
    }

    fn context(&mut self) -> Result<&mut Context, BusError> {
        if self.ctx.is_none() {
            let ctx = sync::tcp::connect_slave_with_timeout(self.addr, self.slave, Some(IO_TIMEOUT))
                .map_err(|e| BusError::Transport(format!("connect {}: {e}", self.addr)))?;
            info!("Modbus connected to {} (unit {})", self.addr, self.slave.0);
            self.ctx = Some(ctx);
        }
        self.ctx.as_mut().ok_or(BusError::NotConnected)
    }

    fn call<T>(
        &mut self,
        op: impl FnOnce(&mut Context) -> tokio_modbus::Result<T>,
    ) -> Result<T, BusError> {
        match op(self.context()?) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(code)) => Err(BusError::Exception(format!("{code:?}"))),
            Err(e) => {
                warn!("Modbus transport error, dropping connection: {}", e);
                self.ctx = None;
                Err(BusError::Transport(e.to_string()))
            }
        }
    }
}

impl RegisterPort for ModbusTcpBus {
    fn read_input_registers(&mut self, address: u16, buf: &mut [u16]) -> Result<(), BusError> {
        let count = buf.len() as u16;
        let values = self.call(|ctx| ctx.read_input_registers(address, count))?;
        if values.len() < buf.len() {
            return Err(BusError::ShortRead {
                expected: buf.len(),
                got: values.len(),
            });
        }
        buf.copy_from_slice(&values[..buf.len()]);
        Ok(())
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        self.call(|ctx| ctx.write_single_register(address, value))
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), BusError> {
        self.call(|ctx| ctx.write_single_coil(address, value))
    }

    fn write_coils(&mut self, address: u16, values: &[bool]) -> Result<(), BusError> {
        self.call(|ctx| ctx.write_multiple_coils(address, values))
    }
}

//! The application callback table
//!
//! A device owns exactly one [`Api`] table. Every slot is optional; the
//! fallback behaviour of an empty slot is documented per field. Handlers
//! are plain function pointers receiving the device itself, so they can
//! reach the configuration, the system section and the driver through it.

use caniot_common::datatype::BlcSysCmd;
use caniot_common::{AttrKey, Endpoint, Error};

use crate::device::Device;

/// Handles a command query on one endpoint
///
/// `payload` is the opaque command payload of the request.
pub type CommandHandler<D> = fn(&mut Device<'_, D>, Endpoint, payload: &[u8]) -> Result<(), Error>;

/// Fills `buf` with the telemetry payload of one endpoint and returns its
/// length (at most 8)
pub type TelemetryHandler<D> =
    fn(&mut Device<'_, D>, Endpoint, buf: &mut [u8; 8]) -> Result<u8, Error>;

/// Synchronises the in-RAM configuration with the application's storage
pub type ConfigHook<D> = fn(&mut Device<'_, D>) -> Result<(), Error>;

/// Reads an application-defined attribute by key
pub type CustomAttrReadHandler<D> = fn(&mut Device<'_, D>, AttrKey) -> Result<u32, Error>;

/// Writes an application-defined attribute by key
pub type CustomAttrWriteHandler<D> = fn(&mut Device<'_, D>, AttrKey, u32) -> Result<(), Error>;

/// Handles one decoded board-control system sub-command
pub type BlcSysCmdHandler<D> = fn(&mut Device<'_, D>, BlcSysCmd) -> Result<(), Error>;

/// Configuration synchronisation hooks
pub struct ConfigHooks<D> {
    /// Called before the configuration is read while marked dirty; should
    /// load the stored configuration into RAM. When absent, the RAM copy is
    /// used as-is and the dirty flag stays set.
    pub on_read: Option<ConfigHook<D>>,
    /// Called after the configuration was updated; should persist and apply
    /// it. When absent, writes stay in RAM only.
    pub on_write: Option<ConfigHook<D>>,
}

/// Application-defined attribute hooks
///
/// When a key fails schema resolution and both hooks are present, the
/// operation is delegated to them instead of failing. With either hook
/// absent, unresolved keys fail with the resolver error.
pub struct CustomAttrHooks<D> {
    /// Read an application attribute
    pub read: Option<CustomAttrReadHandler<D>>,
    /// Write an application attribute
    pub write: Option<CustomAttrWriteHandler<D>>,
}

/// The application callback table of a device
pub struct Api<D> {
    /// Configuration synchronisation hooks
    pub config: ConfigHooks<D>,
    /// Application-defined attribute hooks
    pub custom_attr: CustomAttrHooks<D>,
    /// Executes command queries. When absent, commands fail with
    /// [`Error::NoCommandHandler`].
    pub command_handler: Option<CommandHandler<D>>,
    /// Builds telemetry payloads. When absent, telemetry requests fail with
    /// [`Error::NoTelemetryHandler`].
    pub telemetry_handler: Option<TelemetryHandler<D>>,
    /// Receives board-control system sub-commands. When absent, the system
    /// command byte of board-control commands is ignored.
    pub blc_sys_cmd_handler: Option<BlcSysCmdHandler<D>>,
}

impl<D> Api<D> {
    /// An empty table: every slot falls back to its documented default
    pub const fn new() -> Self {
        Api {
            config: ConfigHooks {
                on_read: None,
                on_write: None,
            },
            custom_attr: CustomAttrHooks {
                read: None,
                write: None,
            },
            command_handler: None,
            telemetry_handler: None,
            blc_sys_cmd_handler: None,
        }
    }
}

impl<D> Default for Api<D> {
    fn default() -> Self {
        Self::new()
    }
}

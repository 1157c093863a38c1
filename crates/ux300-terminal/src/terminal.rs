use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use ux300_transport::Connector;

use crate::config::TerminalConfig;
use crate::error::Result;
use crate::events::{EventBus, TerminalEvent};
use crate::station::{Command, CommandStation};

/// Driver for one UX300 terminal.
///
/// Commands are sent through the [`CommandStation`]; everything the terminal
/// reports comes back as [`TerminalEvent`]s on the [`EventBus`].
///
/// ```no_run
/// # async fn demo() -> ux300_terminal::Result<()> {
/// use ux300_terminal::{Terminal, TerminalConfig, TerminalEvent};
/// use ux300_transport::{SerialConfig, SerialConnector};
///
/// let connector = SerialConnector::new(SerialConfig::new("/dev/ttyACM0"));
/// let terminal = Terminal::new(connector, TerminalConfig::default());
/// let mut events = terminal.subscribe();
///
/// terminal.open().await?;
/// terminal.pay(1500, "T-0042").await?;
/// while let Ok(event) = events.recv().await {
///     if let TerminalEvent::PaymentVoucher { voucher, .. } = event {
///         println!("{}", voucher.join("\n"));
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Terminal<C: Connector> {
    station: CommandStation<C>,
    bus: EventBus,
}

impl<C: Connector> Terminal<C> {
    /// Create a driver. Nothing is opened until [`Terminal::open`] or the
    /// first command.
    pub fn new(connector: C, config: TerminalConfig) -> Self {
        let config = config.normalized();
        let bus = EventBus::new(config.event_capacity);
        let station = CommandStation::new(connector, config, bus.clone());
        Self { station, bus }
    }

    pub fn config(&self) -> &TerminalConfig {
        self.station.config()
    }

    pub fn station(&self) -> &CommandStation<C> {
        &self.station
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.bus.subscribe()
    }

    /// Run `handler` for each event called `name`.
    pub fn on<F>(&self, name: &'static str, handler: F) -> JoinHandle<()>
    where
        F: FnMut(TerminalEvent) + Send + 'static,
    {
        self.bus.on(name, handler)
    }

    pub async fn open(&self) -> Result<()> {
        self.station.open().await
    }

    pub async fn close(&self) {
        self.station.close().await
    }

    pub async fn is_open(&self) -> bool {
        self.station.is_open().await
    }

    /// Poll the terminal and wait for its ACK.
    pub async fn poll(&self) -> Result<()> {
        self.station.execute(&Command::Poll).await
    }

    /// Request initialization and wait for its ACK.
    pub async fn initialize(&self) -> Result<()> {
        self.station.execute(&Command::Initialize).await
    }

    /// Ask for the result of the last initialization.
    pub async fn initialization_response(&self) -> Result<()> {
        self.station.execute(&Command::InitializationResponse).await
    }

    /// Start a sale of `amount` tagged with `ticket`.
    pub async fn pay(&self, amount: u64, ticket: &str) -> Result<()> {
        self.station
            .execute(&Command::Pay {
                amount,
                ticket: ticket.to_string(),
            })
            .await
    }

    pub async fn close_transactions(&self) -> Result<()> {
        self.station.execute(&Command::CloseTransactions).await
    }

    pub async fn last_transaction(&self) -> Result<()> {
        self.station.execute(&Command::LastTransaction).await
    }

    pub async fn cancel_transaction(&self) -> Result<()> {
        self.station.execute(&Command::CancelTransaction).await
    }

    pub async fn load_keys(&self) -> Result<()> {
        self.station.execute(&Command::LoadKeys).await
    }

    /// Send an arbitrary message.
    pub async fn send_raw(&self, type_code: &str, fields: &[String]) -> Result<()> {
        self.station
            .execute(&Command::Raw {
                type_code: type_code.to_string(),
                fields: fields.to_vec(),
            })
            .await
    }
}

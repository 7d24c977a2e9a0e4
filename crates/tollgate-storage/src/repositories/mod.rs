pub mod device;
pub mod hours;
pub mod option;
pub mod ticket;

pub use device::{DeviceRepository, SqliteDeviceRepository};
pub use hours::{HoursRepository, SqliteHoursRepository};
pub use option::{OptionRepository, SqliteOptionRepository};
pub use ticket::{SqliteTicketRepository, TicketRepository};

pub mod device;
pub mod hours;
pub mod option;
pub mod temporal_validity;
pub mod ticket;

pub use device::DeviceRecord;
pub use hours::{
    DayPattern, ExceptionHours, ExceptionHoursRow, Polarity, RegularHours, RegularHoursRow,
    parse_time,
};
pub use option::ConfigOption;
pub use temporal_validity::TemporalValidity;
pub use ticket::{NewTicket, Ticket, TicketStatus, generate_code};

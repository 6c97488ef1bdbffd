pub mod booking;
pub mod report;
pub mod shift;
pub mod ticket;
pub mod user;

pub use booking::{Booking, BookingScope, BookingStatus, BookingView, ReportStatus};
pub use report::{LessonReport, ReportSections};
pub use shift::{Shift, TimeSlot};
pub use ticket::{TicketGrant, TicketReason};
pub use user::{Profile, Role};

// Models module - Database entity representations

pub mod attendance;
pub mod card;
pub mod member;

pub use attendance::{AttendanceRecord, Classification};
pub use card::RfidCard;
pub use member::{Member, MemberSummary};

pub mod attendance_record;
pub mod attendance_token;

pub use attendance_record::Entity as AttendanceRecord;
pub use attendance_token::Entity as AttendanceToken;

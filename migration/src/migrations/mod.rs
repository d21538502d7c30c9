pub mod m202510010001_create_attendance_tokens;
pub mod m202510010002_create_attendance_records;

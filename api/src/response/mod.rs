use serde::Serialize;

/// Standardized API response wrapper for JSON responses.
///
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Attendance recorded"
/// }
/// ```
///
/// On failure `data` carries `T::default()` (usually `null`) and `message`
/// holds the human-readable reason.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Constructs a success response with the given data and message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Constructs an error response with a message and default `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}

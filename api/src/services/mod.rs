pub mod attendance_verifier;
pub mod qr;
pub mod token_issuer;

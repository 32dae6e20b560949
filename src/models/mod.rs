pub mod fingerprint;
pub mod request;

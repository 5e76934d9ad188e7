mod client;
mod env;

pub use client::ModuleClient;
pub use env::EnvVars;

use chrono::{SecondsFormat, Utc};

/// RFC3339 timestamp with millisecond precision, the wire format
/// used for `createdAt`/`updatedAt` attributes.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_timestamps_are_utc_millis() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        // 2024-01-01T00:00:00.000Z
        assert_eq!(ts.matches(':').count(), 2);
        assert!(ts.contains('.'));
    }
}

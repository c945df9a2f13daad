use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub decoded: AtomicU64,
    pub unsupported: AtomicU64,
    pub truncated: AtomicU64,
    pub decoder_rejects: AtomicU64,
    pub handles_registered: AtomicU64,
    pub crypt_unverified: AtomicU64,
}

pub static METRICS: once_cell::sync::Lazy<&'static Metrics> =
    once_cell::sync::Lazy::new(|| Box::leak(Box::new(Metrics::default())));

impl Metrics {
    pub fn inc_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unsupported(&self) {
        self.unsupported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_truncated(&self) {
        self.truncated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_decoder_rejects(&self) {
        self.decoder_rejects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_handles_registered(&self) {
        self.handles_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_crypt_unverified(&self) {
        self.crypt_unverified.fetch_add(1, Ordering::Relaxed);
    }

    /// One-line counter summary for logs and the CLI.
    pub fn snapshot(&self) -> String {
        format!(
            "decoded={} unsupported={} truncated={} rejects={} handles={} crypt_unverified={}",
            self.decoded.load(Ordering::Relaxed),
            self.unsupported.load(Ordering::Relaxed),
            self.truncated.load(Ordering::Relaxed),
            self.decoder_rejects.load(Ordering::Relaxed),
            self.handles_registered.load(Ordering::Relaxed),
            self.crypt_unverified.load(Ordering::Relaxed),
        )
    }
}

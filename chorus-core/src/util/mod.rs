mod id;

pub use id::*;

use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Milliseconds since the Unix epoch, according to this process' clock.
pub type Timestamp = i64;

/// Returns the current time as a [Timestamp].
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

use std::time::Duration;

/// Pretty-print a duration (used in logs and diagnostics)
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    let millis = duration.as_millis();
    let seconds = duration.as_secs();
    let minutes = seconds / 60;
    let hours = seconds / 3_600;

    match (hours, minutes, seconds, millis) {
        (0, 0, 0, 0) => format!("{:.3}μs", nanos as f64 / 1_000.0),
        (0, 0, 0, _) => format!("{:.3}ms", nanos as f64 / 1_000_000.0),
        (0, 0, _, _) => format!("{:.3}s", duration.as_secs_f64()),
        (0, _, _, _) => format!("{:.3}m", duration.as_secs_f64() / 60.0),
        _ => format!("{:.3}h", duration.as_secs_f64() / 3_600.0),
    }
}

/// Serde adapter storing a [`Duration`] as whole milliseconds.
///
/// ```ignore
/// #[serde(rename = "mem_ms", with = "common::util::time::duration_ms")]
/// mem: Duration,
/// ```
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    /// Same as the parent module, for optional durations.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(Duration::from_micros(250)), "250.000μs");
        assert_eq!(format_duration(Duration::from_millis(200)), "200.000ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.500m");
        assert_eq!(format_duration(Duration::from_secs(5_400)), "1.500h");
    }
}

use chrono::{DateTime, Duration, TimeZone, Utc};

fn fit_with_remainder(dividend: u64, divisor: u64) -> (u64, u64) {
    let fit = dividend / divisor;
    let remainder = dividend % divisor;
    (fit, remainder)
}

pub fn get_elapsed_time<Tz>(time: DateTime<Tz>) -> Duration
where
    Tz: TimeZone,
{
    Utc::now().signed_duration_since(time)
}

/// Given a duration, format like "00:00:00"
pub fn format_elapsed_time(elapsed: Duration) -> String {
    let elapsed = elapsed.num_seconds().abs() as u64;
    let (hours, remainder) = fit_with_remainder(elapsed, 3600);
    let (minutes, seconds) = fit_with_remainder(remainder, 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Given a timestamp, get the elapsed time and return formatted string
pub fn format_time_as_elapsed<Tz>(time: DateTime<Tz>) -> String
where
    Tz: TimeZone,
{
    format_elapsed_time(get_elapsed_time(time))
}

/// Display an optional value, or "---" when absent
pub fn maybe_string<T>(item: Option<&T>) -> String
where
    T: ToString,
{
    item.map(std::string::ToString::to_string)
        .unwrap_or_else(|| String::from("---"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed_time() {
        assert_eq!(format_elapsed_time(Duration::seconds(0)), "00:00:00");
        assert_eq!(format_elapsed_time(Duration::seconds(75)), "00:01:15");
        assert_eq!(format_elapsed_time(Duration::seconds(3723)), "01:02:03");
    }

    #[test]
    fn test_maybe_string() {
        assert_eq!(maybe_string(Some(&3)), "3");
        assert_eq!(maybe_string::<usize>(None), "---");
    }
}

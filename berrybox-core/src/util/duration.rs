use std::time::Duration;

/// The longest duration [format_iso_duration] writes
const MAX_FORMATTED_SECONDS: u32 = u32::MAX;

/// Parses an ISO-8601 duration such as `PT4M13S` or `P1DT2H`.
///
/// Only the day and time designators are supported, since video durations never use
/// years, months or weeks. Returns [None] if the string is malformed or too long to represent.
pub fn parse_iso_duration(input: &str) -> Option<Duration> {
    let rest = input.trim().strip_prefix('P')?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut seconds = 0f64;
    let mut found_component = false;

    for (value, designator) in components(date_part)? {
        match designator {
            'D' => seconds += value * 86400.,
            _ => return None,
        }
        found_component = true;
    }

    if let Some(time_part) = time_part {
        let time_components = components(time_part)?;

        // "PT" without anything after it is not a duration
        if time_components.is_empty() {
            return None;
        }

        for (value, designator) in time_components {
            match designator {
                'H' => seconds += value * 3600.,
                'M' => seconds += value * 60.,
                'S' => seconds += value,
                _ => return None,
            }
            found_component = true;
        }
    }

    if !found_component {
        return None;
    }

    Duration::try_from_secs_f64(seconds).ok()
}

/// Formats seconds as an ISO-8601 duration, e.g. `253.4` becomes `PT4M13S`.
/// Negative and invalid values format as zero, huge values are capped.
pub fn format_iso_duration(seconds: f32) -> String {
    let total = seconds.clamp(0., MAX_FORMATTED_SECONDS as f32).round() as u64;

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut result = String::from("PT");

    if hours > 0 {
        result.push_str(&format!("{}H", hours));
    }

    if minutes > 0 {
        result.push_str(&format!("{}M", minutes));
    }

    if seconds > 0 || (hours == 0 && minutes == 0) {
        result.push_str(&format!("{}S", seconds));
    }

    result
}

/// Splits a designator section like `4M13S` into `(4, 'M'), (13, 'S')`
fn components(section: &str) -> Option<Vec<(f64, char)>> {
    let mut result = vec![];
    let mut number = String::new();

    for char in section.chars() {
        if char.is_ascii_digit() || char == '.' {
            number.push(char);
            continue;
        }

        if number.is_empty() {
            return None;
        }

        let value = number.parse::<f64>().ok()?;
        result.push((value, char));
        number.clear();
    }

    // Trailing digits without a designator
    if !number.is_empty() {
        return None;
    }

    Some(result)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parsing() {
        assert_eq!(parse_iso_duration("PT4M13S"), Some(Duration::from_secs(253)));
        assert_eq!(parse_iso_duration("PT1H"), Some(Duration::from_secs(3600)));
        assert_eq!(
            parse_iso_duration("P1DT2H3M4S"),
            Some(Duration::from_secs(86400 + 7200 + 180 + 4))
        );
        assert_eq!(parse_iso_duration("PT0S"), Some(Duration::ZERO));
        assert_eq!(
            parse_iso_duration("PT1.5S"),
            Some(Duration::from_millis(1500))
        );

        assert_eq!(parse_iso_duration(""), None);
        assert_eq!(parse_iso_duration("P"), None);
        assert_eq!(parse_iso_duration("PT"), None);
        assert_eq!(parse_iso_duration("4M13S"), None);
        assert_eq!(parse_iso_duration("PT4X"), None);
        assert_eq!(parse_iso_duration("PT13"), None);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_iso_duration(253.4), "PT4M13S");
        assert_eq!(format_iso_duration(3600.), "PT1H");
        assert_eq!(format_iso_duration(3661.), "PT1H1M1S");
        assert_eq!(format_iso_duration(0.), "PT0S");
        assert_eq!(format_iso_duration(-5.), "PT0S");
        assert_eq!(format_iso_duration(f32::NAN), "PT0S");
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(parse_iso_duration("PT99999999999999999999S"), None);
        assert_eq!(parse_iso_duration("PT5124095576030431H15S"), None);

        let capped = format_iso_duration(f32::MAX);
        assert!(parse_iso_duration(&capped).is_some());
        assert_eq!(capped, format_iso_duration(u32::MAX as f32));
    }
}

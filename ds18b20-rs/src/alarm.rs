/// Whole degrees of a raw reading, rounded towards negative infinity.
pub fn whole_degrees(raw: u16) -> i8 {
    ((raw as i16) >> 4) as i8
}

/// Alarm policy of the sensor.
///
/// Not triggered while the whole-degree part of `raw` lies strictly between `low` and `high`,
/// triggered at or beyond either threshold.
pub fn is_triggered(raw: u16, low: i8, high: i8) -> bool {
    let degrees = whole_degrees(raw);
    !(degrees > low && degrees < high)
}

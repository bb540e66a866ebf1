//! Unit conversion over a per-category graph: every unit converts through
//! its category's base unit. Temperature is the one non-linear category
//! (Celsius base).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Length,
    Weight,
    Temperature,
    Volume,
    Area,
    Speed,
    Data,
    Time,
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitCategory::Length => "length",
            UnitCategory::Weight => "weight",
            UnitCategory::Temperature => "temperature",
            UnitCategory::Volume => "volume",
            UnitCategory::Area => "area",
            UnitCategory::Speed => "speed",
            UnitCategory::Data => "data",
            UnitCategory::Time => "time",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
enum Scale {
    /// `base = value * factor`
    Linear(f64),
    Fahrenheit,
    Kelvin,
}

impl Scale {
    fn to_base(self, v: f64) -> f64 {
        match self {
            Scale::Linear(f) => v * f,
            Scale::Fahrenheit => (v - 32.0) * 5.0 / 9.0,
            Scale::Kelvin => v - 273.15,
        }
    }

    fn from_base(self, v: f64) -> f64 {
        match self {
            Scale::Linear(f) => v / f,
            Scale::Fahrenheit => v * 9.0 / 5.0 + 32.0,
            Scale::Kelvin => v + 273.15,
        }
    }
}

pub struct UnitDef {
    /// Canonical symbol shown back to the user.
    pub symbol: &'static str,
    aliases: &'static [&'static str],
    pub category: UnitCategory,
    scale: Scale,
}

macro_rules! unit {
    ($symbol:literal, $aliases:expr, $cat:ident, $scale:expr) => {
        UnitDef {
            symbol: $symbol,
            aliases: $aliases,
            category: UnitCategory::$cat,
            scale: $scale,
        }
    };
}

#[rustfmt::skip]
static UNITS: &[UnitDef] = &[
    // Length (base: meter)
    unit!("mm", &["mm", "millimeter", "millimeters", "millimetre", "millimetres"], Length, Scale::Linear(0.001)),
    unit!("cm", &["cm", "centimeter", "centimeters", "centimetre", "centimetres"], Length, Scale::Linear(0.01)),
    unit!("m", &["m", "meter", "meters", "metre", "metres"], Length, Scale::Linear(1.0)),
    unit!("km", &["km", "kilometer", "kilometers", "kilometre", "kilometres"], Length, Scale::Linear(1000.0)),
    unit!("in", &["in", "inch", "inches", "\""], Length, Scale::Linear(0.0254)),
    unit!("ft", &["ft", "foot", "feet", "'"], Length, Scale::Linear(0.3048)),
    unit!("yd", &["yd", "yard", "yards"], Length, Scale::Linear(0.9144)),
    unit!("mi", &["mi", "mile", "miles"], Length, Scale::Linear(1609.344)),
    unit!("nmi", &["nmi", "nauticalmile", "nauticalmiles"], Length, Scale::Linear(1852.0)),
    // Weight (base: kilogram)
    unit!("mg", &["mg", "milligram", "milligrams"], Weight, Scale::Linear(1e-6)),
    unit!("g", &["g", "gram", "grams"], Weight, Scale::Linear(0.001)),
    unit!("kg", &["kg", "kilogram", "kilograms", "kilo", "kilos"], Weight, Scale::Linear(1.0)),
    unit!("t", &["t", "tonne", "tonnes", "ton", "tons"], Weight, Scale::Linear(1000.0)),
    unit!("oz", &["oz", "ounce", "ounces"], Weight, Scale::Linear(0.028349523125)),
    unit!("lb", &["lb", "lbs", "pound", "pounds"], Weight, Scale::Linear(0.45359237)),
    unit!("st", &["st", "stone", "stones"], Weight, Scale::Linear(6.35029318)),
    // Temperature (base: celsius)
    unit!("°C", &["c", "°c", "celsius", "centigrade"], Temperature, Scale::Linear(1.0)),
    unit!("°F", &["f", "°f", "fahrenheit"], Temperature, Scale::Fahrenheit),
    unit!("K", &["k", "kelvin"], Temperature, Scale::Kelvin),
    // Volume (base: liter)
    unit!("ml", &["ml", "milliliter", "milliliters", "millilitre", "millilitres"], Volume, Scale::Linear(0.001)),
    unit!("l", &["l", "liter", "liters", "litre", "litres"], Volume, Scale::Linear(1.0)),
    unit!("gal", &["gal", "gallon", "gallons"], Volume, Scale::Linear(3.785411784)),
    unit!("qt", &["qt", "quart", "quarts"], Volume, Scale::Linear(0.946352946)),
    unit!("pt", &["pt", "pint", "pints"], Volume, Scale::Linear(0.473176473)),
    unit!("cup", &["cup", "cups"], Volume, Scale::Linear(0.2365882365)),
    unit!("fl oz", &["floz", "fluidounce", "fluidounces"], Volume, Scale::Linear(0.0295735295625)),
    // Area (base: square meter)
    unit!("m²", &["m2", "sqm", "squaremeter", "squaremeters"], Area, Scale::Linear(1.0)),
    unit!("km²", &["km2", "sqkm", "squarekilometer", "squarekilometers"], Area, Scale::Linear(1e6)),
    unit!("ft²", &["ft2", "sqft", "squarefoot", "squarefeet"], Area, Scale::Linear(0.09290304)),
    unit!("mi²", &["mi2", "sqmi", "squaremile", "squaremiles"], Area, Scale::Linear(2_589_988.110336)),
    unit!("acre", &["acre", "acres"], Area, Scale::Linear(4046.8564224)),
    unit!("ha", &["ha", "hectare", "hectares"], Area, Scale::Linear(10_000.0)),
    // Speed (base: meter/second)
    unit!("m/s", &["ms", "m/s", "mps"], Speed, Scale::Linear(1.0)),
    unit!("km/h", &["kmh", "km/h", "kph"], Speed, Scale::Linear(1000.0 / 3600.0)),
    unit!("mph", &["mph"], Speed, Scale::Linear(0.44704)),
    unit!("knot", &["knot", "knots", "kt"], Speed, Scale::Linear(0.514444)),
    // Data (base: byte, binary SI)
    unit!("bit", &["bit", "bits"], Data, Scale::Linear(0.125)),
    unit!("B", &["b", "byte", "bytes"], Data, Scale::Linear(1.0)),
    unit!("KB", &["kb", "kilobyte", "kilobytes"], Data, Scale::Linear(1024.0)),
    unit!("MB", &["mb", "megabyte", "megabytes"], Data, Scale::Linear(1_048_576.0)),
    unit!("GB", &["gb", "gigabyte", "gigabytes"], Data, Scale::Linear(1_073_741_824.0)),
    unit!("TB", &["tb", "terabyte", "terabytes"], Data, Scale::Linear(1_099_511_627_776.0)),
    unit!("PB", &["pb", "petabyte", "petabytes"], Data, Scale::Linear(1_125_899_906_842_624.0)),
    // Time (base: second)
    unit!("ms", &["millisecond", "milliseconds"], Time, Scale::Linear(0.001)),
    unit!("s", &["s", "sec", "secs", "second", "seconds"], Time, Scale::Linear(1.0)),
    unit!("min", &["min", "mins", "minute", "minutes"], Time, Scale::Linear(60.0)),
    unit!("h", &["h", "hr", "hrs", "hour", "hours"], Time, Scale::Linear(3600.0)),
    unit!("day", &["day", "days"], Time, Scale::Linear(86_400.0)),
    unit!("week", &["week", "weeks"], Time, Scale::Linear(604_800.0)),
    unit!("month", &["month", "months"], Time, Scale::Linear(2_629_800.0)),
    unit!("year", &["year", "years", "yr", "yrs"], Time, Scale::Linear(31_557_600.0)),
];

pub fn find_unit(token: &str) -> Option<&'static UnitDef> {
    let t = token.trim().to_lowercase();
    UNITS.iter().find(|u| u.aliases.contains(&t.as_str()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot convert {0} to {1}")]
    CategoryMismatch(UnitCategory, UnitCategory),
}

pub fn convert(value: f64, from: &UnitDef, to: &UnitDef) -> Result<f64, ConvertError> {
    if from.category != to.category {
        return Err(ConvertError::CategoryMismatch(from.category, to.category));
    }
    Ok(to.scale.from_base(from.scale.to_base(value)))
}

/// Match `N unit {to|in} unit` where both units are known. Returns None
/// otherwise so later widgets (currency in particular) get their turn.
pub fn detect(query: &str) -> Option<(f64, &'static UnitDef, &'static UnitDef)> {
    let re = regex::Regex::new(
        r"(?i)^\s*(-?[\d.,]+)\s*([a-zµ°/²³\x22\x27]+)\s+(?:to|in)\s+([a-zµ°/²³\x22\x27]+)\s*$",
    )
    .ok()?;
    let caps = re.captures(query)?;

    let value: f64 = caps[1].replace(',', "").parse().ok()?;
    let from = find_unit(&caps[2])?;
    let to = find_unit(&caps[3])?;
    Some((value, from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} !~ {}", a, b);
    }

    #[test]
    fn km_to_miles() {
        let (v, from, to) = detect("10 km to mi").unwrap();
        close(convert(v, from, to).unwrap(), 6.213711922);
    }

    #[test]
    fn temperature_endpoints_are_exact() {
        let c = find_unit("c").unwrap();
        let f = find_unit("f").unwrap();
        let k = find_unit("kelvin").unwrap();
        assert_eq!(convert(0.0, c, f).unwrap(), 32.0);
        assert_eq!(convert(32.0, f, c).unwrap(), 0.0);
        assert_eq!(convert(0.0, c, k).unwrap(), 273.15);
        assert_eq!(convert(273.15, k, c).unwrap(), 0.0);
    }

    #[test]
    fn linear_units_round_trip() {
        for (a, b) in [("km", "mi"), ("kg", "lb"), ("l", "gal"), ("mb", "kb")] {
            let from = find_unit(a).unwrap();
            let to = find_unit(b).unwrap();
            let out = convert(123.456, from, to).unwrap();
            close(convert(out, to, from).unwrap(), 123.456);
        }
    }

    #[test]
    fn data_units_are_binary() {
        let mb = find_unit("mb").unwrap();
        let kb = find_unit("kb").unwrap();
        assert_eq!(convert(1.0, mb, kb).unwrap(), 1024.0);
    }

    #[test]
    fn cross_category_is_a_typed_error() {
        let km = find_unit("km").unwrap();
        let kg = find_unit("kg").unwrap();
        let err = convert(1.0, km, kg).unwrap_err();
        assert!(err.to_string().contains("length"));
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn detect_requires_known_units() {
        assert!(detect("10 km to mi").is_some());
        assert!(detect("2.5 kg in lbs").is_some());
        assert!(detect("100 usd to eur").is_none());
        assert!(detect("weather in Paris").is_none());
        assert!(detect("km to mi").is_none());
    }
}

//! Unit conversion for property values.
//!
//! Each known unit maps to a quantity kind, a scale relative to the SI
//! coherent unit of that kind and an additive offset (non-zero only for
//! temperature scales). Conversion is allowed between units of the same kind.

use ndarray::{ArrayBase, DataMut, Dimension};

use crate::error::{GridPropError, Result};

/// Physical quantity kinds understood by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Velocity,
    Length,
    Temperature,
    Time,
    Concentration,
    Salinity,
    Density,
}

/// A resolved unit: `si = value * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub kind: UnitKind,
    pub scale: f64,
    pub offset: f64,
}

impl UnitDef {
    const fn linear(kind: UnitKind, scale: f64) -> Self {
        Self {
            kind,
            scale,
            offset: 0.0,
        }
    }

    const fn affine(kind: UnitKind, scale: f64, offset: f64) -> Self {
        Self {
            kind,
            scale,
            offset,
        }
    }
}

/// Look up a unit by any of its accepted spellings
pub fn lookup(unit: &str) -> Option<UnitDef> {
    use UnitKind::*;

    let def = match unit.trim().to_lowercase().as_str() {
        "m/s" | "m s-1" | "m s**-1" | "meter per second" | "meters per second" | "mps" => {
            UnitDef::linear(Velocity, 1.0)
        }
        "cm/s" | "cm s-1" | "centimeters per second" => UnitDef::linear(Velocity, 0.01),
        "km/h" | "kph" | "km/hr" | "kilometers per hour" => UnitDef::linear(Velocity, 1000.0 / 3600.0),
        "knot" | "knots" | "kt" | "kts" => UnitDef::linear(Velocity, 1852.0 / 3600.0),
        "mph" | "miles per hour" => UnitDef::linear(Velocity, 0.44704),
        "ft/s" | "feet per second" => UnitDef::linear(Velocity, 0.3048),

        "m" | "meter" | "meters" | "metre" | "metres" => UnitDef::linear(Length, 1.0),
        "cm" | "centimeter" | "centimeters" => UnitDef::linear(Length, 0.01),
        "km" | "kilometer" | "kilometers" => UnitDef::linear(Length, 1000.0),
        "ft" | "foot" | "feet" => UnitDef::linear(Length, 0.3048),
        "mi" | "mile" | "miles" => UnitDef::linear(Length, 1609.344),
        "nm" | "nmi" | "nautical mile" | "nautical miles" => UnitDef::linear(Length, 1852.0),

        "k" | "kelvin" => UnitDef::linear(Temperature, 1.0),
        "c" | "degc" | "deg c" | "celsius" | "degree_celsius" | "degrees_celsius" => {
            UnitDef::affine(Temperature, 1.0, 273.15)
        }
        "f" | "degf" | "deg f" | "fahrenheit" => {
            UnitDef::affine(Temperature, 5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0)
        }

        "s" | "sec" | "second" | "seconds" => UnitDef::linear(Time, 1.0),
        "min" | "minute" | "minutes" => UnitDef::linear(Time, 60.0),
        "hr" | "hour" | "hours" => UnitDef::linear(Time, 3600.0),
        "day" | "days" => UnitDef::linear(Time, 86_400.0),

        "1" | "fraction" | "unitless" => UnitDef::linear(Concentration, 1.0),
        "%" | "percent" => UnitDef::linear(Concentration, 0.01),

        "psu" | "ppt" | "1e-3" | "parts per thousand" => UnitDef::linear(Salinity, 1.0),

        "kg/m^3" | "kg/m3" | "kg m-3" => UnitDef::linear(Density, 1.0),
        "g/cm^3" | "g/cm3" => UnitDef::linear(Density, 1000.0),

        _ => return None,
    };
    Some(def)
}

fn resolve(from: &str, to: &str) -> Result<(UnitDef, UnitDef)> {
    let unknown = |u: &str| GridPropError::Units {
        message: format!("Unknown unit: {}", u),
    };
    let src = lookup(from).ok_or_else(|| unknown(from))?;
    let dst = lookup(to).ok_or_else(|| unknown(to))?;
    if src.kind != dst.kind {
        return Err(GridPropError::Units {
            message: format!(
                "Cannot convert {} ({:?}) to {} ({:?})",
                from, src.kind, to, dst.kind
            ),
        });
    }
    Ok((src, dst))
}

/// Convert a single value between compatible units
pub fn convert_value(from: &str, to: &str, value: f64) -> Result<f64> {
    let (src, dst) = resolve(from, to)?;
    Ok(((value * src.scale + src.offset) - dst.offset) / dst.scale)
}

/// Convert an array in place between compatible units.
///
/// Masked entries (NaN) stay masked.
pub fn convert_in_place<S, D>(from: &str, to: &str, values: &mut ArrayBase<S, D>) -> Result<()>
where
    S: DataMut<Elem = f64>,
    D: Dimension,
{
    if from == to {
        return Ok(());
    }
    let (src, dst) = resolve(from, to)?;
    values.mapv_inplace(|v| ((v * src.scale + src.offset) - dst.offset) / dst.scale);
    Ok(())
}

/// The (from, to) pair to convert with, if stored and requested units differ.
///
/// Requesting units for a property that declares none is an error.
pub(crate) fn conversion<'a>(
    stored: Option<&'a str>,
    requested: Option<&'a str>,
) -> Result<Option<(&'a str, &'a str)>> {
    match (stored, requested) {
        (Some(stored), Some(requested)) if stored != requested => Ok(Some((stored, requested))),
        (None, Some(requested)) => Err(GridPropError::Units {
            message: format!("Property has no units; cannot convert to {}", requested),
        }),
        _ => Ok(None),
    }
}

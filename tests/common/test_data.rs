//! Test data generation utilities.
//!
//! Writes NetCDF files with the same known patterns as the in-memory
//! fixtures so file-backed and memory-backed properties can be compared.

use std::path::Path;

use netcdf::Error;
type Result<T> = std::result::Result<T, Error>;

/// Creates a NetCDF file of hourly currents and water temperature.
///
/// Layout matches [`super::fixtures::currents_dataset`]: a 3×2 lon/lat node
/// grid, three hourly steps, `u = step + 1`, `v = -(step + 1)` and
/// `water_t = 10` with one cell set to the `_FillValue`.
pub fn create_currents_nc(path: &Path) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("lon", 3)?;
    file.add_dimension("lat", 2)?;
    file.add_unlimited_dimension("time")?;

    file.add_attribute("title", "Currents Test Data")?;
    file.add_attribute("institution", "gridprop test suite")?;

    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_values(&[0.0, 1.0, 2.0], &[..])?;
    }
    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_values(&[0.0, 1.0], &[..])?;
    }
    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", "hours since 2016-01-01 00:00:00")?;
        time_var.put_values(&[0.0, 1.0, 2.0], &[..])?;
    }

    let u: Vec<f32> = (0..18).map(|i| (i / 6) as f32 + 1.0).collect();
    let v: Vec<f32> = u.iter().map(|x| -x).collect();
    let temp: Vec<f32> = (0..18)
        .map(|i| if i % 6 == 5 { -999.0 } else { 10.0 })
        .collect();

    {
        let mut u_var = file.add_variable::<f32>("u", &["time", "lat", "lon"])?;
        u_var.put_attribute("units", "m/s")?;
        u_var.put_values(&u, &[.., .., ..])?;
    }
    {
        let mut v_var = file.add_variable::<f32>("v", &["time", "lat", "lon"])?;
        v_var.put_attribute("units", "m/s")?;
        v_var.put_values(&v, &[.., .., ..])?;
    }
    {
        let mut temp_var = file.add_variable::<f32>("water_t", &["time", "lat", "lon"])?;
        temp_var.put_attribute("units", "C")?;
        temp_var.put_attribute("_FillValue", -999.0f32)?;
        temp_var.put_values(&temp, &[.., .., ..])?;
    }

    Ok(())
}

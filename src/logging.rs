//! Logging utilities for gridprop.
//!
//! Structured `tracing` events for dataset loading and timed operations, so
//! property construction and queries can be followed in production logs.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::GridPropError;
use crate::source::Dataset;

/// Initialize the tracing subscriber with the given log level
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation failed"
        );
    }
}

/// Log an operation with timing and result in a single statement
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let operation_id = generate_operation_id();

    debug!(
        operation = operation,
        operation_id = %operation_id,
        "Starting operation"
    );

    let result = f();

    info!(
        operation = operation,
        operation_id = %operation_id,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log what an opened dataset contains
pub fn log_data_load_stats(dataset: &dyn Dataset) {
    let names = dataset.variable_names();
    let dims: Vec<String> = names
        .iter()
        .filter_map(|name| dataset.variable(name))
        .map(|info| format!("{}{:?}", info.name, info.shape))
        .collect();
    let values: usize = names
        .iter()
        .filter_map(|name| dataset.variable(name))
        .map(|info| info.shape.iter().product::<usize>())
        .sum();

    info!(
        operation = "data_load",
        file_path = %dataset.path().map(|p| p.display().to_string()).unwrap_or_default(),
        var_count = names.len(),
        vars = %names.join(", "),
        shapes = %dims.join(", "),
        memory_mb = values * std::mem::size_of::<f64>() / (1024 * 1024),
        "Dataset opened"
    );
}

/// Log an error with context
pub fn log_error(error: &GridPropError, context: &str) {
    error!(
        error = %error,
        context = context,
        error_type = std::any::type_name_of_val(error),
        "Error occurred"
    );
}

/// Generate a unique operation ID
pub fn generate_operation_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryDataset;
    use ndarray::Array2;
    use std::time::Duration;

    #[test]
    fn test_generate_operation_id() {
        let id1 = generate_operation_id();
        let id2 = generate_operation_id();

        assert!(!id1.is_empty());
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_log_timed_operation() {
        let result = log_timed_operation("test_operation", || {
            std::thread::sleep(Duration::from_millis(1));
            42
        });

        assert_eq!(result, 42);
    }

    #[test]
    fn test_log_data_load_stats() {
        let ds = MemoryDataset::new("stats.nc")
            .with_units("temp", &["lat", "lon"], Array2::zeros((2, 3)).into_dyn(), "C")
            .unwrap();
        log_data_load_stats(&ds);
        log_error(&GridPropError::construction("test"), "stats");
    }
}

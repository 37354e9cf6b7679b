//! Python-boundary helpers: array extraction and argument parsing.
//!
//! Everything here is compiled only with the `python-bindings` feature and is
//! used by the `#[pyclass]` wrappers in the crate root.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

#[cfg(feature = "python-bindings")]
use crate::signals::{parameter::ParamSpec, selection::Selection};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a 1-D array-like into an owned `Array1<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vector<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, what: &str,
) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{what} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

/// Copy a 2-D array-like (numpy array or nested sequence) into an owned
/// `Array2<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw_data: &Bound<'py, PyAny>, what: &str) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }

    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err(format!("{what} must be a 2-D numpy.ndarray or nested sequence of float64"))
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err(format!("{what} rows must all have the same length")));
    }
    let nrows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| PyValueError::new_err(format!("{what}: {e}")))
}

/// Convert `Array2<f64>` into row-major nested vectors for Python.
#[cfg(feature = "python-bindings")]
pub fn matrix_to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Parse a Python prior description into a [`ParamSpec`].
///
/// Accepted forms: a float (constant), `("uniform", pmin, pmax)` or
/// `("normal", mu, sigma)`. `None` falls back to `default`.
#[cfg(feature = "python-bindings")]
pub fn extract_param_spec(
    prior: Option<&Bound<'_, PyAny>>, default: ParamSpec, alias: Option<&str>,
) -> PyResult<ParamSpec> {
    let spec = match prior {
        None => default,
        Some(obj) => {
            if let Ok(value) = obj.extract::<f64>() {
                ParamSpec::constant(value)
            } else {
                let (family, a, b): (String, f64, f64) = obj.extract().map_err(|_| {
                    PyTypeError::new_err(
                        "prior must be a float or a tuple ('uniform' | 'normal', a, b)",
                    )
                })?;
                match family.to_lowercase().as_str() {
                    "uniform" => ParamSpec::uniform(a, b)?,
                    "normal" => ParamSpec::normal(a, b)?,
                    other => {
                        return Err(PyValueError::new_err(format!(
                            "invalid prior family {:?} (expected 'uniform' or 'normal')",
                            other
                        )));
                    }
                }
            }
        }
    };
    Ok(match alias {
        Some(name) => spec.named(name),
        None => spec,
    })
}

#[cfg(feature = "python-bindings")]
pub fn extract_selection(selection: Option<&str>, flag: Option<&str>) -> PyResult<Selection> {
    let sel_str = selection.unwrap_or("none").to_lowercase();
    let sel = match sel_str.as_str() {
        "none" | "no_selection" => Selection::NoSelection,
        "backend" | "by_backend" => Selection::ByBackend,
        "frontend" | "by_frontend" => Selection::ByFrontend,
        "band" | "by_band" => Selection::ByBand,
        "flag" | "by_flag" => {
            let name = flag.ok_or_else(|| {
                PyValueError::new_err("flag must be provided when selection='flag'")
            })?;
            Selection::ByFlag(name.to_string())
        }
        other => {
            return Err(PyValueError::new_err(format!(
                "invalid selection {:?} (expected 'none', 'backend', 'frontend', 'band', or 'flag')",
                other
            )));
        }
    };
    Ok(sel)
}

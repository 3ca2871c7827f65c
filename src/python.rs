use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

#[pyclass]
#[derive(Clone)]
struct EditResultPy {
    #[pyo3(get)]
    text: String,
    #[pyo3(get)]
    output: String,
}

impl From<crate::EditResult> for EditResultPy {
    fn from(r: crate::EditResult) -> Self {
        Self { text: r.text, output: r.output }
    }
}

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
#[pyo3(name = "ecce", signature = (text, *cmds))]
fn py_ecce(text: &str, cmds: Vec<String>) -> PyResult<EditResultPy> {
    let cmd_refs: Vec<&str> = cmds.iter().map(|s| s.as_str()).collect();
    let res = crate::edit_text(text, &cmd_refs).map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(res.into())
}

#[pymodule]
fn ecce(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<EditResultPy>()?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(py_ecce, m)?)?;
    Ok(())
}

//! Dataset model: single sample, independent groups, or x/y pairs
//!
//! The shape is decided once, at the boundary: callers either build a
//! [`Dataset`] directly or parse one with [`Dataset::from_json`], which branches
//! explicitly on the JSON value type. Nothing downstream guesses the shape.

use crate::descriptive::PolynomialFit;
use crate::error::{GuardianError, Result};
use crate::family::TestFamily;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A sample with a display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSample {
    pub name: String,
    pub values: Vec<f64>,
}

impl NamedSample {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Single(NamedSample),
    Groups(Vec<NamedSample>),
    Paired { x: Vec<f64>, y: Vec<f64> },
}

fn check_values(name: &str, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(GuardianError::InvalidSample {
            reason: format!("sample '{}' is empty", name),
        });
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(GuardianError::InvalidSample {
            reason: format!("sample '{}' has a non-finite value at index {}", name, pos),
        });
    }
    Ok(())
}

impl Dataset {
    pub fn single(values: Vec<f64>) -> Result<Self> {
        check_values("sample", &values)?;
        Ok(Dataset::Single(NamedSample::new("sample", values)))
    }

    /// Named groups. A lone group collapses to [`Dataset::Single`].
    pub fn groups(groups: Vec<NamedSample>) -> Result<Self> {
        if groups.is_empty() {
            return Err(GuardianError::InvalidSample {
                reason: "no groups supplied".to_string(),
            });
        }
        for g in &groups {
            check_values(&g.name, &g.values)?;
        }
        let mut groups = groups;
        if groups.len() == 1 {
            return Ok(Dataset::Single(groups.remove(0)));
        }
        Ok(Dataset::Groups(groups))
    }

    /// Unnamed groups, labelled `group_1`, `group_2`, ...
    pub fn unnamed_groups(groups: Vec<Vec<f64>>) -> Result<Self> {
        Self::groups(
            groups
                .into_iter()
                .enumerate()
                .map(|(i, values)| NamedSample::new(format!("group_{}", i + 1), values))
                .collect(),
        )
    }

    pub fn paired(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        check_values("x", &x)?;
        check_values("y", &y)?;
        if x.len() != y.len() {
            return Err(GuardianError::InvalidSample {
                reason: format!("x has {} values but y has {}", x.len(), y.len()),
            });
        }
        Ok(Dataset::Paired { x, y })
    }

    /// Parse a dataset from JSON, detecting its shape explicitly:
    ///
    /// - `[1, 2, 3]`: single sample
    /// - `[[1, 2], [3, 4]]`: unnamed groups
    /// - `{"groups": {"a": [..], "b": [..]}}` or `{"groups": [[..], [..]]}`
    /// - `{"x": [..], "y": [..]}`: pairs
    /// - `{"values": [..]}`: single sample
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => Self::from_json_array(items),
            Value::Object(map) => {
                if let (Some(x), Some(y)) = (map.get("x"), map.get("y")) {
                    return Self::paired(numeric_array(x, "x")?, numeric_array(y, "y")?);
                }
                if let Some(groups) = map.get("groups") {
                    return match groups {
                        Value::Object(named) => Self::groups(
                            named
                                .iter()
                                .map(|(name, v)| Ok(NamedSample::new(name.clone(), numeric_array(v, name)?)))
                                .collect::<Result<Vec<_>>>()?,
                        ),
                        Value::Array(items) => Self::from_json_array(items),
                        _ => Err(shape_error("'groups' must be an object or an array")),
                    };
                }
                if let Some(values) = map.get("values") {
                    return Self::single(numeric_array(values, "values")?);
                }
                Err(shape_error(
                    "object must contain 'x' and 'y', 'groups', or 'values'",
                ))
            }
            Value::Null => Err(shape_error("dataset is null")),
            other => Err(shape_error(&format!(
                "expected an array or object, got {}",
                json_type(other)
            ))),
        }
    }

    fn from_json_array(items: &[Value]) -> Result<Self> {
        if items.is_empty() {
            return Err(shape_error("empty array"));
        }
        if items.iter().all(Value::is_number) {
            return Self::single(numeric_array_items(items, "sample")?);
        }
        if items.iter().all(Value::is_array) {
            let groups = items
                .iter()
                .enumerate()
                .map(|(i, v)| numeric_array(v, &format!("group_{}", i + 1)))
                .collect::<Result<Vec<_>>>()?;
            return Self::unnamed_groups(groups);
        }
        Err(shape_error(
            "array must contain only numbers or only arrays of numbers",
        ))
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Dataset::Single(_) => "single",
            Dataset::Groups(_) => "groups",
            Dataset::Paired { .. } => "paired",
        }
    }

    pub fn group_count(&self) -> usize {
        match self {
            Dataset::Single(_) => 1,
            Dataset::Groups(g) => g.len(),
            Dataset::Paired { .. } => 2,
        }
    }

    /// Total number of observations (pairs count once)
    pub fn observations(&self) -> usize {
        match self {
            Dataset::Single(s) => s.len(),
            Dataset::Groups(g) => g.iter().map(NamedSample::len).sum(),
            Dataset::Paired { x, .. } => x.len(),
        }
    }

    /// Named samples as supplied, without any family-specific transformation
    pub fn raw_samples(&self) -> Vec<NamedSample> {
        match self {
            Dataset::Single(s) => vec![s.clone()],
            Dataset::Groups(g) => g.clone(),
            Dataset::Paired { x, y } => vec![
                NamedSample::new("x", x.clone()),
                NamedSample::new("y", y.clone()),
            ],
        }
    }

    /// All values flattened and concatenated, group by group
    pub fn combined(&self) -> Vec<f64> {
        match self {
            Dataset::Single(s) => s.values.clone(),
            Dataset::Groups(g) => g.iter().flat_map(|s| s.values.iter().copied()).collect(),
            Dataset::Paired { x, y } => x.iter().chain(y).copied().collect(),
        }
    }

    /// Samples whose distribution the family's assumptions are about
    ///
    /// Paired data under a paired test becomes the differences `y - x`; under
    /// regression it becomes the residuals of the linear fit of y on x.
    pub fn analysis_samples(&self, family: TestFamily) -> Vec<NamedSample> {
        match (self, family) {
            (Dataset::Paired { x, y }, TestFamily::PairedTTest | TestFamily::Wilcoxon) => {
                let diffs = x.iter().zip(y).map(|(a, b)| b - a).collect();
                vec![NamedSample::new("difference", diffs)]
            }
            (Dataset::Paired { x, y }, TestFamily::Regression) => match PolynomialFit::linear(x, y) {
                Some(fit) => vec![NamedSample::new("residual", fit.residuals)],
                None => vec![NamedSample::new("y", y.clone())],
            },
            _ => self.raw_samples(),
        }
    }
}

/// Everything a validator may look at for one request
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub family: TestFamily,
    pub alpha: f64,
    pub dataset: Dataset,
    /// Family-specific view of the data (see [`Dataset::analysis_samples`])
    pub samples: Vec<NamedSample>,
}

impl AnalysisContext {
    pub fn new(family: TestFamily, alpha: f64, dataset: Dataset) -> Self {
        let samples = dataset.analysis_samples(family);
        Self {
            family,
            alpha,
            dataset,
            samples,
        }
    }

    /// The x/y pairs, if the dataset is paired
    pub fn pairs(&self) -> Option<(&[f64], &[f64])> {
        match &self.dataset {
            Dataset::Paired { x, y } => Some((x, y)),
            _ => None,
        }
    }
}

fn shape_error(reason: &str) -> GuardianError {
    GuardianError::InvalidSampleShape {
        reason: reason.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn numeric_array(value: &Value, name: &str) -> Result<Vec<f64>> {
    match value {
        Value::Array(items) => numeric_array_items(items, name),
        other => Err(shape_error(&format!(
            "'{}' must be an array of numbers, got {}",
            name,
            json_type(other)
        ))),
    }
}

fn numeric_array_items(items: &[Value], name: &str) -> Result<Vec<f64>> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64().ok_or_else(|| {
                shape_error(&format!(
                    "'{}' element {} is {}, not a number",
                    name,
                    i,
                    json_type(v)
                ))
            })
        })
        .collect()
}

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::BatchError;

/// Key used by [`RunIdIncrementer`] when none is configured.
pub const RUN_ID_KEY: &str = "run.id";

/// A single typed job parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum JobParameter {
    String(String),
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
}

impl fmt::Display for JobParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobParameter::String(value) => write!(f, "{}", value),
            JobParameter::Long(value) => write!(f, "{}", value),
            JobParameter::Double(value) => write!(f, "{}", value),
            JobParameter::Date(value) => write!(f, "{}", value.to_rfc3339()),
        }
    }
}

/// The set of parameters a job is launched with.
///
/// Parameters are kept ordered by name, so two sets holding the same values
/// always produce the same [`job_key`](JobParameters::job_key). The key is what
/// distinguishes one job instance from another for the same job name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParameters {
    parameters: BTreeMap<String, JobParameter>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter, returning the updated set.
    pub fn with(mut self, name: &str, parameter: JobParameter) -> Self {
        self.insert(name, parameter);
        self
    }

    pub fn insert(&mut self, name: &str, parameter: JobParameter) {
        self.parameters.insert(name.to_string(), parameter);
    }

    pub fn get(&self, name: &str) -> Option<&JobParameter> {
        self.parameters.get(name)
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        match self.parameters.get(name) {
            Some(JobParameter::Long(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.parameters.get(name) {
            Some(JobParameter::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        match self.parameters.get(name) {
            Some(JobParameter::Double(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_date(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.parameters.get(name) {
            Some(JobParameter::Date(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Returns a copy of `self` with every parameter of `other` applied on top.
    pub fn merge(&self, other: &JobParameters) -> JobParameters {
        let mut merged = self.clone();
        for (name, parameter) in &other.parameters {
            merged
                .parameters
                .insert(name.clone(), parameter.clone());
        }
        merged
    }

    /// Canonical identity of this parameter set.
    pub fn job_key(&self) -> String {
        self.parameters
            .iter()
            .map(|(name, parameter)| format!("{}={};", name, parameter))
            .collect()
    }

    /// Parses command line arguments into job parameters.
    ///
    /// Each argument has the form `name=value` or `name(type)=value` where
    /// `type` is one of `string`, `long`, `double` or `date` (RFC 3339).
    /// Untyped values are stored as strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use pass_batch::core::parameters::JobParameters;
    ///
    /// let parameters = JobParameters::from_args(["run.id(long)=5", "region=eu"]).unwrap();
    /// assert_eq!(parameters.get_long("run.id"), Some(5));
    /// assert_eq!(parameters.get_string("region"), Some("eu"));
    /// ```
    pub fn from_args<I, S>(args: I) -> Result<JobParameters, BatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parameters = JobParameters::new();

        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                BatchError::JobParameter(format!("expected name=value, got '{}'", arg))
            })?;

            let (name, kind) = match key.split_once('(') {
                Some((name, rest)) => match rest.strip_suffix(')') {
                    Some(kind) => (name, kind),
                    None => {
                        return Err(BatchError::JobParameter(format!(
                            "unterminated type in '{}'",
                            arg
                        )));
                    }
                },
                None => (key, "string"),
            };

            if name.is_empty() {
                return Err(BatchError::JobParameter(format!(
                    "missing parameter name in '{}'",
                    arg
                )));
            }

            let parameter = parse_parameter(kind, value).map_err(|reason| {
                BatchError::JobParameter(format!("{} in '{}'", reason, arg))
            })?;

            parameters.insert(name, parameter);
        }

        Ok(parameters)
    }

    /// Parses process arguments into job parameters, skipping `--option`
    /// arguments, which belong to the application rather than the job.
    ///
    /// ```
    /// use pass_batch::core::parameters::JobParameters;
    ///
    /// let parameters =
    ///     JobParameters::from_command_line(["--verbose", "region=eu", "--batch.job_enabled=false"])
    ///         .unwrap();
    /// assert_eq!(parameters.len(), 1);
    /// assert_eq!(parameters.get_string("region"), Some("eu"));
    /// ```
    pub fn from_command_line<I, S>(args: I) -> Result<JobParameters, BatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args
            .into_iter()
            .filter(|arg| {
                let option = arg.as_ref().starts_with("--");
                if option {
                    debug!("Ignoring option {} for job parameters", arg.as_ref());
                }
                !option
            })
            .collect();

        JobParameters::from_args(args)
    }
}

fn parse_parameter(kind: &str, value: &str) -> Result<JobParameter, String> {
    match kind.to_ascii_lowercase().as_str() {
        "string" => Ok(JobParameter::String(value.to_string())),
        "long" => value
            .parse::<i64>()
            .map(JobParameter::Long)
            .map_err(|e| e.to_string()),
        "double" => value
            .parse::<f64>()
            .map(JobParameter::Double)
            .map_err(|e| e.to_string()),
        "date" => DateTime::parse_from_rfc3339(value)
            .map(|date| JobParameter::Date(date.with_timezone(&Utc)))
            .map_err(|e| e.to_string()),
        other => Err(format!("unknown parameter type '{}'", other)),
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .parameters
            .iter()
            .map(|(name, parameter)| format!("{}={}", name, parameter))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

/// Computes the parameters of the next job instance from the previous ones.
pub trait JobParametersIncrementer {
    /// Returns the parameters for the next run.
    ///
    /// # Parameters
    /// - `previous`: parameters of the last execution of the job, if any
    fn get_next(&self, previous: Option<&JobParameters>) -> JobParameters;
}

/// Incrementer assigning a fresh, increasing run identifier on every launch.
///
/// The identifier is stored as a long parameter under `run.id` (or a custom
/// key). Other parameters of the previous run are carried forward.
///
/// # Examples
///
/// ```
/// use pass_batch::core::parameters::{JobParametersIncrementer, RunIdIncrementer};
///
/// let incrementer = RunIdIncrementer::new();
/// let first = incrementer.get_next(None);
/// let second = incrementer.get_next(Some(&first));
///
/// assert_eq!(first.get_long("run.id"), Some(1));
/// assert_eq!(second.get_long("run.id"), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct RunIdIncrementer {
    key: String,
}

impl RunIdIncrementer {
    pub fn new() -> Self {
        Self::with_key(RUN_ID_KEY)
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Default for RunIdIncrementer {
    fn default() -> Self {
        Self::new()
    }
}

impl JobParametersIncrementer for RunIdIncrementer {
    fn get_next(&self, previous: Option<&JobParameters>) -> JobParameters {
        let previous = previous.cloned().unwrap_or_default();
        let id = previous.get_long(&self.key).unwrap_or(0) + 1;
        previous.with(&self.key, JobParameter::Long(id))
    }
}
